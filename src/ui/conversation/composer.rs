use super::history::wrap_text;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{block::Title, Block, Borders, Widget},
};

const CURSOR: char = '▌';

pub const PLACEHOLDER: &str = "Ask me anything regarding research papers...";

/// Result returned when the user interacts with the composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    /// Enter pressed; carries the buffer as typed
    Submit(String),
    /// Buffer edited or cursor moved
    Edited,
    None,
}

/// State for the text area within the composer
#[derive(Debug, Clone, Default)]
pub struct TextAreaState {
    pub content: String,
    /// Cursor position in characters, not bytes
    pub cursor: usize,
}

impl TextAreaState {
    fn byte_index(&self, char_idx: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Input box the user composes messages in
#[derive(Clone)]
pub struct ConversationComposer {
    state: TextAreaState,
    placeholder: String,
    locked: bool,
}

impl ConversationComposer {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            state: TextAreaState::default(),
            placeholder: placeholder.into(),
            locked: false,
        }
    }

    /// Handle key input. Typing is always accepted; whether a submit goes anywhere
    /// is up to the caller.
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                if key
                    .modifiers
                    .intersects(KeyModifiers::SHIFT | KeyModifiers::ALT)
                {
                    self.insert_str("\n");
                    ComposerResult::Edited
                } else {
                    ComposerResult::Submit(self.state.content.clone())
                }
            }
            KeyCode::Char(c) => {
                if key.modifiers.contains(KeyModifiers::CONTROL) {
                    if c == 'u' {
                        self.clear();
                        return ComposerResult::Edited;
                    }
                    return ComposerResult::None;
                }
                let mut buf = [0u8; 4];
                self.insert_str(c.encode_utf8(&mut buf));
                ComposerResult::Edited
            }
            KeyCode::Backspace => {
                if self.state.cursor > 0 {
                    self.state.cursor -= 1;
                    let at = self.state.byte_index(self.state.cursor);
                    self.state.content.remove(at);
                }
                ComposerResult::Edited
            }
            KeyCode::Delete => {
                if self.state.cursor < self.state.char_len() {
                    let at = self.state.byte_index(self.state.cursor);
                    self.state.content.remove(at);
                }
                ComposerResult::Edited
            }
            KeyCode::Left => {
                self.state.cursor = self.state.cursor.saturating_sub(1);
                ComposerResult::Edited
            }
            KeyCode::Right => {
                self.state.cursor = (self.state.cursor + 1).min(self.state.char_len());
                ComposerResult::Edited
            }
            KeyCode::Home => {
                self.state.cursor = 0;
                ComposerResult::Edited
            }
            KeyCode::End => {
                self.state.cursor = self.state.char_len();
                ComposerResult::Edited
            }
            _ => ComposerResult::None,
        }
    }

    /// Insert pasted text at the cursor
    pub fn paste(&mut self, text: &str) {
        // Terminals deliver pasted newlines as \r
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        self.insert_str(&normalized);
    }

    fn insert_str(&mut self, text: &str) {
        let at = self.state.byte_index(self.state.cursor);
        self.state.content.insert_str(at, text);
        self.state.cursor += text.chars().count();
    }

    pub fn content(&self) -> &str {
        &self.state.content
    }

    pub fn clear(&mut self) {
        self.state = TextAreaState::default();
    }

    /// Mark that a request is in flight; the send affordance is disabled meanwhile
    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    /// Whether Enter would currently send
    pub fn can_send(&self) -> bool {
        !self.locked && !self.state.content.trim().is_empty()
    }

    /// Rows needed to show the buffer at `width` columns, including borders
    pub fn desired_height(&self, width: u16, max_rows: u16) -> u16 {
        let (rows, _) = self.visual_rows(width.saturating_sub(2));
        (rows.len().max(1) as u16).min(max_rows) + 2
    }

    /// Buffer with the cursor drawn in, wrapped to `width` columns, and the
    /// row the cursor landed on
    fn visual_rows(&self, width: u16) -> (Vec<String>, usize) {
        let at = self.state.byte_index(self.state.cursor);
        let mut content = self.state.content.clone();
        content.insert(at, CURSOR);

        // The buffer may itself contain the cursor glyph
        let earlier = self.state.content[..at].matches(CURSOR).count();

        let mut rows = Vec::new();
        let mut cursor_row = 0;
        let mut seen = 0;
        for line in content.split('\n') {
            for row in wrap_text(line, width as usize) {
                let here = row.matches(CURSOR).count();
                if seen <= earlier && earlier < seen + here {
                    cursor_row = rows.len();
                }
                seen += here;
                rows.push(row);
            }
        }
        (rows, cursor_row)
    }
}

impl Widget for &ConversationComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.locked {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Blue)
        };

        let send_style = if self.can_send() {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(" Message ")
            .title(
                Title::from(Span::styled(" [Enter ➤ send] ", send_style))
                    .alignment(Alignment::Right),
            );

        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.state.content.is_empty() {
            let placeholder_line = Line::from(vec![Span::styled(
                self.placeholder.as_str(),
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &placeholder_line, inner_area.width);
            return;
        }

        let (rows, cursor_row) = self.visual_rows(inner_area.width);

        // Keep the cursor's row visible when the buffer is taller than the box
        let height = inner_area.height as usize;
        let first = (cursor_row + 1).saturating_sub(height);

        for (i, row) in rows.iter().skip(first).take(height).enumerate() {
            let line = Line::from(vec![Span::raw(row.as_str())]);
            buf.set_line(inner_area.x, inner_area.y + i as u16, &line, inner_area.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(composer: &mut ConversationComposer, text: &str) {
        for c in text.chars() {
            composer.handle_key(press(KeyCode::Char(c)));
        }
    }

    #[test]
    fn enter_returns_buffer_without_clearing() {
        let mut composer = ConversationComposer::new(PLACEHOLDER);
        type_str(&mut composer, " hi ");

        assert_eq!(
            composer.handle_key(press(KeyCode::Enter)),
            ComposerResult::Submit(" hi ".to_string())
        );
        assert_eq!(composer.content(), " hi ");
    }

    #[test]
    fn shift_enter_inserts_newline() {
        let mut composer = ConversationComposer::new(PLACEHOLDER);
        type_str(&mut composer, "a");
        composer.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT));
        type_str(&mut composer, "b");

        assert_eq!(composer.content(), "a\nb");
        assert_eq!(composer.desired_height(40, 4), 4);
    }

    #[test]
    fn editing_is_char_aware() {
        let mut composer = ConversationComposer::new(PLACEHOLDER);
        type_str(&mut composer, "héllo");
        composer.handle_key(press(KeyCode::Left));
        composer.handle_key(press(KeyCode::Left));
        composer.handle_key(press(KeyCode::Left));
        composer.handle_key(press(KeyCode::Backspace));
        assert_eq!(composer.content(), "hllo");

        composer.handle_key(press(KeyCode::Home));
        composer.handle_key(press(KeyCode::Delete));
        composer.handle_key(press(KeyCode::End));
        type_str(&mut composer, "ü");
        assert_eq!(composer.content(), "lloü");
    }

    #[test]
    fn paste_normalizes_carriage_returns() {
        let mut composer = ConversationComposer::new(PLACEHOLDER);
        composer.paste("line one\r\nline two\rline three");
        assert_eq!(composer.content(), "line one\nline two\nline three");
    }

    #[test]
    fn send_affordance_tracks_input_and_lock() {
        let mut composer = ConversationComposer::new(PLACEHOLDER);
        assert!(!composer.can_send());

        type_str(&mut composer, "   ");
        assert!(!composer.can_send());

        type_str(&mut composer, "x");
        assert!(composer.can_send());

        composer.set_locked(true);
        assert!(!composer.can_send());
    }

    #[test]
    fn renders_placeholder_when_empty() {
        let composer = ConversationComposer::new(PLACEHOLDER);
        let area = Rect::new(0, 0, 60, 3);
        let mut buf = Buffer::empty(area);
        (&composer).render(area, &mut buf);

        let row: String = (0..area.width)
            .map(|x| buf.get(x, 1).symbol().to_string())
            .collect();
        assert!(row.contains("Ask me anything"));
    }

    fn rendered_rows(composer: &ConversationComposer, width: u16, height: u16) -> Vec<String> {
        let area = Rect::new(0, 0, width, height);
        let mut buf = Buffer::empty(area);
        composer.render(area, &mut buf);
        (0..height)
            .map(|y| (0..width).map(|x| buf.get(x, y).symbol()).collect())
            .collect()
    }

    #[test]
    fn long_line_wraps_inside_the_box() {
        let mut composer = ConversationComposer::new(PLACEHOLDER);
        type_str(
            &mut composer,
            "please summarise the latest papers on diffusion models for video generation END",
        );

        let height = composer.desired_height(30, 6);
        assert!(height > 3);

        let text = rendered_rows(&composer, 30, height).concat();
        assert!(text.contains("please summarise"));
        assert!(text.contains("END▌"));
    }

    #[test]
    fn cursor_row_stays_visible_in_a_short_box() {
        let mut composer = ConversationComposer::new(PLACEHOLDER);
        type_str(
            &mut composer,
            "please summarise the latest papers on diffusion models for video generation END",
        );

        let rows = rendered_rows(&composer, 30, 3);
        assert!(rows[1].contains("END▌"));

        composer.handle_key(press(KeyCode::Home));
        let rows = rendered_rows(&composer, 30, 3);
        assert!(rows[1].contains("▌please"));
    }
}
