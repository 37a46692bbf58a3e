//! Conversation history display component

use super::indicator::ThinkingIndicator;
use crate::events::{Message, Role};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Scrollbar, ScrollbarOrientation, ScrollbarState, StatefulWidget, Widget},
};
use unicode_width::UnicodeWidthChar;

/// Renders the conversation, bottom-anchored, with an optional thinking line
pub struct ConversationHistory<'a> {
    messages: &'a [Message],
    indicator: Option<ThinkingIndicator>,
    scroll_back: usize,
    show_timestamps: bool,
}

impl<'a> ConversationHistory<'a> {
    pub fn new(messages: &'a [Message]) -> Self {
        Self {
            messages,
            indicator: None,
            scroll_back: 0,
            show_timestamps: true,
        }
    }

    /// Show the thinking indicator after the last message
    pub fn thinking(mut self, indicator: Option<ThinkingIndicator>) -> Self {
        self.indicator = indicator;
        self
    }

    /// Lines scrolled up from the bottom
    pub fn scroll_back(mut self, lines: usize) -> Self {
        self.scroll_back = lines;
        self
    }

    pub fn show_timestamps(mut self, show: bool) -> Self {
        self.show_timestamps = show;
        self
    }

    /// All lines for the given content width, top to bottom
    pub fn lines(&self, width: u16) -> Vec<Line<'a>> {
        let mut all_lines = Vec::new();
        for message in self.messages {
            all_lines.extend(self.render_message(message, width));
            all_lines.push(Line::default());
        }
        if let Some(indicator) = self.indicator {
            all_lines.push(indicator.line());
        }
        all_lines
    }

    fn render_message(&self, message: &'a Message, width: u16) -> Vec<Line<'a>> {
        let mut lines = Vec::new();

        let (marker, header_style) = match message.role {
            Role::User => ("▶", Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD)),
            Role::Assistant => ("◆", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
        };

        let mut header = vec![Span::styled(
            format!("{} {}", marker, message.role.display_name()),
            header_style,
        )];
        if self.show_timestamps {
            header.push(Span::styled(
                format!(" {}", message.sent_at.format("%H:%M:%S")),
                Style::default().fg(Color::DarkGray),
            ));
        }
        lines.push(Line::from(header));

        for content_line in wrap_text(&message.content, width.saturating_sub(2) as usize) {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(content_line, content_style(message.role)),
            ]));
        }

        lines
    }
}

fn content_style(role: Role) -> Style {
    match role {
        Role::User => Style::default().fg(Color::LightBlue),
        Role::Assistant => Style::default().fg(Color::White),
    }
}

/// Wrap text to `width` terminal columns, keeping line breaks, blank lines and
/// runs of spaces. Wide characters count as two columns.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for raw_line in text.split('\n') {
        let raw_line = raw_line.trim_end_matches('\r').replace('\t', "    ");
        if width == 0 {
            lines.push(raw_line);
            continue;
        }

        let mut current: Vec<char> = Vec::new();
        let mut used = 0;
        for c in raw_line.chars() {
            let char_width = c.width().unwrap_or(0);
            while used + char_width > width && !current.is_empty() {
                // Prefer breaking after the last space on the row
                let split = current
                    .iter()
                    .rposition(|ch| *ch == ' ')
                    .filter(|&pos| pos > 0)
                    .map(|pos| pos + 1)
                    .unwrap_or(current.len());
                let rest = current.split_off(split);
                lines.push(current.into_iter().collect());
                used = rest.iter().map(|ch| ch.width().unwrap_or(0)).sum();
                current = rest;
            }
            current.push(c);
            used += char_width;
        }
        lines.push(current.into_iter().collect());
    }

    lines
}

impl Widget for ConversationHistory<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Conversation ");

        let inner_area = block.inner(area);
        block.render(area, buf);

        let all_lines = self.lines(inner_area.width.saturating_sub(1));

        // Bottom-anchored window, shifted up by scroll_back
        let height = inner_area.height as usize;
        let total = all_lines.len();
        let max_back = total.saturating_sub(height);
        let back = self.scroll_back.min(max_back);
        let end = total - back;
        let start = end.saturating_sub(height);

        for (i, line) in all_lines[start..end].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }

        if total > height {
            let mut scroll_state = ScrollbarState::new(max_back).position(max_back - back);
            Scrollbar::default()
                .orientation(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"))
                .render(inner_area, buf, &mut scroll_state);
        }
    }
}
