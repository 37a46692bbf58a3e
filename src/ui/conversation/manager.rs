use crate::agent::{AgentClient, AgentError};
use crate::events::AppEvent;
use crate::session::{ChatSession, Phase, Resolution};
use crate::ui::conversation::{
    ComposerResult, ConversationComposer, ConversationHistory, ThinkingIndicator, PLACEHOLDER,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Exit,
}

/// Delivers exactly one reply to the UI loop. If dropped before `deliver`,
/// for example when the request task panics, it reports `AgentError::Aborted`.
pub struct ReplyGuard {
    tx: Option<mpsc::UnboundedSender<AppEvent>>,
}

impl ReplyGuard {
    pub fn new(tx: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn deliver(mut self, outcome: Result<String, AgentError>) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(AppEvent::AgentReply(outcome));
        }
    }
}

impl Drop for ReplyGuard {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(AppEvent::AgentReply(Err(AgentError::Aborted)));
        }
    }
}

/// Owns the chat session and the UI components around it
pub struct ConversationManager {
    session: ChatSession,
    composer: ConversationComposer,
    indicator: ThinkingIndicator,
    client: Arc<dyn AgentClient>,
    reply_tx: mpsc::UnboundedSender<AppEvent>,
    scroll_back: usize,
    seen_len: usize,
    show_timestamps: bool,
}

impl ConversationManager {
    pub fn new(client: Arc<dyn AgentClient>, reply_tx: mpsc::UnboundedSender<AppEvent>) -> Self {
        let session = ChatSession::new();
        let seen_len = session.len();

        Self {
            session,
            composer: ConversationComposer::new(PLACEHOLDER),
            indicator: ThinkingIndicator::default(),
            client,
            reply_tx,
            scroll_back: 0,
            seen_len,
            show_timestamps: true,
        }
    }

    pub fn with_timestamps(mut self, show: bool) -> Self {
        self.show_timestamps = show;
        self
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    #[cfg(test)]
    pub fn composer(&self) -> &ConversationComposer {
        &self.composer
    }

    /// Route one application event
    pub fn handle_event(&mut self, event: AppEvent) -> ConversationAction {
        match event {
            AppEvent::Key(key) => return self.handle_key(key),
            AppEvent::Mouse(mouse) => self.handle_mouse(mouse),
            AppEvent::Paste(text) => self.composer.paste(&text),
            AppEvent::Resize => {}
            AppEvent::Tick => {
                if self.session.is_busy() {
                    self.indicator.tick();
                }
            }
            AppEvent::AgentReply(outcome) => self.finish(outcome),
        }
        ConversationAction::None
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => return ConversationAction::Exit,
            KeyCode::Char('c') | KeyCode::Char('d') if ctrl => return ConversationAction::Exit,
            KeyCode::PageUp => {
                self.scroll_back = self.scroll_back.saturating_add(10);
                return ConversationAction::None;
            }
            KeyCode::PageDown => {
                self.scroll_back = self.scroll_back.saturating_sub(10);
                return ConversationAction::None;
            }
            _ => {}
        }

        if let ComposerResult::Submit(input) = self.composer.handle_key(key) {
            self.submit(&input);
        }
        ConversationAction::None
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp => self.scroll_back = self.scroll_back.saturating_add(3),
            MouseEventKind::ScrollDown => self.scroll_back = self.scroll_back.saturating_sub(3),
            _ => {}
        }
    }

    /// Start a submission and hand the request to a background task.
    /// Rejected input leaves the composer untouched.
    pub fn submit(&mut self, input: &str) {
        let Some(submission) = self.session.begin_submission(input) else {
            return;
        };

        self.composer.clear();
        self.composer.set_locked(true);
        self.indicator.reset();
        self.sync_scroll();

        let client = Arc::clone(&self.client);
        let guard = ReplyGuard::new(self.reply_tx.clone());
        let payload = submission.into_payload();

        tokio::spawn(async move {
            let outcome = client.send(&payload).await;
            guard.deliver(outcome);
        });
    }

    fn finish(&mut self, outcome: Result<String, AgentError>) {
        if let Some(resolution) = self.session.resolve(outcome) {
            tracing::debug!(
                session = %self.session.id(),
                succeeded = resolution == Resolution::Succeeded,
                "submission resolved"
            );
        }
        self.composer.set_locked(self.session.is_busy());
        self.sync_scroll();
    }

    /// Snap to the newest message whenever the conversation grows
    fn sync_scroll(&mut self) {
        if self.session.len() != self.seen_len {
            self.seen_len = self.session.len();
            self.scroll_back = 0;
        }
    }

    /// Render header, history, composer and footer
    pub fn render(&self, area: Rect, buf: &mut Buffer) {
        let composer_height = self.composer.desired_height(area.width, 6);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),               // Header
                Constraint::Min(3),                  // History
                Constraint::Length(composer_height), // Composer
                Constraint::Length(1),               // Footer
            ])
            .split(area);

        self.render_header(chunks[0], buf);

        let indicator = self.session.is_busy().then_some(self.indicator);
        ConversationHistory::new(self.session.messages())
            .thinking(indicator)
            .scroll_back(self.scroll_back)
            .show_timestamps(self.show_timestamps)
            .render(chunks[1], buf);

        (&self.composer).render(chunks[2], buf);

        self.render_footer(chunks[3], buf);
    }

    fn render_header(&self, area: Rect, buf: &mut Buffer) {
        let dot_color = match self.session.phase() {
            Phase::Idle => Color::Green,
            Phase::Sending => Color::Yellow,
        };
        let line = Line::from(vec![
            Span::styled(" ● ", Style::default().fg(dot_color)),
            Span::styled(
                "Arxiv Research Agent",
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {}", self.client.endpoint()),
                Style::default().fg(Color::DarkGray),
            ),
        ]);
        buf.set_line(area.x, area.y, &line, area.width);
    }

    fn render_footer(&self, area: Rect, buf: &mut Buffer) {
        let line = Line::from(vec![
            Span::styled(
                " Enter send · Shift+Enter newline · PgUp/PgDn scroll · Esc quit",
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled(
                "   POWERED BY AGENTLIGHTNING",
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM),
            ),
        ]);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}
