use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

/// Animated "Thinking..." line shown while a request is in flight
#[derive(Debug, Clone, Copy, Default)]
pub struct ThinkingIndicator {
    frame: usize,
}

impl ThinkingIndicator {
    /// Advance one animation step
    pub fn tick(&mut self) {
        self.frame = self.frame.wrapping_add(1);
    }

    pub fn reset(&mut self) {
        self.frame = 0;
    }

    pub fn line(&self) -> Line<'static> {
        let dots = ["●○○", "○●○", "○○●", "○●○"][self.frame % 4];
        let label = match self.frame % 4 {
            0 => "Thinking.  ",
            1 => "Thinking.. ",
            _ => "Thinking...",
        };

        Line::from(vec![
            Span::raw("  "),
            Span::styled(dots, Style::default().fg(Color::Magenta)),
            Span::raw(" "),
            Span::styled(
                label,
                Style::default()
                    .fg(Color::Gray)
                    .add_modifier(Modifier::ITALIC),
            ),
        ])
    }
}
