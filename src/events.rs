use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumMessage, IntoStaticStr};

use crate::agent::AgentError;

/// Internal application events delivered to the UI loop
#[derive(Debug)]
pub enum AppEvent {
    /// Key press event
    Key(crossterm::event::KeyEvent),

    /// Mouse event
    Mouse(crossterm::event::MouseEvent),

    /// Bracketed paste
    Paste(String),

    /// Terminal resize; the next draw picks up the new size
    Resize,

    /// Animation tick
    Tick,

    /// Outcome of the in-flight agent request
    AgentReply(Result<String, AgentError>),
}

/// Speaker tag on a message
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumMessage, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    #[strum(message = "You")]
    User,
    #[strum(message = "Agent")]
    Assistant,
}

impl Role {
    /// Label shown above the message in the history
    pub fn display_name(&self) -> &'static str {
        self.get_message().unwrap_or_else(|| self.into())
    }
}

/// Individual conversation entry
#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Display only, never sent to the agent
    pub sent_at: DateTime<Local>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            sent_at: Local::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}
