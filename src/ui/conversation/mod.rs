//! Conversation UI components for the chat interface

pub mod composer;
pub mod history;
pub mod indicator;
pub mod manager;

pub use composer::{ComposerResult, ConversationComposer, PLACEHOLDER};
pub use history::ConversationHistory;
pub use indicator::ThinkingIndicator;
pub use manager::{ConversationAction, ConversationManager};
