//! Mock agent client for tests

use crate::agent::{AgentClient, AgentError};
use crate::events::{Message, Role};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Mock client that returns queued replies and records every payload
pub struct MockAgentClient {
    replies: Mutex<VecDeque<Result<String, AgentError>>>,
    requests: Mutex<Vec<Vec<(Role, String)>>>,
}

impl MockAgentClient {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful reply
    pub fn queue_reply(&self, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(message.to_string()));
    }

    /// Queue an error
    pub fn queue_error(&self, error: AgentError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    /// Queue an HTTP 500
    pub fn queue_server_error(&self) {
        self.queue_error(AgentError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "Internal Server Error".to_string(),
        });
    }

    /// Payloads seen so far, as (role, content) pairs
    pub fn recorded_requests(&self) -> Vec<Vec<(Role, String)>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentClient for MockAgentClient {
    async fn send(&self, messages: &[Message]) -> Result<String, AgentError> {
        self.requests
            .lock()
            .unwrap()
            .push(messages.iter().map(|m| (m.role, m.content.clone())).collect());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(AgentError::Aborted))
    }

    fn endpoint(&self) -> &str {
        "mock://agent/chat"
    }
}

/// Flatten messages for equality checks
pub fn pairs(messages: &[Message]) -> Vec<(Role, String)> {
    messages
        .iter()
        .map(|m| (m.role, m.content.clone()))
        .collect()
}
