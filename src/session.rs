use crate::agent::{AgentClient, AgentError};
use crate::events::Message;
use uuid::Uuid;

/// Seed message every conversation starts with
pub const GREETING: &str = "Hello! I am your Arxiv Research Agent. How can I help you today?";

/// Appended, in order, whenever a request fails
pub const FALLBACK_MESSAGES: [&str; 2] = [
    "Sorry, I encountered an error connecting to the agent.",
    "Ensure the backend server is running on port 8000.",
];

/// Submission phase. At most one submission is ever in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Sending,
}

/// How a submission ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Succeeded,
    Failed,
}

/// A dispatched submission: the payload snapshot to send
#[derive(Debug)]
#[must_use = "a submission leaves the session busy until it is resolved"]
pub struct Submission {
    payload: Vec<Message>,
}

impl Submission {
    pub fn payload(&self) -> &[Message] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<Message> {
        self.payload
    }
}

/// Conversation store and busy flag for one chat session
pub struct ChatSession {
    id: Uuid,
    messages: Vec<Message>,
    phase: Phase,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    /// Start a session seeded with the greeting
    pub fn new() -> Self {
        let session = Self {
            id: Uuid::new_v4(),
            messages: vec![Message::assistant(GREETING)],
            phase: Phase::Idle,
        };
        tracing::debug!(session = %session.id, "chat session started");
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Messages in insertion order; never empty
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.phase == Phase::Sending
    }

    /// Append a message to the end of the conversation
    pub fn append_message(&mut self, message: Message) {
        tracing::trace!(
            session = %self.id,
            role = %message.role,
            chars = message.content.chars().count(),
            "message appended"
        );
        self.messages.push(message);
    }

    /// Append the user's message, mark the session busy and snapshot the payload.
    ///
    /// Returns `None` without touching anything when the trimmed input is empty
    /// or a submission is already in flight. The untrimmed text is what gets stored.
    pub fn begin_submission(&mut self, raw: &str) -> Option<Submission> {
        if raw.trim().is_empty() {
            return None;
        }
        if self.is_busy() {
            tracing::debug!(session = %self.id, "submission rejected while a request is in flight");
            return None;
        }

        self.append_message(Message::user(raw));
        self.phase = Phase::Sending;

        tracing::info!(
            session = %self.id,
            messages = self.messages.len(),
            "submitting conversation to agent"
        );

        Some(Submission {
            payload: self.messages.clone(),
        })
    }

    /// Record the outcome of the in-flight submission and return to idle.
    ///
    /// Returns `None` if nothing was in flight.
    pub fn resolve(&mut self, outcome: Result<String, AgentError>) -> Option<Resolution> {
        if !self.is_busy() {
            tracing::debug!(session = %self.id, "ignoring agent reply with no submission in flight");
            return None;
        }

        let resolution = match outcome {
            Ok(reply) => {
                tracing::info!(session = %self.id, reply_len = reply.len(), "agent replied");
                self.append_message(Message::assistant(reply));
                Resolution::Succeeded
            }
            Err(err) => {
                tracing::warn!(
                    session = %self.id,
                    kind = err.kind(),
                    error = %err,
                    "agent request failed"
                );
                for text in FALLBACK_MESSAGES {
                    self.append_message(Message::assistant(text));
                }
                Resolution::Failed
            }
        };

        self.phase = Phase::Idle;
        Some(resolution)
    }

    /// Run one full submission inline: append, send, record the result.
    pub async fn submit(&mut self, raw: &str, client: &dyn AgentClient) -> Option<Resolution> {
        let submission = self.begin_submission(raw)?;
        let outcome = client.send(submission.payload()).await;
        self.resolve(outcome)
    }
}
