use crate::events::{Message, Role};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ways a single agent request can fail
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("could not reach the agent: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("agent responded with status {status}")]
    Status { status: StatusCode, body: String },

    #[error("agent reply was not understood: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("agent request ended before a reply was delivered")]
    Aborted,
}

impl AgentError {
    /// Short label for log fields
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::Transport(_) => "transport",
            AgentError::Status { .. } => "status",
            AgentError::Malformed(_) => "malformed",
            AgentError::Aborted => "aborted",
        }
    }
}

/// Message as it appears on the wire
#[derive(Debug, Serialize)]
pub struct WireMessage<'a> {
    pub role: Role,
    pub content: &'a str,
}

/// Body of `POST /chat`
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub messages: Vec<WireMessage<'a>>,
}

impl<'a> ChatRequest<'a> {
    pub fn from_messages(messages: &'a [Message]) -> Self {
        Self {
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
        }
    }
}

/// Successful reply body
#[derive(Debug, Deserialize)]
pub struct ChatReply {
    pub message: String,
}

/// Client for the remote research agent
#[async_trait]
pub trait AgentClient: Send + Sync {
    /// Send the full conversation and return the agent's reply text
    async fn send(&self, messages: &[Message]) -> Result<String, AgentError>;

    /// Where requests go, for diagnostics
    fn endpoint(&self) -> &str;
}

/// HTTP client posting the conversation as JSON
#[derive(Clone)]
pub struct HttpAgentClient {
    endpoint: Url,
    client: reqwest::Client,
}

impl HttpAgentClient {
    /// No request timeout is set; a request runs until the agent answers or the connection fails.
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .with_context(|| format!("Invalid agent endpoint: {endpoint}"))?;
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { endpoint, client })
    }
}

#[async_trait]
impl AgentClient for HttpAgentClient {
    async fn send(&self, messages: &[Message]) -> Result<String, AgentError> {
        let payload = ChatRequest::from_messages(messages);

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(AgentError::Status { status, body });
        }

        let reply: ChatReply = serde_json::from_str(&body)?;
        Ok(reply.message)
    }

    fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Captured request head and body
    struct CapturedRequest {
        head: String,
        body: String,
    }

    /// Serve exactly one canned HTTP response and hand back what was received
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, oneshot::Receiver<CapturedRequest>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 1024];

            let head_end = loop {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
                assert!(n > 0, "connection closed before headers finished");
            };

            let head = String::from_utf8_lossy(&raw[..head_end]).to_string();
            let content_length = head
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);

            while raw.len() < head_end + content_length {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
            }
            let request_body = String::from_utf8_lossy(&raw[head_end..]).to_string();

            let response = format!(
                "{status_line}\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\
                 \r\n\
                 {body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = tx.send(CapturedRequest {
                head,
                body: request_body,
            });
        });

        (format!("http://{addr}/chat"), rx)
    }

    fn history() -> Vec<Message> {
        vec![
            Message::assistant("Hello! I am your Arxiv Research Agent. How can I help you today?"),
            Message::user("hello"),
        ]
    }

    #[tokio::test]
    async fn posts_full_history_and_returns_message() {
        let (url, captured) = serve_once("HTTP/1.1 200 OK", r#"{"message":"hi there"}"#).await;
        let client = HttpAgentClient::new(&url).unwrap();

        let reply = client.send(&history()).await.unwrap();
        assert_eq!(reply, "hi there");

        let request = captured.await.unwrap();
        assert!(request.head.starts_with("POST /chat HTTP/1.1"));
        assert!(request
            .head
            .to_lowercase()
            .contains("content-type: application/json"));

        let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "messages": [
                    {"role": "assistant", "content": "Hello! I am your Arxiv Research Agent. How can I help you today?"},
                    {"role": "user", "content": "hello"}
                ]
            })
        );
    }

    #[tokio::test]
    async fn extra_reply_fields_are_ignored() {
        let (url, _captured) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"message":"found 2 papers","sources":["2401.00001"]}"#,
        )
        .await;
        let client = HttpAgentClient::new(&url).unwrap();

        assert_eq!(client.send(&history()).await.unwrap(), "found 2 papers");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let (url, _captured) =
            serve_once("HTTP/1.1 500 Internal Server Error", r#"{"detail":"boom"}"#).await;
        let client = HttpAgentClient::new(&url).unwrap();

        let err = client.send(&history()).await.unwrap_err();
        match err {
            AgentError::Status { status, body } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert!(body.contains("boom"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn body_that_is_not_json_is_malformed() {
        let (url, _captured) = serve_once("HTTP/1.1 200 OK", "<html>oops</html>").await;
        let client = HttpAgentClient::new(&url).unwrap();

        let err = client.send(&history()).await.unwrap_err();
        assert_eq!(err.kind(), "malformed");
    }

    #[tokio::test]
    async fn missing_or_mistyped_message_field_is_malformed() {
        let (url, _captured) = serve_once("HTTP/1.1 200 OK", r#"{"reply":"hi"}"#).await;
        let client = HttpAgentClient::new(&url).unwrap();
        assert_eq!(client.send(&history()).await.unwrap_err().kind(), "malformed");

        let (url, _captured) = serve_once("HTTP/1.1 200 OK", r#"{"message":42}"#).await;
        let client = HttpAgentClient::new(&url).unwrap();
        assert_eq!(client.send(&history()).await.unwrap_err().kind(), "malformed");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpAgentClient::new(&format!("http://{addr}/chat")).unwrap();
        let err = client.send(&history()).await.unwrap_err();
        assert_eq!(err.kind(), "transport");
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        assert!(HttpAgentClient::new("not a url").is_err());
    }
}
