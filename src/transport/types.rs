//! Wire types for the assistant service

use crate::session::Session;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/{sessionId}/chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundPayload {
    pub experience_id: String,
    /// The service names this field after the experience, but it carries
    /// the assistant name
    pub experience_name: String,
    pub message: String,
    /// Assistant identifier from the experience directory
    pub assistant: String,
}

impl OutboundPayload {
    pub fn new(session: &Session, assistant_id: &str, message: &str) -> Self {
        Self {
            experience_id: session.experience_id.clone(),
            experience_name: session.assistant_name.clone(),
            message: message.to_string(),
            assistant: assistant_id.to_string(),
        }
    }
}

/// Document returned by `GET /api/experiences/{experienceId}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceDocument {
    pub assistants: Vec<AssistantEntry>,
}

/// One assistant deployed in an experience
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantEntry {
    pub name: String,
    #[serde(default)]
    pub assistant_id: String,
    #[serde(default)]
    pub initial_video: String,
    #[serde(default)]
    pub initial_prompt: String,
    #[serde(default)]
    pub initial_responses: Vec<String>,
}

/// Reply to a chat post. The body has already been drained; only its
/// length is kept.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawReply {
    pub status: u16,
    pub headers: HeaderMap,
    pub body_len: usize,
}

impl RawReply {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body_len: 0,
        }
    }

    /// Attach a header; invalid names or values are skipped
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    #[must_use]
    pub fn with_body_len(mut self, body_len: usize) -> Self {
        self.body_len = body_len;
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
