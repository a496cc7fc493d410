//! Exchange state types

use crate::directory::AssistantConfig;
use crate::error::ErrorKind;
use crate::session::Session;
use serde::{Deserialize, Serialize};

/// Message exchange state
///
/// Outbound text travels with the in-flight states so a failure can turn it
/// into the pending retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExchangeState {
    /// Ready for the next message
    Idle {
        /// Text of the last failed message, until retried or superseded
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pending_retry: Option<String>,
    },

    /// Request in flight
    Sending { text: String },

    /// Response received, reply being decoded
    AwaitingDecode { text: String },

    /// Exchange failed; settles back to idle with `text` pending retry
    Error { kind: ErrorKind, text: String },
}

impl Default for ExchangeState {
    fn default() -> Self {
        Self::idle()
    }
}

impl ExchangeState {
    pub fn idle() -> Self {
        ExchangeState::Idle {
            pending_retry: None,
        }
    }

    pub fn idle_with_retry(text: impl Into<String>) -> Self {
        ExchangeState::Idle {
            pending_retry: Some(text.into()),
        }
    }

    /// Whether an outbound message is outstanding
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            ExchangeState::Sending { .. } | ExchangeState::AwaitingDecode { .. }
        )
    }

    pub fn pending_retry(&self) -> Option<&str> {
        match self {
            ExchangeState::Idle { pending_retry } => pending_retry.as_deref(),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExchangeState::Idle { .. } => "idle",
            ExchangeState::Sending { .. } => "sending",
            ExchangeState::AwaitingDecode { .. } => "awaiting_decode",
            ExchangeState::Error { .. } => "error",
        }
    }
}

/// Context for an exchange (per-session configuration)
#[derive(Debug, Clone)]
pub struct ExchangeContext {
    pub session: Session,
    /// Set once the directory resolves the assistant
    pub assistant: Option<AssistantConfig>,
}

impl ExchangeContext {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            assistant: None,
        }
    }

    #[must_use]
    pub fn with_assistant(mut self, assistant: AssistantConfig) -> Self {
        self.assistant = Some(assistant);
        self
    }

    /// Label shown next to the typing indicator
    pub fn typing_label(&self) -> String {
        let name = self
            .assistant
            .as_ref()
            .map_or(self.session.assistant_name.as_str(), |a| a.name.as_str());
        format!("{name} is typing...")
    }
}
