//! Transport abstraction for the assistant service
//!
//! The session runtime only talks to the service through [`ChatTransport`],
//! so tests can swap in a mock.

mod http;
mod types;

pub use http::HttpTransport;
pub use types::*;

use crate::error::ChatError;
use crate::session::SessionId;
use async_trait::async_trait;
use std::sync::Arc;

/// The two calls a session makes against the assistant service
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// `GET /api/experiences/{experience_id}`
    async fn fetch_experience(&self, experience_id: &str) -> Result<ExperienceDocument, ChatError>;

    /// `POST /api/{session_id}/chat`, body drained before returning
    async fn post_message(
        &self,
        session_id: &SessionId,
        payload: &OutboundPayload,
    ) -> Result<RawReply, ChatError>;
}

#[async_trait]
impl<T: ChatTransport + ?Sized> ChatTransport for Arc<T> {
    async fn fetch_experience(&self, experience_id: &str) -> Result<ExperienceDocument, ChatError> {
        (**self).fetch_experience(experience_id).await
    }

    async fn post_message(
        &self,
        session_id: &SessionId,
        payload: &OutboundPayload,
    ) -> Result<RawReply, ChatError> {
        (**self).post_message(session_id, payload).await
    }
}

/// Logging wrapper for transports
pub struct LoggingTransport {
    inner: Arc<dyn ChatTransport>,
}

impl LoggingTransport {
    pub fn new(inner: Arc<dyn ChatTransport>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ChatTransport for LoggingTransport {
    async fn fetch_experience(&self, experience_id: &str) -> Result<ExperienceDocument, ChatError> {
        let start = std::time::Instant::now();
        let result = self.inner.fetch_experience(experience_id).await;
        let duration = start.elapsed();

        match &result {
            Ok(document) => {
                tracing::info!(
                    experience_id = %experience_id,
                    duration_ms = %duration.as_millis(),
                    assistants = document.assistants.len(),
                    "Experience lookup completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    experience_id = %experience_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    "Experience lookup failed"
                );
            }
        }

        result
    }

    async fn post_message(
        &self,
        session_id: &SessionId,
        payload: &OutboundPayload,
    ) -> Result<RawReply, ChatError> {
        let start = std::time::Instant::now();
        let result = self.inner.post_message(session_id, payload).await;
        let duration = start.elapsed();

        match &result {
            Ok(reply) => {
                tracing::info!(
                    session_id = %session_id,
                    duration_ms = %duration.as_millis(),
                    status = reply.status,
                    body_bytes = reply.body_len,
                    "Chat request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    session_id = %session_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    "Chat request failed"
                );
            }
        }

        result
    }
}
