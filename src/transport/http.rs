//! reqwest-backed transport

use super::types::{ExperienceDocument, OutboundPayload, RawReply};
use super::ChatTransport;
use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::session::SessionId;
use async_trait::async_trait;
use reqwest::Client;

/// Transport talking to the assistant service over HTTP
pub struct HttpTransport {
    client: Client,
    config: ChatConfig,
}

impl HttpTransport {
    pub fn new(config: &ChatConfig) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ChatError::transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn experience_url(&self, experience_id: &str) -> String {
        self.config.url(&format!("/api/experiences/{experience_id}"))
    }

    fn chat_url(&self, session_id: &SessionId) -> String {
        self.config.url(&format!("/api/{session_id}/chat"))
    }
}

fn classify_send_error(e: &reqwest::Error) -> ChatError {
    if e.is_timeout() {
        ChatError::transport(format!("Request timeout: {e}"))
    } else if e.is_connect() {
        ChatError::transport(format!("Connection failed: {e}"))
    } else {
        ChatError::transport(format!("Request failed: {e}"))
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn fetch_experience(&self, experience_id: &str) -> Result<ExperienceDocument, ChatError> {
        let response = self
            .client
            .get(self.experience_url(experience_id))
            .send()
            .await
            .map_err(|e| classify_send_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::transport(format!(
                "Experience lookup returned {status}"
            )));
        }

        response
            .json::<ExperienceDocument>()
            .await
            .map_err(|e| ChatError::transport(format!("Failed to parse experience: {e}")))
    }

    async fn post_message(
        &self,
        session_id: &SessionId,
        payload: &OutboundPayload,
    ) -> Result<RawReply, ChatError> {
        let mut response = self
            .client
            .post(self.chat_url(session_id))
            .json(payload)
            .send()
            .await
            .map_err(|e| classify_send_error(&e))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();

        // The body carries audio that is never played; read it to the end so
        // the connection goes back to the pool, one chunk at a time.
        let mut body_len = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ChatError::transport(format!("Failed to read response: {e}")))?
        {
            body_len += chunk.len();
        }

        Ok(RawReply {
            status,
            headers,
            body_len,
        })
    }
}
