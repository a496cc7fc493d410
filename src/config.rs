//! Session configuration

use std::time::Duration;

/// Service the embedding talks to when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "https://teddy.chat";

/// Deadline applied to every request; the protocol itself has none
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for one embedded chat session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Service origin, without trailing slash
    pub base_url: String,
    pub experience_id: String,
    pub assistant_name: String,
    pub request_timeout: Duration,
}

impl ChatConfig {
    pub fn new(experience_id: impl Into<String>, assistant_name: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            experience_id: experience_id.into(),
            assistant_name: assistant_name.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn from_env() -> Self {
        let mut config = Self::new(
            std::env::var("EMBED_CHAT_EXPERIENCE").unwrap_or_default(),
            std::env::var("EMBED_CHAT_ASSISTANT").unwrap_or_default(),
        );

        if let Ok(base_url) = std::env::var("EMBED_CHAT_BASE_URL") {
            config = config.with_base_url(base_url);
        }

        if let Some(secs) = std::env::var("EMBED_CHAT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            config = config.with_request_timeout(Duration::from_secs(secs));
        }

        config
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Absolute URL for a service path such as `/api/experiences/x`
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Both identifiers are needed before a session can resolve its assistant
    pub fn is_complete(&self) -> bool {
        !self.experience_id.is_empty() && !self.assistant_name.is_empty()
    }
}
