//! Assistant lookup for an experience
//!
//! An experience is a named deployment listing one or more assistants. The
//! session picks its assistant by exact name match, once per lifetime.

use crate::error::ChatError;
use crate::transport::{AssistantEntry, ChatTransport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Resolved assistant; immutable once resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantConfig {
    pub assistant_id: String,
    /// Display name
    pub name: String,
    pub initial_prompt_text: String,
    /// Path of the greeting video, relative to the service origin
    pub initial_video_path: String,
    pub initial_suggestions: Vec<String>,
}

impl From<AssistantEntry> for AssistantConfig {
    fn from(entry: AssistantEntry) -> Self {
        Self {
            assistant_id: entry.assistant_id,
            name: entry.name,
            initial_prompt_text: entry.initial_prompt,
            initial_video_path: entry.initial_video,
            initial_suggestions: entry.initial_responses,
        }
    }
}

/// Resolves and caches the session's assistant.
///
/// Only a successful resolution is cached; failures leave the directory
/// empty so a later call performs a fresh lookup.
pub struct AssistantDirectory<T: ChatTransport> {
    transport: Arc<T>,
    resolved: OnceCell<AssistantConfig>,
}

impl<T: ChatTransport> AssistantDirectory<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            resolved: OnceCell::new(),
        }
    }

    /// Resolve `assistant_name` within `experience_id`. The first success
    /// wins; later calls return it without a network round trip.
    pub async fn resolve(
        &self,
        experience_id: &str,
        assistant_name: &str,
    ) -> Result<&AssistantConfig, ChatError> {
        self.resolved
            .get_or_try_init(|| lookup(self.transport.as_ref(), experience_id, assistant_name))
            .await
    }
}

async fn lookup<T: ChatTransport>(
    transport: &T,
    experience_id: &str,
    assistant_name: &str,
) -> Result<AssistantConfig, ChatError> {
    let document = transport
        .fetch_experience(experience_id)
        .await
        .map_err(|e| ChatError::directory_unavailable(e.message))?;

    document
        .assistants
        .into_iter()
        .find(|entry| entry.name == assistant_name)
        .map(AssistantConfig::from)
        .ok_or_else(|| {
            ChatError::assistant_not_found(format!(
                "Experience {experience_id} has no assistant named '{assistant_name}'"
            ))
        })
}
