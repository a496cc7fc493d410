//! Per-embedding session identity

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque correlation token sent in the chat request path.
///
/// Version-4 UUID layout; it is not a secret, so uniqueness is only a
/// collision-avoidance heuristic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh identifier
    pub fn create() -> Self {
        Self(Uuid::new_v4().hyphenated().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One embedding's session; immutable once created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub experience_id: String,
    pub assistant_name: String,
}

impl Session {
    pub fn new(experience_id: impl Into<String>, assistant_name: impl Into<String>) -> Self {
        Self {
            session_id: SessionId::create(),
            experience_id: experience_id.into(),
            assistant_name: assistant_name.into(),
        }
    }
}
