//! Error taxonomy for chat sessions

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Chat error with classification
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ChatError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ChatError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn directory_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DirectoryUnavailable, message)
    }

    pub fn assistant_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AssistantNotFound, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransportFailure, message)
    }

    pub fn malformed_encoding(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedEncoding, message)
    }

    pub fn malformed_payload(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedPayload, message)
    }
}

/// Error classification, reported to the collaborator with every failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Experience lookup failed (transport, status, or undecodable document)
    DirectoryUnavailable,
    /// Experience has no assistant with the configured name
    AssistantNotFound,
    /// A message was sent before the assistant was resolved
    NotInitialized,
    /// Chat request failed, timed out, or returned a non-success status
    TransportFailure,
    /// Reply header is not valid base64
    MalformedEncoding,
    /// Reply header decoded but is not the expected JSON document
    MalformedPayload,
}

impl ErrorKind {
    /// Per-message failures keep the message around for an explicit retry.
    /// Directory failures only clear up on re-initialization.
    pub fn is_retryable(self) -> bool {
        !matches!(self, Self::DirectoryUnavailable | Self::AssistantNotFound)
    }
}
