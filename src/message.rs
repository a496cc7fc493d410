//! Conversation log

use crate::annotate::{annotate, Segment};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageOrigin {
    User,
    Assistant,
}

/// Body of a log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MessageContent {
    Plain(String),
    /// Assistant reply split into text and links
    Segments(Vec<Segment>),
}

impl MessageContent {
    pub fn plain(text: impl Into<String>) -> Self {
        MessageContent::Plain(text.into())
    }

    pub fn annotated(text: &str) -> Self {
        MessageContent::Segments(annotate(text))
    }

    /// Text as displayed, with links shown by their label
    pub fn display_text(&self) -> String {
        match self {
            MessageContent::Plain(text) => text.clone(),
            MessageContent::Segments(segments) => segments.iter().map(Segment::label).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageLogEntry {
    pub origin: MessageOrigin,
    pub content: MessageContent,
    pub created_at: DateTime<Utc>,
}

impl MessageLogEntry {
    pub fn new(origin: MessageOrigin, content: MessageContent) -> Self {
        Self {
            origin,
            content,
            created_at: Utc::now(),
        }
    }
}

/// Append-only log; entries are never changed or removed
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    entries: Vec<MessageLogEntry>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: MessageLogEntry) -> &MessageLogEntry {
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[MessageLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
