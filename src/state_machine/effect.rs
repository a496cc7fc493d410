//! Effects produced by state transitions

use crate::error::ErrorKind;
use crate::message::{MessageContent, MessageOrigin};
use crate::transport::{OutboundPayload, RawReply};

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Show or hide the typing indicator
    SetTyping { on: bool },

    /// Append to the message log
    AppendMessage {
        origin: MessageOrigin,
        content: MessageContent,
    },

    /// Replace the suggestion set
    ReplaceSuggestions { suggestions: Vec<String> },

    /// Post the message (spawns as background task)
    PostMessage { payload: OutboundPayload },

    /// Run the codec over a received reply
    DecodeReply { reply: RawReply },

    /// Report a failure to the collaborator
    NotifyFailure {
        kind: ErrorKind,
        message: String,
        retry_available: bool,
    },

    /// Assistant is ready; greeting video is relative to the service origin
    AnnounceAssistant { name: String, video_path: String },

    /// Feed `Event::Settled` back into the state machine
    Settle,
}

impl Effect {
    pub fn typing(on: bool) -> Self {
        Effect::SetTyping { on }
    }

    pub fn append_user(text: impl Into<String>) -> Self {
        Effect::AppendMessage {
            origin: MessageOrigin::User,
            content: MessageContent::plain(text),
        }
    }

    pub fn append_assistant_text(text: impl Into<String>) -> Self {
        Effect::AppendMessage {
            origin: MessageOrigin::Assistant,
            content: MessageContent::plain(text),
        }
    }

    /// Assistant reply, with links annotated
    pub fn append_assistant_reply(text: &str) -> Self {
        Effect::AppendMessage {
            origin: MessageOrigin::Assistant,
            content: MessageContent::annotated(text),
        }
    }

    pub fn notify_failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Effect::NotifyFailure {
            kind,
            message: message.into(),
            retry_available: kind.is_retryable(),
        }
    }
}
