//! Events that drive the exchange

use crate::codec::AssistantReply;
use crate::error::ChatError;
use crate::transport::RawReply;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // Collaborator events
    UserSend {
        text: String,
    },
    Retry,
    /// Assistant config was just resolved and stored in the context
    AssistantResolved,

    // Network events
    ReplyReceived {
        reply: RawReply,
    },
    TransportFailed {
        error: ChatError,
    },

    // Internal events
    Decoded {
        outcome: Result<Option<AssistantReply>, ChatError>,
    },
    /// Failure has been reported; return to idle
    Settled,
}

impl Event {
    pub fn user_send(text: impl Into<String>) -> Self {
        Event::UserSend { text: text.into() }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::UserSend { .. } => "user_send",
            Event::Retry => "retry",
            Event::AssistantResolved => "assistant_resolved",
            Event::ReplyReceived { .. } => "reply_received",
            Event::TransportFailed { .. } => "transport_failed",
            Event::Decoded { .. } => "decoded",
            Event::Settled => "settled",
        }
    }
}
