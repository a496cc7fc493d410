//! Embed Chat - client runtime for an embeddable assistant chat
//!
//! A session resolves its assistant from the experience directory, then
//! drives a message exchange state machine against the chat service.
//! Rendering is left to the caller, which subscribes to [`ChatEvent`]s.

pub mod annotate;
pub mod codec;
pub mod config;
pub mod directory;
pub mod error;
pub mod message;
pub mod runtime;
pub mod session;
pub mod state_machine;
pub mod suggestions;
pub mod transport;

pub use annotate::{annotate, Segment};
pub use codec::{AssistantReply, TEXT_RESPONSE_HEADER};
pub use config::ChatConfig;
pub use directory::{AssistantConfig, AssistantDirectory};
pub use error::{ChatError, ErrorKind};
pub use message::{MessageContent, MessageLogEntry, MessageOrigin};
pub use runtime::{ChatEvent, ChatSession, SessionClosed, SessionSnapshot};
pub use session::{Session, SessionId};
pub use state_machine::ExchangeState;
pub use suggestions::SuggestionManager;
pub use transport::{ChatTransport, HttpTransport, LoggingTransport};
