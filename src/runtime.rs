//! Runtime for executing chat sessions
//!
//! [`ChatSession`] is the handle a UI collaborator holds: it feeds user
//! actions in and subscribes to [`ChatEvent`]s to render.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;

use crate::config::ChatConfig;
use crate::directory::AssistantConfig;
use crate::error::{ChatError, ErrorKind};
use crate::message::MessageLogEntry;
use crate::session::Session;
use crate::state_machine::{Event, ExchangeContext, ExchangeState};
use crate::transport::{ChatTransport, HttpTransport, LoggingTransport};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};

/// Events sent to the rendering collaborator
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    TypingIndicator {
        on: bool,
        /// e.g. "nfp is typing..."
        label: String,
    },
    MessageAppended {
        entry: MessageLogEntry,
    },
    SuggestionsReplaced {
        suggestions: Vec<String>,
    },
    ExchangeFailed {
        kind: ErrorKind,
        message: String,
        retry_available: bool,
    },
    StateChanged {
        state: ExchangeState,
    },
    AssistantReady {
        name: String,
        video_url: String,
    },
}

/// Point-in-time view of a session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub state: ExchangeState,
    pub log: Vec<MessageLogEntry>,
    pub suggestions: Vec<String>,
    pub assistant: Option<AssistantConfig>,
}

impl SessionSnapshot {
    pub fn pending_retry(&self) -> Option<&str> {
        self.state.pending_retry()
    }
}

/// Messages accepted by the runtime task
#[derive(Debug)]
pub enum Command {
    Initialize,
    /// Outcome of the background directory lookup
    Resolved(Result<AssistantConfig, ChatError>),
    Dispatch(Event),
    Snapshot(oneshot::Sender<SessionSnapshot>),
}

/// The session runtime has stopped
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Chat session runtime has stopped")]
pub struct SessionClosed;

/// Handle to interact with a running session
#[derive(Clone)]
pub struct ChatSession {
    session: Session,
    command_tx: mpsc::Sender<Command>,
    broadcast_tx: broadcast::Sender<ChatEvent>,
}

impl ChatSession {
    /// Start a session against the configured service.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(config: &ChatConfig) -> Result<Self, ChatError> {
        let http = HttpTransport::new(config)?;
        let transport = LoggingTransport::new(Arc::new(http));
        Ok(Self::spawn_with_transport(config, transport))
    }

    /// Start a session on a caller-supplied transport
    pub fn spawn_with_transport<T>(config: &ChatConfig, transport: T) -> Self
    where
        T: ChatTransport + 'static,
    {
        let session = Session::new(&config.experience_id, &config.assistant_name);
        let (command_tx, command_rx) = mpsc::channel(32);
        let (broadcast_tx, _) = broadcast::channel(128);

        let runtime = SessionRuntime::new(
            ExchangeContext::new(session.clone()),
            Arc::new(transport),
            config.base_url.clone(),
            config.request_timeout,
            command_rx,
            command_tx.downgrade(),
            broadcast_tx.clone(),
        );

        let session_id = session.session_id.clone();
        tokio::spawn(async move {
            runtime.run().await;
            tracing::info!(session_id = %session_id, "Chat session finished");
        });

        Self {
            session,
            command_tx,
            broadcast_tx,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Subscribe to render events
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Resolve the assistant in the background. The greeting or the
    /// directory failure arrives as events. Call again after a failure to
    /// retry the lookup.
    pub async fn initialize(&self) -> Result<(), SessionClosed> {
        self.command(Command::Initialize).await
    }

    /// Send a user message; blank text and sends while busy are ignored
    pub async fn send(&self, text: impl Into<String>) -> Result<(), SessionClosed> {
        self.command(Command::Dispatch(Event::user_send(text))).await
    }

    /// Re-send the last failed message, if any
    pub async fn retry(&self) -> Result<(), SessionClosed> {
        self.command(Command::Dispatch(Event::Retry)).await
    }

    /// Same as sending the suggestion's text
    pub async fn select_suggestion(
        &self,
        suggestion: impl Into<String>,
    ) -> Result<(), SessionClosed> {
        self.send(suggestion).await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionClosed> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command(Command::Snapshot(reply_tx)).await?;
        reply_rx.await.map_err(|_| SessionClosed)
    }

    async fn command(&self, command: Command) -> Result<(), SessionClosed> {
        self.command_tx.send(command).await.map_err(|_| SessionClosed)
    }
}
