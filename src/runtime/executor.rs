//! Session runtime executor

use super::{ChatEvent, Command, SessionSnapshot};
use crate::codec;
use crate::directory::{AssistantConfig, AssistantDirectory};
use crate::error::ChatError;
use crate::message::{MessageLog, MessageLogEntry};
use crate::state_machine::{transition, Effect, Event, ExchangeContext, ExchangeState};
use crate::suggestions::SuggestionManager;
use crate::transport::{ChatTransport, OutboundPayload};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

/// Runtime owning one session's state, log and suggestions.
///
/// Commands are processed one at a time; network requests run as separate
/// tasks that report back through the command channel.
pub struct SessionRuntime<T>
where
    T: ChatTransport + 'static,
{
    context: ExchangeContext,
    state: ExchangeState,
    transport: Arc<T>,
    /// Shared with the lookup task
    directory: Arc<AssistantDirectory<T>>,
    /// A directory lookup task is outstanding
    resolving: bool,
    base_url: String,
    request_timeout: Duration,
    log: MessageLog,
    suggestions: SuggestionManager,
    command_rx: mpsc::Receiver<Command>,
    /// Weak so the runtime stops once every handle is dropped
    command_tx: mpsc::WeakSender<Command>,
    broadcast_tx: broadcast::Sender<ChatEvent>,
}

impl<T> SessionRuntime<T>
where
    T: ChatTransport + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        context: ExchangeContext,
        transport: Arc<T>,
        base_url: String,
        request_timeout: Duration,
        command_rx: mpsc::Receiver<Command>,
        command_tx: mpsc::WeakSender<Command>,
        broadcast_tx: broadcast::Sender<ChatEvent>,
    ) -> Self {
        Self {
            context,
            state: ExchangeState::idle(),
            directory: Arc::new(AssistantDirectory::new(transport.clone())),
            resolving: false,
            transport,
            base_url,
            request_timeout,
            log: MessageLog::new(),
            suggestions: SuggestionManager::new(),
            command_rx,
            command_tx,
            broadcast_tx,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(
            session_id = %self.context.session.session_id,
            "Starting chat session runtime"
        );

        while let Some(command) = self.command_rx.recv().await {
            match command {
                Command::Initialize => self.initialize(),
                Command::Resolved(outcome) => self.handle_resolved(outcome),
                Command::Dispatch(event) => self.process_event(event),
                Command::Snapshot(reply) => {
                    let _ = reply.send(self.snapshot());
                }
            }
        }

        tracing::info!(
            session_id = %self.context.session.session_id,
            "Chat session runtime stopped"
        );
    }

    /// Start resolving the assistant. No-op once resolved or while a lookup
    /// is outstanding.
    fn initialize(&mut self) {
        if self.context.assistant.is_some() {
            tracing::debug!(
                session_id = %self.context.session.session_id,
                "Assistant already resolved"
            );
            return;
        }
        if self.resolving {
            tracing::debug!(
                session_id = %self.context.session.session_id,
                "Assistant lookup in progress"
            );
            return;
        }
        let Some(command_tx) = self.command_tx.upgrade() else {
            tracing::debug!("No session handles left, lookup not issued");
            return;
        };

        self.resolving = true;
        let directory = self.directory.clone();
        let session_id = self.context.session.session_id.clone();
        let experience_id = self.context.session.experience_id.clone();
        let assistant_name = self.context.session.assistant_name.clone();
        let timeout = self.request_timeout;

        tokio::spawn(async move {
            tracing::info!(
                session_id = %session_id,
                experience_id = %experience_id,
                "Resolving assistant (background)"
            );

            let lookup = directory.resolve(&experience_id, &assistant_name);
            let outcome = match tokio::time::timeout(timeout, lookup).await {
                Ok(result) => result.cloned(),
                Err(_) => Err(ChatError::directory_unavailable(format!(
                    "No experience document within {}ms",
                    timeout.as_millis()
                ))),
            };

            if command_tx.send(Command::Resolved(outcome)).await.is_err() {
                tracing::debug!(session_id = %session_id, "Runtime gone before lookup finished");
            }
        });
    }

    fn handle_resolved(&mut self, outcome: Result<AssistantConfig, ChatError>) {
        self.resolving = false;

        match outcome {
            Ok(assistant) => {
                if self.context.assistant.is_some() {
                    return;
                }
                tracing::info!(
                    session_id = %self.context.session.session_id,
                    assistant_id = %assistant.assistant_id,
                    "Assistant resolved"
                );
                self.context.assistant = Some(assistant);
                self.process_event(Event::AssistantResolved);
            }
            Err(error) => {
                tracing::warn!(
                    session_id = %self.context.session.session_id,
                    kind = ?error.kind,
                    error = %error.message,
                    "Assistant resolution failed"
                );
                self.broadcast(ChatEvent::ExchangeFailed {
                    kind: error.kind,
                    message: error.message,
                    retry_available: false,
                });
            }
        }
    }

    fn process_event(&mut self, event: Event) {
        // Effects may generate follow-up events; process them in order
        let mut events_to_process = vec![event];

        while let Some(current_event) = events_to_process.pop() {
            let event_name = current_event.name();

            // Pure state transition
            let result = match transition(&self.state, &self.context, current_event) {
                Ok(r) => r,
                Err(e) => {
                    // Rejected events (busy, blank text) are dropped silently
                    tracing::debug!(
                        session_id = %self.context.session.session_id,
                        state = self.state.name(),
                        event = event_name,
                        reason = %e,
                        "Event dropped"
                    );
                    continue;
                }
            };

            if result.new_state != self.state {
                tracing::debug!(
                    session_id = %self.context.session.session_id,
                    from = self.state.name(),
                    to = result.new_state.name(),
                    "State change"
                );
                self.state = result.new_state;
                self.broadcast(ChatEvent::StateChanged {
                    state: self.state.clone(),
                });
            }

            for effect in result.effects {
                if let Some(generated_event) = self.execute_effect(effect) {
                    events_to_process.push(generated_event);
                }
            }
        }
    }

    fn execute_effect(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::SetTyping { on } => {
                self.broadcast(ChatEvent::TypingIndicator {
                    on,
                    label: self.context.typing_label(),
                });
                None
            }

            Effect::AppendMessage { origin, content } => {
                tracing::debug!(
                    session_id = %self.context.session.session_id,
                    origin = ?origin,
                    text = %content.display_text(),
                    "Message appended"
                );
                let entry = self
                    .log
                    .append(MessageLogEntry::new(origin, content))
                    .clone();
                self.broadcast(ChatEvent::MessageAppended { entry });
                None
            }

            Effect::ReplaceSuggestions { suggestions } => {
                let suggestions = self.suggestions.replace(suggestions).to_vec();
                self.broadcast(ChatEvent::SuggestionsReplaced { suggestions });
                None
            }

            Effect::PostMessage { payload } => {
                self.spawn_request(payload);
                None
            }

            Effect::DecodeReply { reply } => {
                let outcome = codec::decode(&reply);
                match &outcome {
                    Ok(Some(_)) => {}
                    Ok(None) => tracing::info!(
                        session_id = %self.context.session.session_id,
                        "Reply carried no text response"
                    ),
                    Err(e) => tracing::warn!(
                        session_id = %self.context.session.session_id,
                        kind = ?e.kind,
                        error = %e.message,
                        "Failed to decode reply"
                    ),
                }
                Some(Event::Decoded { outcome })
            }

            Effect::NotifyFailure {
                kind,
                message,
                retry_available,
            } => {
                tracing::warn!(
                    session_id = %self.context.session.session_id,
                    kind = ?kind,
                    error = %message,
                    retry_available,
                    "Exchange failed"
                );
                self.broadcast(ChatEvent::ExchangeFailed {
                    kind,
                    message,
                    retry_available,
                });
                None
            }

            Effect::AnnounceAssistant { name, video_path } => {
                self.broadcast(ChatEvent::AssistantReady {
                    name,
                    video_url: format!("{}{video_path}", self.base_url),
                });
                None
            }

            Effect::Settle => Some(Event::Settled),
        }
    }

    /// Issue the chat request as a background task
    fn spawn_request(&self, payload: OutboundPayload) {
        let Some(command_tx) = self.command_tx.upgrade() else {
            tracing::debug!("No session handles left, request not issued");
            return;
        };
        let transport = self.transport.clone();
        let session_id = self.context.session.session_id.clone();
        let timeout = self.request_timeout;

        tokio::spawn(async move {
            tracing::info!(session_id = %session_id, "Sending chat message (background)");

            let outcome =
                tokio::time::timeout(timeout, transport.post_message(&session_id, &payload)).await;

            let event = match outcome {
                Ok(Ok(reply)) => Event::ReplyReceived { reply },
                Ok(Err(error)) => Event::TransportFailed { error },
                Err(_) => Event::TransportFailed {
                    error: ChatError::transport(format!(
                        "No reply within {}ms",
                        timeout.as_millis()
                    )),
                },
            };

            if command_tx.send(Command::Dispatch(event)).await.is_err() {
                tracing::debug!(session_id = %session_id, "Runtime gone before reply arrived");
            }
        });
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state.clone(),
            log: self.log.entries().to_vec(),
            suggestions: self.suggestions.current().to_vec(),
            assistant: self.context.assistant.clone(),
        }
    }

    fn broadcast(&self, event: ChatEvent) {
        // No subscribers is fine
        let _ = self.broadcast_tx.send(event);
    }
}
