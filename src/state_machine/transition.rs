//! Pure state transition function
//!
//! Given the same state, context and event, `transition` always produces the
//! same result and performs no I/O. The runtime executes the effects.

use super::{Effect, Event, ExchangeContext, ExchangeState};
use crate::error::{ChatError, ErrorKind};
use crate::transport::OutboundPayload;
use thiserror::Error;

/// Assistant-side log entry appended when an exchange fails
pub const FAILURE_NOTICE: &str = "Failed to send message. Please try again.";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ExchangeState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ExchangeState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    #[must_use]
    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Events the current state does not accept. The runtime drops these
/// without telling the collaborator.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A message is already in flight")]
    Busy,
    #[error("Message is empty after trimming")]
    EmptyMessage,
    #[error("No failed message to retry")]
    NothingToRetry,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(
    state: &ExchangeState,
    context: &ExchangeContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Sending
        // ============================================================

        // Idle + UserSend -> Sending (any pending retry is superseded)
        (ExchangeState::Idle { .. }, Event::UserSend { text }) => begin_send(context, &text),

        // Idle + Retry -> Sending, consuming the pending text
        (ExchangeState::Idle { pending_retry: Some(text) }, Event::Retry) => {
            begin_send(context, text)
        }

        (ExchangeState::Idle { pending_retry: None }, Event::Retry) => {
            Err(TransitionError::NothingToRetry)
        }

        // At most one message in flight: later submissions are dropped
        (_, Event::UserSend { .. } | Event::Retry) => Err(TransitionError::Busy),

        // ============================================================
        // Network outcome
        // ============================================================

        // Sending + ReplyReceived (non-success status) -> Error
        (ExchangeState::Sending { text }, Event::ReplyReceived { reply })
            if !reply.is_success() =>
        {
            let error = ChatError::transport(format!(
                "Assistant service returned status {}",
                reply.status
            ));
            Ok(fail(text, &error, true))
        }

        // Sending + ReplyReceived -> AwaitingDecode
        (ExchangeState::Sending { text }, Event::ReplyReceived { reply }) => Ok(
            TransitionResult::new(ExchangeState::AwaitingDecode { text: text.clone() })
                .with_effect(Effect::typing(false))
                .with_effect(Effect::DecodeReply { reply }),
        ),

        // Sending + TransportFailed -> Error
        (ExchangeState::Sending { text }, Event::TransportFailed { error }) => {
            Ok(fail(text, &error, true))
        }

        // ============================================================
        // Decoding
        // ============================================================

        // AwaitingDecode + reply -> Idle, log and suggestions updated
        (ExchangeState::AwaitingDecode { .. }, Event::Decoded { outcome: Ok(Some(reply)) }) => {
            Ok(TransitionResult::new(ExchangeState::idle())
                .with_effect(Effect::append_assistant_reply(&reply.text))
                .with_effect(Effect::ReplaceSuggestions {
                    suggestions: reply.suggestions,
                }))
        }

        // AwaitingDecode + no reply header -> Idle, nothing else changes
        (ExchangeState::AwaitingDecode { .. }, Event::Decoded { outcome: Ok(None) }) => {
            Ok(TransitionResult::new(ExchangeState::idle()))
        }

        // AwaitingDecode + codec failure -> Error (typing is already off)
        (ExchangeState::AwaitingDecode { text }, Event::Decoded { outcome: Err(error) }) => {
            Ok(fail(text, &error, false))
        }

        // Error + Settled -> Idle, text kept for retry
        (ExchangeState::Error { text, .. }, Event::Settled) => Ok(TransitionResult::new(
            ExchangeState::idle_with_retry(text.clone()),
        )),

        // ============================================================
        // Assistant resolution
        // ============================================================

        // Greeting: does not change the exchange state
        (state, Event::AssistantResolved) => match &context.assistant {
            Some(assistant) => {
                let mut result = TransitionResult::new(state.clone()).with_effect(
                    Effect::AnnounceAssistant {
                        name: assistant.name.clone(),
                        video_path: assistant.initial_video_path.clone(),
                    },
                );
                if !assistant.initial_prompt_text.is_empty() {
                    result = result
                        .with_effect(Effect::append_assistant_text(&assistant.initial_prompt_text));
                }
                Ok(result.with_effect(Effect::ReplaceSuggestions {
                    suggestions: assistant.initial_suggestions.clone(),
                }))
            }
            None => Err(TransitionError::InvalidTransition(
                "assistant_resolved without an assistant".to_string(),
            )),
        },

        // ============================================================
        // Invalid transitions
        // ============================================================
        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "{} cannot handle {}",
            state.name(),
            event.name()
        ))),
    }
}

/// Start an exchange for `raw`
fn begin_send(context: &ExchangeContext, raw: &str) -> Result<TransitionResult, TransitionError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(TransitionError::EmptyMessage);
    }

    let started = [Effect::typing(true), Effect::append_user(text)];

    let Some(assistant) = &context.assistant else {
        // Sending is entered and abandoned at once; the text stays pending
        return Ok(TransitionResult::new(ExchangeState::idle_with_retry(text))
            .with_effects(started)
            .with_effect(Effect::typing(false))
            .with_effect(Effect::notify_failure(
                ErrorKind::NotInitialized,
                "Assistant has not been resolved yet",
            )));
    };

    let payload = OutboundPayload::new(&context.session, &assistant.assistant_id, text);

    Ok(TransitionResult::new(ExchangeState::Sending {
        text: text.to_string(),
    })
    .with_effects(started)
    .with_effect(Effect::PostMessage { payload }))
}

/// Failure path shared by transport and codec errors
fn fail(text: &str, error: &ChatError, typing_on: bool) -> TransitionResult {
    let mut result = TransitionResult::new(ExchangeState::Error {
        kind: error.kind,
        text: text.to_string(),
    });
    if typing_on {
        result = result.with_effect(Effect::typing(false));
    }
    result
        .with_effect(Effect::append_assistant_text(FAILURE_NOTICE))
        .with_effect(Effect::notify_failure(error.kind, &error.message))
        .with_effect(Effect::Settle)
}
