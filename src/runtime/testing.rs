//! Mock implementations for testing
//!
//! These mocks enable session-level testing without real I/O.

use super::{ChatEvent, ChatSession, SessionSnapshot};
use crate::codec::{encode_header_value, AssistantReply, TEXT_RESPONSE_HEADER};
use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::session::SessionId;
use crate::state_machine::ExchangeState;
use crate::transport::{
    AssistantEntry, ChatTransport, ExperienceDocument, OutboundPayload, RawReply,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};

// ============================================================================
// Fixtures
// ============================================================================

/// Experience listing one assistant per name
pub fn experience(names: &[&str]) -> ExperienceDocument {
    ExperienceDocument {
        assistants: names
            .iter()
            .map(|name| AssistantEntry {
                name: (*name).to_string(),
                assistant_id: format!("id-{name}"),
                initial_video: format!("/videos/{name}.mp4"),
                initial_prompt: format!("Hi from {name}"),
                initial_responses: vec!["Tell me more".to_string(), "Pricing".to_string()],
            })
            .collect(),
    }
}

/// Successful reply carrying `text` and `suggestions` in the header
pub fn text_reply(text: &str, suggestions: &[&str]) -> RawReply {
    let reply = AssistantReply {
        text: text.to_string(),
        suggestions: suggestions.iter().map(ToString::to_string).collect(),
    };
    RawReply::new(200)
        .with_header(TEXT_RESPONSE_HEADER, &encode_header_value(&reply))
        .with_body_len(16_384)
}

// ============================================================================
// Mock Transport
// ============================================================================

/// Mock transport that returns queued results
pub struct MockTransport {
    experiences: Mutex<VecDeque<Result<ExperienceDocument, ChatError>>>,
    replies: Mutex<VecDeque<Result<RawReply, ChatError>>>,
    /// Record of experience lookups
    pub lookups: Mutex<Vec<String>>,
    /// Record of chat posts
    pub posts: Mutex<Vec<(SessionId, OutboundPayload)>>,
    /// When set, posts wait for `release()` before answering
    gate: Option<Arc<Notify>>,
    /// When set, experience lookups never complete
    stall_lookups: bool,
    /// Notified when a post starts (for test synchronization)
    pub request_started: Arc<Notify>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            experiences: Mutex::new(VecDeque::new()),
            replies: Mutex::new(VecDeque::new()),
            lookups: Mutex::new(Vec::new()),
            posts: Mutex::new(Vec::new()),
            gate: None,
            stall_lookups: false,
            request_started: Arc::new(Notify::new()),
        }
    }

    /// Posts block until `release()` is called once per post
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Notify::new())),
            ..Self::new()
        }
    }

    /// Experience lookups hang forever
    pub fn stalled_directory() -> Self {
        Self {
            stall_lookups: true,
            ..Self::new()
        }
    }

    pub fn queue_experience(&self, result: Result<ExperienceDocument, ChatError>) {
        self.experiences.lock().unwrap().push_back(result);
    }

    pub fn queue_reply(&self, result: Result<RawReply, ChatError>) {
        self.replies.lock().unwrap().push_back(result);
    }

    /// Let one gated post proceed
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn recorded_lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }

    pub fn recorded_posts(&self) -> Vec<(SessionId, OutboundPayload)> {
        self.posts.lock().unwrap().clone()
    }

    pub fn recorded_messages(&self) -> Vec<String> {
        self.recorded_posts()
            .into_iter()
            .map(|(_, payload)| payload.message)
            .collect()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn fetch_experience(&self, experience_id: &str) -> Result<ExperienceDocument, ChatError> {
        self.lookups.lock().unwrap().push(experience_id.to_string());
        if self.stall_lookups {
            std::future::pending::<()>().await;
        }
        self.experiences
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ChatError::transport("No mock experience queued")))
    }

    async fn post_message(
        &self,
        session_id: &SessionId,
        payload: &OutboundPayload,
    ) -> Result<RawReply, ChatError> {
        self.posts
            .lock()
            .unwrap()
            .push((session_id.clone(), payload.clone()));
        self.request_started.notify_one();

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ChatError::transport("No mock reply queued")))
    }
}

// ============================================================================
// Test Session
// ============================================================================

/// Session wired to a mock transport, with an event subscription
pub struct TestSession {
    pub session: ChatSession,
    pub transport: Arc<MockTransport>,
    pub events: broadcast::Receiver<ChatEvent>,
}

impl TestSession {
    pub fn new(transport: MockTransport) -> Self {
        Self::with_config(transport, test_config())
    }

    pub fn with_config(transport: MockTransport, config: ChatConfig) -> Self {
        let transport = Arc::new(transport);
        let session = ChatSession::spawn_with_transport(&config, transport.clone());
        let events = session.subscribe();
        Self {
            session,
            transport,
            events,
        }
    }

    /// Session whose assistant has already been resolved
    pub async fn initialized(transport: MockTransport) -> Self {
        transport.queue_experience(Ok(experience(&["nfp"])));
        let mut test = Self::new(transport);
        test.session.initialize().await.unwrap();
        test.wait_for(|e| matches!(e, ChatEvent::SuggestionsReplaced { .. }))
            .await
            .expect("greeting");
        test
    }

    /// Collect events until one matches; `None` on timeout
    pub async fn wait_for(
        &mut self,
        predicate: impl Fn(&ChatEvent) -> bool,
    ) -> Option<Vec<ChatEvent>> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        let mut seen = Vec::new();
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            match tokio::time::timeout(remaining, self.events.recv()).await {
                Ok(Ok(event)) => {
                    let done = predicate(&event);
                    seen.push(event);
                    if done {
                        return Some(seen);
                    }
                }
                Ok(Err(broadcast::error::RecvError::Lagged(_))) => {}
                Ok(Err(broadcast::error::RecvError::Closed)) | Err(_) => return None,
            }
        }
    }

    /// Wait until the session settles in Idle
    pub async fn wait_for_idle(&mut self) -> Vec<ChatEvent> {
        self.wait_for(|e| {
            matches!(
                e,
                ChatEvent::StateChanged {
                    state: ExchangeState::Idle { .. }
                }
            )
        })
        .await
        .expect("session did not return to idle")
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot().await.unwrap()
    }
}

pub fn test_config() -> ChatConfig {
    ChatConfig::new("exp-1", "nfp").with_base_url("https://chat.test")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::Segment;
    use crate::error::ErrorKind;
    use crate::message::{MessageContent, MessageOrigin};
    use crate::state_machine::FAILURE_NOTICE;

    fn failure_notices(snapshot: &SessionSnapshot) -> usize {
        snapshot
            .log
            .iter()
            .filter(|entry| entry.content == MessageContent::plain(FAILURE_NOTICE))
            .count()
    }

    #[tokio::test]
    async fn test_mock_transport() {
        let mock = MockTransport::new();
        mock.queue_reply(Ok(RawReply::new(200)));

        let session_id = SessionId::create();
        let payload = OutboundPayload {
            experience_id: "e".to_string(),
            experience_name: "n".to_string(),
            message: "m".to_string(),
            assistant: "a".to_string(),
        };

        assert!(mock.post_message(&session_id, &payload).await.is_ok());
        // Second call should fail (no more replies)
        assert!(mock.post_message(&session_id, &payload).await.is_err());
        assert_eq!(mock.recorded_messages(), vec!["m", "m"]);
    }

    #[tokio::test]
    async fn test_initialize_greets() {
        let transport = MockTransport::new();
        transport.queue_experience(Ok(experience(&["nfp"])));
        let mut test = TestSession::new(transport);

        test.session.initialize().await.unwrap();
        let events = test
            .wait_for(|e| matches!(e, ChatEvent::SuggestionsReplaced { .. }))
            .await
            .unwrap();

        assert!(events.contains(&ChatEvent::AssistantReady {
            name: "nfp".to_string(),
            video_url: "https://chat.test/videos/nfp.mp4".to_string(),
        }));

        let snapshot = test.snapshot().await;
        assert_eq!(snapshot.log.len(), 1);
        assert_eq!(snapshot.log[0].origin, MessageOrigin::Assistant);
        assert_eq!(snapshot.log[0].content, MessageContent::plain("Hi from nfp"));
        assert_eq!(snapshot.suggestions, vec!["Tell me more", "Pricing"]);
        assert_eq!(snapshot.assistant.unwrap().assistant_id, "id-nfp");
    }

    #[tokio::test]
    async fn test_initialize_twice_single_lookup() {
        let mut test = TestSession::initialized(MockTransport::new()).await;

        test.session.initialize().await.unwrap();
        let snapshot = test.snapshot().await;

        assert_eq!(test.transport.recorded_lookups().len(), 1);
        // No second greeting
        assert_eq!(snapshot.log.len(), 1);
        assert!(test.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_directory_failure_then_reinitialize() {
        let transport = MockTransport::new();
        transport.queue_experience(Err(ChatError::transport("connection refused")));
        transport.queue_experience(Ok(experience(&["nfp"])));
        let mut test = TestSession::new(transport);

        test.session.initialize().await.unwrap();
        let events = test
            .wait_for(|e| matches!(e, ChatEvent::ExchangeFailed { .. }))
            .await
            .unwrap();
        assert!(matches!(
            events.last(),
            Some(ChatEvent::ExchangeFailed {
                kind: ErrorKind::DirectoryUnavailable,
                retry_available: false,
                ..
            })
        ));
        assert!(test.snapshot().await.assistant.is_none());

        test.session.initialize().await.unwrap();
        test.wait_for(|e| matches!(e, ChatEvent::AssistantReady { .. }))
            .await
            .unwrap();
        assert_eq!(test.transport.recorded_lookups().len(), 2);
    }

    #[tokio::test]
    async fn test_assistant_not_found() {
        let transport = MockTransport::new();
        transport.queue_experience(Ok(experience(&["someone-else"])));
        let mut test = TestSession::new(transport);

        test.session.initialize().await.unwrap();
        let events = test
            .wait_for(|e| matches!(e, ChatEvent::ExchangeFailed { .. }))
            .await
            .unwrap();

        assert!(matches!(
            events.last(),
            Some(ChatEvent::ExchangeFailed {
                kind: ErrorKind::AssistantNotFound,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_send_and_receive_reply() {
        let mut test = TestSession::initialized(MockTransport::new()).await;
        test.transport
            .queue_reply(Ok(text_reply("see https://x.test/y now", &["a", "b"])));

        test.session.send("  Hello  ").await.unwrap();
        let events = test.wait_for_idle().await;

        let posts = test.transport.recorded_posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(&posts[0].0, &test.session.session().session_id);
        assert_eq!(
            posts[0].1,
            OutboundPayload {
                experience_id: "exp-1".to_string(),
                experience_name: "nfp".to_string(),
                message: "Hello".to_string(),
                assistant: "id-nfp".to_string(),
            }
        );

        assert!(events.contains(&ChatEvent::TypingIndicator {
            on: true,
            label: "nfp is typing...".to_string(),
        }));
        assert!(events.contains(&ChatEvent::SuggestionsReplaced {
            suggestions: vec!["a".to_string(), "b".to_string()],
        }));

        let snapshot = test.snapshot().await;
        assert_eq!(snapshot.log.len(), 3);
        assert_eq!(snapshot.log[1].origin, MessageOrigin::User);
        assert_eq!(snapshot.log[1].content, MessageContent::plain("Hello"));
        assert_eq!(
            snapshot.log[2].content,
            MessageContent::Segments(vec![
                Segment::PlainText("see ".to_string()),
                Segment::Link("https://x.test/y".to_string()),
                Segment::PlainText(" now".to_string()),
            ])
        );
        assert_eq!(snapshot.suggestions, vec!["a", "b"]);
        assert_eq!(snapshot.state, ExchangeState::idle());
    }

    #[tokio::test]
    async fn test_sending_before_request_observed() {
        let mut test = TestSession::initialized(MockTransport::gated()).await;
        test.transport.queue_reply(Ok(text_reply("ok", &[])));

        test.session.send("Hello").await.unwrap();
        let events = test
            .wait_for(|e| matches!(e, ChatEvent::StateChanged { .. }))
            .await
            .unwrap();
        assert_eq!(
            events.last(),
            Some(&ChatEvent::StateChanged {
                state: ExchangeState::Sending {
                    text: "Hello".to_string()
                }
            })
        );

        test.transport.request_started.notified().await;
        assert!(test.snapshot().await.state.is_in_flight());

        test.transport.release();
        test.wait_for_idle().await;
        assert_eq!(test.transport.recorded_posts().len(), 1);
    }

    #[tokio::test]
    async fn test_rapid_double_send_single_request() {
        let mut test = TestSession::initialized(MockTransport::gated()).await;
        test.transport.queue_reply(Ok(text_reply("ok", &[])));

        test.session.send("first").await.unwrap();
        test.session.send("second").await.unwrap();
        test.session.select_suggestion("Pricing").await.unwrap();

        test.transport.request_started.notified().await;
        test.transport.release();
        test.wait_for_idle().await;

        assert_eq!(test.transport.recorded_messages(), vec!["first"]);
        let snapshot = test.snapshot().await;
        let user_entries = snapshot
            .log
            .iter()
            .filter(|e| e.origin == MessageOrigin::User)
            .count();
        assert_eq!(user_entries, 1);
    }

    #[tokio::test]
    async fn test_transport_failure_then_retry() {
        let mut test = TestSession::initialized(MockTransport::new()).await;
        test.transport
            .queue_reply(Err(ChatError::transport("Connection failed")));
        test.transport.queue_reply(Ok(text_reply("Back online", &[])));

        test.session.send("Hello").await.unwrap();
        let events = test.wait_for_idle().await;
        assert!(events.contains(&ChatEvent::ExchangeFailed {
            kind: ErrorKind::TransportFailure,
            message: "Connection failed".to_string(),
            retry_available: true,
        }));
        assert!(events.contains(&ChatEvent::TypingIndicator {
            on: false,
            label: "nfp is typing...".to_string(),
        }));

        let snapshot = test.snapshot().await;
        assert_eq!(snapshot.pending_retry(), Some("Hello"));
        assert_eq!(failure_notices(&snapshot), 1);

        test.session.retry().await.unwrap();
        test.wait_for_idle().await;

        assert_eq!(test.transport.recorded_messages(), vec!["Hello", "Hello"]);
        let snapshot = test.snapshot().await;
        assert_eq!(snapshot.pending_retry(), None);
        // greeting, user, notice, user (retry), reply
        assert_eq!(snapshot.log.len(), 5);
        assert_eq!(snapshot.log[3].content, MessageContent::plain("Hello"));

        // Retry affordance is consumed
        test.session.retry().await.unwrap();
        test.snapshot().await;
        assert_eq!(test.transport.recorded_posts().len(), 2);
    }

    #[tokio::test]
    async fn test_second_failure_new_retry() {
        let mut test = TestSession::initialized(MockTransport::new()).await;
        test.transport.queue_reply(Err(ChatError::transport("down")));
        test.transport.queue_reply(Err(ChatError::transport("still down")));

        test.session.send("Hello").await.unwrap();
        test.wait_for_idle().await;
        test.session.retry().await.unwrap();
        test.wait_for(|e| {
            matches!(
                e,
                ChatEvent::StateChanged {
                    state: ExchangeState::Idle {
                        pending_retry: Some(_)
                    }
                }
            )
        })
        .await
        .unwrap();

        let snapshot = test.snapshot().await;
        assert_eq!(snapshot.pending_retry(), Some("Hello"));
        assert_eq!(failure_notices(&snapshot), 2);
    }

    #[tokio::test]
    async fn test_malformed_header_reaches_error() {
        let mut test = TestSession::initialized(MockTransport::new()).await;
        test.transport.queue_reply(Ok(
            RawReply::new(200).with_header(TEXT_RESPONSE_HEADER, "%%not-base64%%")
        ));
        let before = test.snapshot().await.log.len();

        test.session.send("Hello").await.unwrap();
        let events = test.wait_for_idle().await;

        assert!(events.contains(&ChatEvent::StateChanged {
            state: ExchangeState::Error {
                kind: ErrorKind::MalformedEncoding,
                text: "Hello".to_string(),
            }
        }));

        let snapshot = test.snapshot().await;
        let new_assistant_entries = snapshot.log[before..]
            .iter()
            .filter(|e| e.origin == MessageOrigin::Assistant)
            .count();
        assert_eq!(new_assistant_entries, 1);
        assert_eq!(snapshot.pending_retry(), Some("Hello"));
        // Suggestions from the greeting are untouched
        assert_eq!(snapshot.suggestions, vec!["Tell me more", "Pricing"]);
    }

    #[tokio::test]
    async fn test_absent_header_is_silent() {
        let mut test = TestSession::initialized(MockTransport::new()).await;
        test.transport.queue_reply(Ok(RawReply::new(200).with_body_len(512)));
        let before = test.snapshot().await;

        test.session.send("Hello").await.unwrap();
        let events = test.wait_for_idle().await;

        assert!(!events
            .iter()
            .any(|e| matches!(e, ChatEvent::ExchangeFailed { .. })));

        let after = test.snapshot().await;
        // Only the user's own entry was added
        assert_eq!(after.log.len(), before.log.len() + 1);
        assert_eq!(after.suggestions, before.suggestions);
        assert_eq!(after.state, ExchangeState::idle());
    }

    #[tokio::test]
    async fn test_error_status_is_transport_failure() {
        let mut test = TestSession::initialized(MockTransport::new()).await;
        test.transport.queue_reply(Ok(text_reply("ignored", &["x"])));
        test.transport.queue_reply(Ok(RawReply::new(503)));

        test.session.send("one").await.unwrap();
        test.wait_for_idle().await;
        test.session.send("two").await.unwrap();
        let events = test.wait_for_idle().await;

        assert!(events.iter().any(|e| matches!(
            e,
            ChatEvent::ExchangeFailed {
                kind: ErrorKind::TransportFailure,
                ..
            }
        )));
        assert_eq!(test.snapshot().await.suggestions, vec!["x"]);
    }

    #[tokio::test]
    async fn test_send_before_initialize() {
        let mut test = TestSession::new(MockTransport::new());

        test.session.send("Hello").await.unwrap();
        let events = test
            .wait_for(|e| matches!(e, ChatEvent::ExchangeFailed { .. }))
            .await
            .unwrap();

        assert!(matches!(
            events.last(),
            Some(ChatEvent::ExchangeFailed {
                kind: ErrorKind::NotInitialized,
                ..
            })
        ));
        assert!(test.transport.recorded_posts().is_empty());

        let snapshot = test.snapshot().await;
        assert_eq!(snapshot.pending_retry(), Some("Hello"));
        assert_eq!(snapshot.log.len(), 1);
    }

    #[tokio::test]
    async fn test_blank_send_ignored() {
        let test = TestSession::initialized(MockTransport::new()).await;
        let before = test.snapshot().await;

        test.session.send("   \n").await.unwrap();
        let after = test.snapshot().await;

        assert_eq!(after, before);
        assert!(test.transport.recorded_posts().is_empty());
    }

    #[tokio::test]
    async fn test_request_deadline() {
        // Gated transport that is never released
        let transport = MockTransport::gated();
        transport.queue_experience(Ok(experience(&["nfp"])));
        let config = test_config().with_request_timeout(Duration::from_millis(50));
        let mut test = TestSession::with_config(transport, config);
        test.session.initialize().await.unwrap();
        test.wait_for(|e| matches!(e, ChatEvent::AssistantReady { .. }))
            .await
            .unwrap();

        test.session.send("Hello").await.unwrap();
        let events = test
            .wait_for(|e| matches!(e, ChatEvent::ExchangeFailed { .. }))
            .await
            .unwrap();

        match events.last() {
            Some(ChatEvent::ExchangeFailed { kind, message, .. }) => {
                assert_eq!(*kind, ErrorKind::TransportFailure);
                assert!(message.contains("No reply within 50ms"));
            }
            other => panic!("Expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_session_responsive_during_lookup() {
        let mut test = TestSession::new(MockTransport::stalled_directory());
        test.session.initialize().await.unwrap();

        let snapshot = tokio::time::timeout(Duration::from_secs(1), test.session.snapshot())
            .await
            .expect("snapshot answered while the lookup is pending")
            .unwrap();
        assert!(snapshot.assistant.is_none());

        test.session.send("Hello").await.unwrap();
        let events = test
            .wait_for(|e| matches!(e, ChatEvent::ExchangeFailed { .. }))
            .await
            .unwrap();

        assert!(matches!(
            events.last(),
            Some(ChatEvent::ExchangeFailed {
                kind: ErrorKind::NotInitialized,
                retry_available: true,
                ..
            })
        ));
        assert!(test.transport.recorded_posts().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_deadline() {
        let config = test_config().with_request_timeout(Duration::from_millis(50));
        let mut test = TestSession::with_config(MockTransport::stalled_directory(), config);

        test.session.initialize().await.unwrap();
        // Already resolving; no second lookup
        test.session.initialize().await.unwrap();

        let events = test
            .wait_for(|e| matches!(e, ChatEvent::ExchangeFailed { .. }))
            .await
            .unwrap();

        match events.last() {
            Some(ChatEvent::ExchangeFailed {
                kind,
                message,
                retry_available,
            }) => {
                assert_eq!(*kind, ErrorKind::DirectoryUnavailable);
                assert!(message.contains("within 50ms"));
                assert!(!retry_available);
            }
            other => panic!("Expected failure, got {other:?}"),
        }
        assert_eq!(test.transport.recorded_lookups().len(), 1);
        assert!(test.snapshot().await.assistant.is_none());
    }
}
