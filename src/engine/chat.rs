// Gyan Engine — Chat Submission Boundary
//
// submit(text):
//   blank?            → Rejected(Empty)
//   busy?             → Rejected(Busy)
//   set busy, append user turn, build payload from the full history
//   dispatch          → reply turn | degraded fallback turn | failure fallback turn
//   clear busy (BusyGuard drop: every exit path, unwinding included)
//
// No dispatch error leaves this module: technical detail is logged and the
// user only ever sees a fixed model turn.

use crate::atoms::constants::{DEGRADED_REPLY_TEXT, FAILED_REPLY_TEXT};
use crate::atoms::error::DispatchError;
use crate::atoms::traits::{Sleeper, TokioSleeper, Transport};
use crate::atoms::types::ReplyKind;
use crate::engine::history::normalize_input;
use crate::engine::providers::{GeminiClient, Generation};
use crate::engine::state::ChatState;
use log::{error, info, warn};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Empty,
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing was appended or sent.
    Rejected(RejectReason),
    /// A user turn and a model turn were appended.
    Replied { kind: ReplyKind, text: String },
}

impl SubmitOutcome {
    pub fn reply_kind(&self) -> Option<ReplyKind> {
        match self {
            SubmitOutcome::Replied { kind, .. } => Some(*kind),
            SubmitOutcome::Rejected(_) => None,
        }
    }
}

/// Clears the busy flag when dropped.
struct BusyGuard<'a>(&'a ChatState);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.end_dispatch();
    }
}

pub struct ChatSession<T: Transport, S: Sleeper = TokioSleeper> {
    id: String,
    state: Arc<ChatState>,
    client: GeminiClient<T, S>,
}

impl<T: Transport, S: Sleeper> ChatSession<T, S> {
    pub fn new(state: Arc<ChatState>, client: GeminiClient<T, S>) -> Self {
        ChatSession {
            id: uuid::Uuid::new_v4().to_string(),
            state,
            client,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> &Arc<ChatState> {
        &self.state
    }

    pub async fn submit(&self, input: &str) -> SubmitOutcome {
        let Some(text) = normalize_input(input) else {
            return SubmitOutcome::Rejected(RejectReason::Empty);
        };
        if !self.state.try_begin_dispatch() {
            warn!("[chat] session={} submission ignored: a reply is still pending", self.id);
            return SubmitOutcome::Rejected(RejectReason::Busy);
        }
        let _busy = BusyGuard(&self.state);

        if self.state.append_user_turn(text).is_none() {
            return SubmitOutcome::Rejected(RejectReason::Empty);
        }
        let payload = self.state.request_payload();

        let (kind, reply) = match self.client.generate(&payload).await {
            Ok(Generation::Text(reply)) => (ReplyKind::Answered, reply),
            Ok(Generation::Unrecognized(body)) => {
                error!("[chat] session={} unexpected API response structure: {}", self.id, body);
                (ReplyKind::Degraded, DEGRADED_REPLY_TEXT.to_string())
            }
            Err(DispatchError::MalformedResponse(detail)) => {
                error!("[chat] session={} malformed API response: {}", self.id, detail);
                (ReplyKind::Degraded, DEGRADED_REPLY_TEXT.to_string())
            }
            Err(e) => {
                error!("[chat] session={} error sending message to {}: {}", self.id, self.client.model(), e);
                (ReplyKind::Failed, FAILED_REPLY_TEXT.to_string())
            }
        };

        self.state.append_model_turn(&reply);
        info!(
            "[chat] session={} reply={:?} turns={}",
            self.id,
            kind,
            self.state.turns().len()
        );
        SubmitOutcome::Replied { kind, text: reply }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::traits::TransportError;
    use crate::atoms::types::{ChatSnapshot, HttpResponse, Role};
    use crate::engine::dispatcher::{ResilientDispatcher, RetryPolicy};
    use crate::engine::testing::{RecordingSleeper, ScriptedTransport};
    use parking_lot::Mutex;
    use serde_json::Value;
    use std::time::Duration;

    fn session(transport: ScriptedTransport) -> ChatSession<ScriptedTransport, RecordingSleeper> {
        let dispatcher = ResilientDispatcher::with_sleeper(
            transport,
            RecordingSleeper::default(),
            RetryPolicy::new(3, Duration::from_millis(1000)),
        );
        let client = GeminiClient::new(dispatcher, "https://gl.example/v1beta", "gemini-test", "key");
        ChatSession::new(Arc::new(ChatState::new()), client)
    }

    fn reply(text: &str) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse::new(
            200,
            serde_json::json!({"candidates":[{"content":{"parts":[{"text": text}]}}]}).to_string(),
        ))
    }

    #[tokio::test]
    async fn successful_exchange_appends_both_turns() {
        let s = session(ScriptedTransport::new(vec![reply("Hello!")]));
        let out = s.submit("  Hi Gyan  ").await;
        assert_eq!(out, SubmitOutcome::Replied { kind: ReplyKind::Answered, text: "Hello!".into() });

        let turns = s.state().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!((turns[0].role(), turns[0].text()), (Role::User, "Hi Gyan"));
        assert_eq!((turns[1].role(), turns[1].text()), (Role::Model, "Hello!"));
        assert!(!s.state().is_busy());
    }

    #[tokio::test]
    async fn history_is_resent_in_full() {
        let transport = ScriptedTransport::new(vec![reply("one"), reply("two")]);
        let s = session(transport.clone());
        s.submit("first").await;
        s.submit("second").await;

        let sent = transport.requests();
        let body: Value = serde_json::from_slice(&sent[1].body).unwrap();
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["parts"][0]["text"], "first");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "second");
    }

    #[tokio::test]
    async fn blank_input_is_rejected_without_side_effects() {
        let transport = ScriptedTransport::default();
        let s = session(transport.clone());
        assert_eq!(s.submit(" \t ").await, SubmitOutcome::Rejected(RejectReason::Empty));
        assert!(s.state().turns().is_empty());
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn busy_session_rejects_submission() {
        let transport = ScriptedTransport::default();
        let s = session(transport.clone());
        assert!(s.state().try_begin_dispatch());
        assert_eq!(s.submit("hello").await, SubmitOutcome::Rejected(RejectReason::Busy));
        assert!(s.state().turns().is_empty());
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn missing_candidates_appends_degraded_fallback() {
        let s = session(ScriptedTransport::new(vec![Ok(HttpResponse::new(200, "{}"))]));
        let out = s.submit("hello").await;
        assert_eq!(out.reply_kind(), Some(ReplyKind::Degraded));
        let turns = s.state().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].text(), DEGRADED_REPLY_TEXT);
        assert!(!s.state().is_busy());
    }

    #[tokio::test]
    async fn non_json_body_appends_degraded_fallback() {
        let s = session(ScriptedTransport::new(vec![Ok(HttpResponse::new(200, "not json"))]));
        assert_eq!(s.submit("hello").await.reply_kind(), Some(ReplyKind::Degraded));
    }

    #[tokio::test]
    async fn exhausted_retries_append_failure_fallback() {
        let transport = ScriptedTransport::repeating(Ok(HttpResponse::new(500, "")));
        let s = session(transport.clone());
        let out = s.submit("hello").await;
        assert_eq!(
            out,
            SubmitOutcome::Replied { kind: ReplyKind::Failed, text: FAILED_REPLY_TEXT.into() }
        );
        assert_eq!(transport.calls(), 3);
        assert!(!s.state().is_busy());
    }

    #[tokio::test]
    async fn client_error_detail_stays_out_of_conversation() {
        let s = session(ScriptedTransport::new(vec![Ok(HttpResponse::new(
            400,
            r#"{"error":{"message":"API key not valid. Please pass a valid API key."}}"#,
        ))]));
        s.submit("hello").await;
        let turns = s.state().turns();
        assert_eq!(turns[1].text(), FAILED_REPLY_TEXT);
        assert!(!turns.iter().any(|t| t.text().contains("API key")));
    }

    #[tokio::test]
    async fn busy_flag_is_observed_around_dispatch() {
        let s = session(ScriptedTransport::new(vec![reply("ok")]));
        let busy_trace: Arc<Mutex<Vec<(bool, usize)>>> = Arc::default();
        let sink = busy_trace.clone();
        s.state()
            .subscribe(Arc::new(move |snap: &ChatSnapshot| sink.lock().push((snap.busy, snap.turns.len()))));
        s.submit("hi").await;
        assert_eq!(*busy_trace.lock(), vec![(true, 0), (true, 1), (true, 2), (false, 2)]);
    }
}
