// engine/state.rs — Shared chat state and its observers.
//
// One mutable resource (the conversation) plus the busy flag and the
// optional anonymous user id. Every mutation notifies all registered
// observers synchronously, after the state lock has been released, so an
// observer may read the state again without deadlocking.

use crate::atoms::traits::StateObserver;
use crate::atoms::types::{ChatSnapshot, GenerateContentRequest, Turn};
use crate::engine::history::HistoryAccumulator;
use parking_lot::Mutex;
use std::sync::Arc;

/// Handle returned by [`ChatState::subscribe`]; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverId(u64);

#[derive(Default)]
struct Inner {
    history: HistoryAccumulator,
    busy: bool,
    user_id: Option<String>,
}

impl Inner {
    fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            turns: self.history.turns().to_vec(),
            busy: self.busy,
            user_id: self.user_id.clone(),
        }
    }
}

#[derive(Default)]
pub struct ChatState {
    inner: Mutex<Inner>,
    observers: Mutex<Vec<(ObserverId, Arc<dyn StateObserver>)>>,
    next_observer: Mutex<u64>,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: Arc<dyn StateObserver>) -> ObserverId {
        let id = {
            let mut next = self.next_observer.lock();
            *next += 1;
            ObserverId(*next)
        };
        self.observers.lock().push((id, observer));
        id
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|(oid, _)| *oid != id);
        observers.len() != before
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        self.inner.lock().snapshot()
    }

    pub fn turns(&self) -> Vec<Turn> {
        self.inner.lock().history.turns().to_vec()
    }

    pub fn is_busy(&self) -> bool {
        self.inner.lock().busy
    }

    pub fn user_id(&self) -> Option<String> {
        self.inner.lock().user_id.clone()
    }

    /// Append a user turn; `None` (and no notification) for blank input.
    pub fn append_user_turn(&self, text: &str) -> Option<Vec<Turn>> {
        let snapshot = {
            let mut inner = self.inner.lock();
            inner.history.append_user_turn(text)?;
            inner.snapshot()
        };
        let turns = snapshot.turns.clone();
        self.notify(&snapshot);
        Some(turns)
    }

    pub fn append_model_turn(&self, text: &str) -> Vec<Turn> {
        let snapshot = {
            let mut inner = self.inner.lock();
            inner.history.append_model_turn(text);
            inner.snapshot()
        };
        let turns = snapshot.turns.clone();
        self.notify(&snapshot);
        turns
    }

    pub fn request_payload(&self) -> GenerateContentRequest {
        self.inner.lock().history.to_request_payload()
    }

    /// Set the busy flag if it is clear. Returns `false` when a dispatch is
    /// already outstanding.
    pub fn try_begin_dispatch(&self) -> bool {
        let snapshot = {
            let mut inner = self.inner.lock();
            if inner.busy {
                return false;
            }
            inner.busy = true;
            inner.snapshot()
        };
        self.notify(&snapshot);
        true
    }

    pub fn end_dispatch(&self) {
        let snapshot = {
            let mut inner = self.inner.lock();
            if !inner.busy {
                return;
            }
            inner.busy = false;
            inner.snapshot()
        };
        self.notify(&snapshot);
    }

    pub fn set_user_id(&self, user_id: Option<String>) {
        let snapshot = {
            let mut inner = self.inner.lock();
            if inner.user_id == user_id {
                return;
            }
            inner.user_id = user_id;
            inner.snapshot()
        };
        self.notify(&snapshot);
    }

    fn notify(&self, snapshot: &ChatSnapshot) {
        let observers: Vec<Arc<dyn StateObserver>> =
            self.observers.lock().iter().map(|(_, o)| o.clone()).collect();
        for observer in observers {
            observer.on_change(snapshot);
        }
    }
}
