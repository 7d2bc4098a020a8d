use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use concierge_core::SessionId;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{FlowStoreError, Result};
use crate::types::PausedFlow;

/// In-memory store for paused multi-step flows (email drafting, ticket
/// creation, ...). A flow survives until it is resumed, explicitly cleared,
/// or the session goes inactive for longer than `inactivity_ttl`.
///
/// Grounded in the two-dict design of the original `FlowPauseManager`
/// (`paused_flows`, `session_activity`), expressed here as two mutex-guarded
/// maps rather than a class with Python dict mutation.
pub struct FlowStore {
    paused: Mutex<HashMap<(SessionId, String), PausedFlow>>,
    activity: Mutex<HashMap<SessionId, DateTime<Utc>>>,
    inactivity_ttl: Duration,
}

impl FlowStore {
    pub fn new(inactivity_ttl_minutes: i64) -> Self {
        Self {
            paused: Mutex::new(HashMap::new()),
            activity: Mutex::new(HashMap::new()),
            inactivity_ttl: Duration::minutes(inactivity_ttl_minutes),
        }
    }

    /// Pause `flow_key` for `session_id`, storing an arbitrary JSON blob of
    /// step state. Overwrites any existing paused flow with the same key.
    #[instrument(skip(self, state), fields(session_id = %session_id, flow_key))]
    pub fn pause(&self, session_id: &SessionId, flow_key: &str, state: Value) {
        let now = Utc::now();
        let mut paused = self.paused.lock().unwrap();
        paused.insert(
            (session_id.clone(), flow_key.to_string()),
            PausedFlow {
                state,
                paused_at: now,
                expires_at: now + self.inactivity_ttl,
            },
        );
        debug!(session_id = %session_id, flow_key, "paused flow");
    }

    /// Resume a paused flow, removing it from the store. Returns `None` if
    /// it was never paused or has expired.
    #[instrument(skip(self), fields(session_id = %session_id, flow_key))]
    pub fn resume(&self, session_id: &SessionId, flow_key: &str) -> Option<Value> {
        self.sweep_expired(session_id);
        let mut paused = self.paused.lock().unwrap();
        let key = (session_id.clone(), flow_key.to_string());
        let flow = paused.remove(&key)?;
        if Utc::now() >= flow.expires_at {
            debug!(session_id = %session_id, flow_key, "flow expired, cannot resume");
            return None;
        }
        debug!(session_id = %session_id, flow_key, "resumed flow");
        Some(flow.state)
    }

    /// Read a paused flow's state without consuming it. Used by the
    /// orchestrator to render the compact `{active_flow, step}` metadata
    /// summary (§9 "flow state as data") after a handler has re-paused the
    /// flow, without disturbing what it just stored.
    pub fn peek(&self, session_id: &SessionId, flow_key: &str) -> Option<Value> {
        self.sweep_expired(session_id);
        let paused = self.paused.lock().unwrap();
        let flow = paused.get(&(session_id.clone(), flow_key.to_string()))?;
        if Utc::now() >= flow.expires_at {
            return None;
        }
        Some(flow.state.clone())
    }

    /// True if a non-expired flow is paused for this session/flow-key.
    pub fn has(&self, session_id: &SessionId, flow_key: &str) -> bool {
        self.sweep_expired(session_id);
        let paused = self.paused.lock().unwrap();
        paused
            .get(&(session_id.clone(), flow_key.to_string()))
            .map(|f| Utc::now() < f.expires_at)
            .unwrap_or(false)
    }

    /// Explicitly clear a paused flow without resuming it (used when the
    /// user abandons a flow mid-way, e.g. by switching intent).
    pub fn clear(&self, session_id: &SessionId, flow_key: &str) {
        let mut paused = self.paused.lock().unwrap();
        paused.remove(&(session_id.clone(), flow_key.to_string()));
    }

    /// Record that the session just received a message.
    pub fn update_activity(&self, session_id: &SessionId) {
        let mut activity = self.activity.lock().unwrap();
        activity.insert(session_id.clone(), Utc::now());
    }

    /// True if the session has been inactive for longer than the configured
    /// TTL. As a side effect, ends the session (dropping all its paused
    /// flows) when it has timed out.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub fn check_session_timeout(&self, session_id: &SessionId) -> bool {
        let timed_out = {
            let activity = self.activity.lock().unwrap();
            match activity.get(session_id) {
                Some(last) => Utc::now() - *last > self.inactivity_ttl,
                None => false,
            }
        };
        if timed_out {
            debug!(session_id = %session_id, "session timed out, clearing paused flows");
            self.end_session(session_id);
        }
        timed_out
    }

    /// Drop all paused flows and activity tracking for a session.
    pub fn end_session(&self, session_id: &SessionId) {
        let mut paused = self.paused.lock().unwrap();
        paused.retain(|(sid, _), _| sid != session_id);
        drop(paused);
        let mut activity = self.activity.lock().unwrap();
        activity.remove(session_id);
    }

    fn sweep_expired(&self, session_id: &SessionId) {
        let now = Utc::now();
        let mut paused = self.paused.lock().unwrap();
        paused.retain(|(sid, _), flow| sid != session_id || now < flow.expires_at);
    }
}

/// Resume a flow, returning an error (rather than `None`) when it is
/// missing — convenient for call sites that treat a missing flow as a bug.
pub fn resume_or_err(store: &FlowStore, session_id: &SessionId, flow_key: &str) -> Result<Value> {
    store
        .resume(session_id, flow_key)
        .ok_or_else(|| FlowStoreError::NotPaused {
            session_id: session_id.to_string(),
            flow_key: flow_key.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pause_then_resume_returns_state() {
        let store = FlowStore::new(30);
        let sid = SessionId::from("s1");
        store.pause(&sid, "email_draft", json!({"step": "awaiting_subject"}));
        assert!(store.has(&sid, "email_draft"));
        let resumed = store.resume(&sid, "email_draft").unwrap();
        assert_eq!(resumed["step"], "awaiting_subject");
        assert!(!store.has(&sid, "email_draft"));
    }

    #[test]
    fn peek_returns_state_without_consuming_it() {
        let store = FlowStore::new(30);
        let sid = SessionId::from("s1b");
        store.pause(&sid, "email_draft", json!({"step": "preview"}));
        assert_eq!(store.peek(&sid, "email_draft").unwrap()["step"], "preview");
        assert!(store.has(&sid, "email_draft"));
        assert_eq!(store.peek(&sid, "email_draft").unwrap()["step"], "preview");
    }

    #[test]
    fn resume_missing_flow_returns_none() {
        let store = FlowStore::new(30);
        let sid = SessionId::from("s2");
        assert!(store.resume(&sid, "ticket_draft").is_none());
    }

    #[test]
    fn end_session_clears_all_its_flows() {
        let store = FlowStore::new(30);
        let sid = SessionId::from("s3");
        store.pause(&sid, "email_draft", json!({}));
        store.pause(&sid, "ticket_draft", json!({}));
        store.end_session(&sid);
        assert!(!store.has(&sid, "email_draft"));
        assert!(!store.has(&sid, "ticket_draft"));
    }

    #[test]
    fn clear_removes_only_named_flow() {
        let store = FlowStore::new(30);
        let sid = SessionId::from("s4");
        store.pause(&sid, "email_draft", json!({}));
        store.pause(&sid, "ticket_draft", json!({}));
        store.clear(&sid, "email_draft");
        assert!(!store.has(&sid, "email_draft"));
        assert!(store.has(&sid, "ticket_draft"));
    }
}
