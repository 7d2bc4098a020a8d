//! Bounded in-memory request-deduplication cache: maps a request fingerprint
//! to a prior response for a short TTL, with an explicit-retry bypass.
//!
//! Grounded in `original_source/agents/deduplication.py`'s
//! `DeduplicationService` — same hash derivation and bypass keyword list,
//! expressed here as a `Mutex`-guarded map rather than a `threading.Lock`.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

/// Retry/resend phrases that bypass deduplication regardless of cache
/// state. Ported verbatim from the Python reference's `bypass_keywords`.
pub const BYPASS_KEYWORDS: &[&str] = &[
    "retry",
    "resend",
    "send again",
    "try again",
    "once more",
    "one more time",
    "please send",
    "send it",
    "do it again",
];

struct CacheEntry {
    response: Value,
    expires_at: DateTime<Utc>,
}

/// Request-fingerprint cache with a sliding TTL.
pub struct DedupCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl DedupCache {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    /// True if `message` contains a retry/resend phrase (case-insensitive).
    pub fn should_bypass(&self, message: &str) -> bool {
        let lower = message.to_lowercase();
        BYPASS_KEYWORDS.iter().any(|kw| {
            let hit = lower.contains(kw);
            if hit {
                debug!(keyword = kw, "dedup bypass keyword detected");
            }
            hit
        })
    }

    /// Fingerprint = sha256(user_id | intent | sorted-entities-json | minute bucket).
    fn fingerprint(&self, user_id: &str, intent: &str, entities: &Value, now: DateTime<Utc>) -> String {
        let bucket = now.timestamp() - (now.timestamp() % 60);
        let entities_str = canonical_json(entities);
        let input = format!("{user_id}|{intent}|{entities_str}|{bucket}");
        let digest = Sha256::digest(input.as_bytes());
        hex::encode(digest)
    }

    /// Check whether an identical request was served within the TTL. Honors
    /// the retry-keyword bypass first, matching the original's short-circuit.
    pub fn check_duplicate(
        &self,
        user_id: &str,
        intent: &str,
        entities: &Value,
        message: &str,
    ) -> (bool, Option<Value>) {
        if self.should_bypass(message) {
            return (false, None);
        }

        let now = Utc::now();
        let key = self.fingerprint(user_id, intent, entities, now);
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|_, e| e.expires_at > now);

        match entries.get(&key) {
            Some(entry) if entry.expires_at > now => {
                debug!(intent, "duplicate request detected, returning cached response");
                (true, Some(entry.response.clone()))
            }
            _ => (false, None),
        }
    }

    /// Cache a response under today's fingerprint for future dedup checks.
    pub fn cache_response(&self, user_id: &str, intent: &str, entities: &Value, response: Value) {
        let now = Utc::now();
        let key = self.fingerprint(user_id, intent, entities, now);
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key,
            CacheEntry {
                response,
                expires_at: now + self.ttl,
            },
        );
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

/// Serialize a JSON value with object keys sorted, matching Python's
/// `json.dumps(..., sort_keys=True)` so identical entity sets hash the same
/// regardless of insertion order.
fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let parts: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{:?}:{}", k, canonical_json(&map[k])))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", parts.join(","))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identical_request_within_ttl_is_duplicate() {
        let cache = DedupCache::new(30);
        let entities = json!({"to": "prof@college.edu"});
        cache.cache_response("u1", "EMAIL", &entities, json!({"ok": true}));
        let (dup, resp) = cache.check_duplicate("u1", "EMAIL", &entities, "can you check on that");
        assert!(dup);
        assert_eq!(resp.unwrap(), json!({"ok": true}));
    }

    #[test]
    fn different_entities_are_not_duplicate() {
        let cache = DedupCache::new(30);
        cache.cache_response("u1", "EMAIL", &json!({"to": "a@x.com"}), json!({"ok": true}));
        let (dup, _) = cache.check_duplicate("u1", "EMAIL", &json!({"to": "b@x.com"}), "hello");
        assert!(!dup);
    }

    #[test]
    fn bypass_keyword_skips_dedup_even_with_cached_entry() {
        let cache = DedupCache::new(30);
        let entities = json!({"to": "prof@college.edu"});
        cache.cache_response("u1", "EMAIL", &entities, json!({"ok": true}));
        let (dup, _) = cache.check_duplicate("u1", "EMAIL", &entities, "please retry that");
        assert!(!dup);
    }

    #[test]
    fn entity_key_order_does_not_affect_fingerprint() {
        let cache = DedupCache::new(30);
        let a = json!({"a": 1, "b": 2});
        let b = json!({"b": 2, "a": 1});
        cache.cache_response("u1", "TICKET", &a, json!("resp"));
        let (dup, _) = cache.check_duplicate("u1", "TICKET", &b, "hi");
        assert!(dup);
    }
}
