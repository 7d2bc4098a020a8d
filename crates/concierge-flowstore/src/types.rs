use chrono::{DateTime, Utc};
use serde_json::Value;

/// A flow's saved state plus the bookkeeping needed to expire it.
#[derive(Debug, Clone)]
pub struct PausedFlow {
    pub state: Value,
    pub paused_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
