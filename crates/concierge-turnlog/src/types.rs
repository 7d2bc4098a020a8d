use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the append-only turn log, mirroring
/// `original_source/agents/turn_logging.py`'s record shape. Meant for
/// offline analysis, not for anything the orchestrator reads back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnLogRecord {
    pub turn_id: String,
    pub user_id: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub intent: String,
    pub confidence: f64,
    pub agent: String,
    #[serde(default)]
    pub side_effects: Vec<String>,
    pub duration_ms: u64,
}
