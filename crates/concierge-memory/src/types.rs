use chrono::{DateTime, Utc};
use concierge_core::MessageRole;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single turn in a session's conversation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub user_id: String,
    pub session_id: String,
    pub role: MessageRole,
    pub content: String,
    pub intent: Option<String>,
    pub agent: Option<String>,
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// Maximum characters rendered per line in `get_user_context` output.
pub const CONTEXT_LINE_MAX_CHARS: usize = 300;
