use serde::{Deserialize, Serialize};

/// Intent label attached to turns the classifier never ran for (an active
/// flow continuation, or the short-circuit cancel path). Not part of the
/// closed [`concierge_core::Intent`] set — these never reach the
/// classifier's threshold gate.
pub const INTENT_LABEL_CANCEL: &str = "CANCEL";

/// Conversation turns rendered into `get_user_context` before classifying
/// a fresh message (§4.8 step 5).
pub const HISTORY_MAX_MESSAGES: usize = 12;

/// Marker a flow handler sets in `HandlerResponse::artifacts["reclassify"]`
/// when free text at a confirm/edit/cancel step didn't match any of the
/// three and looks like the user has moved on to something else (§9,
/// scenario S6). The orchestrator falls through to fresh classification
/// instead of returning the handler's response as-is.
pub const ARTIFACT_RECLASSIFY: &str = "reclassify";
pub const ARTIFACT_PENDING_ACTION: &str = "pending_action";
pub const ARTIFACT_SENSITIVE: &str = "sensitive";

/// Compact per-turn record persisted alongside the bot's message in the
/// chat-memory store, resolving the "flow-state persistence" open question
/// in favor of a small summary rather than the flow's full state
/// (SPEC_FULL.md §10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnMetadata {
    pub intent: String,
    pub confidence: f64,
    pub active_flow: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<serde_json::Value>,
}
