//! The JSON-serializable state each multi-step flow pauses into the flow
//! store between turns (§3 "Flow state"). Kept as plain `serde` structs
//! rather than a shared dynamic map so each flow's slots are named and
//! typed — closer to `original_source/agents/email_agent.py`'s explicit
//! draft dict than to a generic `Dict[str, Any]`.

use serde::{Deserialize, Serialize};

use concierge_core::envelope::HandlerResponse;

/// Step the email flow is paused at (§4.7.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailStep {
    CollectRecipient,
    FacultySelect,
    CollectPurpose,
    Preview,
}

/// A faculty directory hit shown during `faculty_select`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacultyCandidate {
    pub name: String,
    pub email: String,
    pub department: String,
}

/// Full paused state of an in-progress email draft.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailFlowState {
    pub step: Option<EmailStep>,
    pub recipient: Option<String>,
    pub recipient_name: Option<String>,
    pub purpose: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub faculty_candidates: Vec<FacultyCandidate>,
    /// Last search text, so a failed `faculty_select` can restart the
    /// search with a corrected query (§4.7.2 faculty_select row).
    pub faculty_search_text: Option<String>,
    /// One-shot marker consumed by the next preview generation to bump
    /// temperature and vary phrasing (§9 open question, kept as a knob).
    #[serde(default)]
    pub regenerate: bool,
}

impl EmailFlowState {
    /// Serializes with a `"flow": "email"` marker so a caller resuming a
    /// blob from the flow-pause store (which is flow-agnostic) knows which
    /// state type to deserialize into without a separate lookup.
    pub fn to_value(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let serde_json::Value::Object(ref mut map) = value {
            map.insert("flow".to_string(), serde_json::Value::String(FLOW_NAME_EMAIL.to_string()));
        }
        value
    }

    pub fn from_value(value: serde_json::Value) -> Option<Self> {
        serde_json::from_value(value).ok()
    }
}

/// Step the ticket flow is paused at (§4.7.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStep {
    CollectDescription,
    Preview,
}

/// Full paused state of an in-progress ticket draft.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketFlowState {
    pub step: Option<TicketStep>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub priority: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub sensitive: bool,
}

impl TicketFlowState {
    /// Mirrors [`EmailFlowState::to_value`]'s `"flow"` marker, tagged
    /// `"ticket"`.
    pub fn to_value(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let serde_json::Value::Object(ref mut map) = value {
            map.insert("flow".to_string(), serde_json::Value::String(FLOW_NAME_TICKET.to_string()));
        }
        value
    }

    pub fn from_value(value: serde_json::Value) -> Option<Self> {
        serde_json::from_value(value).ok()
    }
}

/// The `"flow"` discriminator values written by [`EmailFlowState::to_value`]
/// and [`TicketFlowState::to_value`], read back by the orchestrator to pick
/// which flow handler resumes a paused blob (§9 "flow state as data").
pub const FLOW_NAME_EMAIL: &str = "email";
pub const FLOW_NAME_TICKET: &str = "ticket";

/// Peek the `"flow"` marker of a paused state blob without committing to a
/// concrete type — lets the orchestrator dispatch before deserializing.
pub fn flow_name_of(value: &serde_json::Value) -> Option<&str> {
    value.get("flow").and_then(|v| v.as_str())
}

/// Convenience alias; handlers return the same `HandlerResponse` envelope
/// the orchestrator validates (§4.8 step 8).
pub type FlowEnvelope = HandlerResponse;
