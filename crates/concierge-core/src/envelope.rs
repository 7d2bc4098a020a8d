use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Status of a single handler invocation (§4.8 validation rules).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerStatus {
    Success,
    Error,
    NeedsInput,
    NeedsConfirmation,
    NeedsEscalation,
}

/// What a flow handler (C7) returns to the orchestrator. This is the
/// internal contract validated by §4.8 step 8 — an invalid one (empty
/// message, non-mapping slots) is replaced with a generic error envelope
/// before it ever reaches the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerResponse {
    pub status: HandlerStatus,
    pub agent: String,
    pub message: String,
    #[serde(default)]
    pub resolved_entities: BTreeMap<String, Value>,
    #[serde(default)]
    pub required_slots: Vec<String>,
    #[serde(default)]
    pub artifacts: BTreeMap<String, Value>,
    #[serde(default)]
    pub side_effects: Vec<String>,
    #[serde(default)]
    pub citations: Vec<String>,
    #[serde(default)]
    pub confirmation_data: Option<Value>,
}

impl HandlerResponse {
    pub fn is_valid(&self) -> bool {
        !self.message.trim().is_empty()
    }

    pub fn generic_error(agent: &str) -> Self {
        Self {
            status: HandlerStatus::Error,
            agent: agent.to_string(),
            message: "Sorry, something went wrong. Please try again.".to_string(),
            resolved_entities: BTreeMap::new(),
            required_slots: Vec::new(),
            artifacts: BTreeMap::new(),
            side_effects: Vec::new(),
            citations: Vec::new(),
            confirmation_data: None,
        }
    }
}

/// The outer envelope shape returned to the HTTP layer (§4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: EnvelopeKind,
    pub agent: String,
    pub content: Value,
    pub metadata: EnvelopeMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_output: Option<AgentOutput>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeKind {
    Information,
    ClarificationRequest,
    EmailPreview,
    TicketPreview,
    ConfirmationRequest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeMetadata {
    pub intent: String,
    pub confidence: f64,
    pub active_flow: Option<String>,
    #[serde(default)]
    pub extracted_slots: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutput {
    pub agent_name: String,
    pub detected_intent: String,
    pub confidence: f64,
    #[serde(default)]
    pub required_slots: Vec<String>,
    pub action_type: Option<String>,
    pub preview_or_final: Value,
    pub message_to_user: String,
    #[serde(default)]
    pub citations: Vec<String>,
}
