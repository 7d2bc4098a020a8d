use concierge_core::Intent;
use serde::{Deserialize, Serialize};

/// Entities the classifier may extract. Missing keys mean "not extracted" —
/// callers must not conflate `None` with an empty string (§4.6).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Entities {
    #[serde(default)]
    pub faculty_name: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub ticket_description: Option<String>,
}

impl Entities {
    pub fn is_empty(&self) -> bool {
        self.faculty_name.is_none()
            && self.email_address.is_none()
            && self.purpose.is_none()
            && self.ticket_description.is_none()
    }
}

/// Full classifier output for one message.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub intent: Intent,
    pub confidence: f64,
    pub entities: Entities,
    pub reasoning: String,
}

/// Raw shape expected back from the LLM, before regex-fallback enrichment.
#[derive(Debug, Deserialize)]
pub(crate) struct RawClassification {
    pub intent: String,
    pub confidence: f64,
    #[serde(default)]
    pub entities: Entities,
    #[serde(default)]
    pub reasoning: String,
}
