//! C8 Orchestrator: the single `process_message` entry point tying the
//! classifier, flow handlers, flow store, memory, dedup cache, executor,
//! and turn log together into one deterministic per-turn sequence (§4.8).

pub mod manager;
pub mod types;

pub use manager::Orchestrator;
pub use types::{TurnMetadata, ARTIFACT_PENDING_ACTION, ARTIFACT_RECLASSIFY, ARTIFACT_SENSITIVE, HISTORY_MAX_MESSAGES, INTENT_LABEL_CANCEL};
