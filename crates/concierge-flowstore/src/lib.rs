//! Pause/resume store for multi-step conversation flows (email drafting,
//! ticket creation). Flows live only in memory and expire after a period of
//! session inactivity.

pub mod error;
pub mod manager;
pub mod types;

pub use error::FlowStoreError;
pub use manager::{resume_or_err, FlowStore};
pub use types::PausedFlow;
