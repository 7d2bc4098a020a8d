//! LLM-backed intent classifier over the closed six-way intent set, with a
//! deterministic regex fallback that fills in an email address the model
//! missed.

pub mod classifier;
pub mod prompt;
pub mod regex_fallback;
pub mod types;

pub use classifier::IntentClassifier;
pub use types::{Classification, Entities};
