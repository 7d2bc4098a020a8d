use serde::{Deserialize, Serialize};

/// A single retrieved policy-corpus segment. Opaque to callers beyond
/// `text`/`source` (§4.3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub text: String,
    pub source: String,
    pub score: f32,
}
