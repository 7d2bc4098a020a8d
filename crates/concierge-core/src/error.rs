use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConciergeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("LLM provider error: {0}")]
    LlmProvider(String),

    #[error("Collaborator error ({collaborator}): {reason}")]
    Collaborator { collaborator: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid flow state: {0}")]
    InvalidFlowState(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConciergeError {
    /// Short error code, stable across versions, suitable for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            ConciergeError::Config(_) => "CONFIG_ERROR",
            ConciergeError::Database(_) => "DATABASE_ERROR",
            ConciergeError::LlmProvider(_) => "LLM_PROVIDER_ERROR",
            ConciergeError::Collaborator { .. } => "COLLABORATOR_ERROR",
            ConciergeError::Serialization(_) => "SERIALIZATION_ERROR",
            ConciergeError::Io(_) => "IO_ERROR",
            ConciergeError::InvalidFlowState(_) => "INVALID_FLOW_STATE",
            ConciergeError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, ConciergeError>;
