use thiserror::Error;

/// Errors that can occur while pausing or resuming a flow.
#[derive(Debug, Error)]
pub enum FlowStoreError {
    /// No paused flow exists for this session/flow-key pair, or it expired.
    #[error("no paused flow '{flow_key}' for session {session_id}")]
    NotPaused { session_id: String, flow_key: String },
}

pub type Result<T> = std::result::Result<T, FlowStoreError>;
