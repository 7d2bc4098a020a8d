use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("collaborator call failed: {0}")]
    Collaborator(#[from] concierge_core::ConciergeError),

    #[error("governance store error: {0}")]
    Governance(#[from] concierge_governance::error::GovernanceError),
}

pub type Result<T> = std::result::Result<T, ExecutorError>;
