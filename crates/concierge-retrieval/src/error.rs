use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("no corpus indexed for source '{0}'")]
    EmptyCorpus(String),
}

pub type Result<T> = std::result::Result<T, RetrievalError>;
