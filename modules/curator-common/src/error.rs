use thiserror::Error;

#[derive(Error, Debug)]
pub enum CuratorError {
    #[error("Criteria extraction failed: {0}")]
    CriteriaExtraction(String),

    #[error("Cache store unavailable: {0}")]
    CacheUnavailable(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Engine(#[from] anyhow::Error),
}
