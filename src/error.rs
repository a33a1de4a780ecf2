//! Error types for the search and its collaborators.

use thiserror::Error;

/// Failure reported by a text generator or structured evaluator.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("generator process failed: {0}")]
    Process(String),

    #[error("{0}")]
    Other(String),
}

impl CollaboratorError {
    /// Whether the call is worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CollaboratorError::RateLimited(_)
                | CollaboratorError::Timeout(_)
                | CollaboratorError::Connection(_)
        )
    }
}

/// Errors that abort a search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

/// Result type for search operations
pub type Result<T> = std::result::Result<T, SearchError>;
