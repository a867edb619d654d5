use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found")]
    NotFound,
    #[error("conflict")]
    Conflict,
    #[error("thread is blocked")]
    Blocked,
    #[error("actor is not authorized for this thread")]
    NotAuthorized,
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("store failure: {0}")]
    Store(String),
}

impl DomainError {
    /// Transient store failures are safe to retry; everything else is a
    /// definitive answer from the domain.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::Store(_))
    }
}
