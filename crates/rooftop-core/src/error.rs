use thiserror::Error;

#[derive(Debug, Error)]
pub enum OnboardError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error("data integrity: {0}")]
    Integrity(String),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl OnboardError {
    /// Whether the caller may retry after re-reading current state.
    /// Only lost compare-and-swap races qualify; a blind retry of an
    /// `Upstream` failure could provision a second external agent.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Whether the failure indicates corrupted stored state rather than
    /// a bad request. These are surfaced, never recovered from.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Integrity(_) | Self::Internal(_))
    }
}
