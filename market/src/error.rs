/// Domain-specific error types for the marketplace core.
#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    /// Malformed or out-of-range input. Surfaced to the caller, never retried.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A lock or optimistic write could not be obtained in time.
    /// Transient; the caller may retry.
    #[error("Concurrent access: {0}")]
    Concurrency(String),

    /// The operation is not legal from the entity's current state.
    #[error("Invalid state: {0}")]
    StateConflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Storage backend failure.
    #[error("Storage operation failed: {0}")]
    Storage(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MarketError {
    /// Whether the caller may safely retry the failed operation as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Concurrency(_))
    }
}

/// Convenience type alias.
pub type MarketResult<T> = Result<T, MarketError>;
