use thiserror::Error;

/// Error type for the idempotency store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    #[error("persistence lock poisoned during {0}")]
    LockPoisoned(&'static str),

    #[error("persistence backend unavailable: {0}")]
    Unavailable(String),

    #[error("persistence error: {0}")]
    Other(String),
}
