use thiserror::Error;

#[derive(Error, Debug)]
pub enum PollError {
    /// Operator-facing input problems (bad option count, bad duration).
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Poll {0} not found")]
    NotFound(String),

    /// An action not permitted by the lifecycle state machine.
    /// Nothing is mutated when this is returned.
    #[error("Invalid state: {0}")]
    StateViolation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
