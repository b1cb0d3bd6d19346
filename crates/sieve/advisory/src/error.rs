//! Advisory boundary errors.

use thiserror::Error;

/// Failure at the advisor call or in the advisory state machine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdvisoryError {
    /// No advisor is configured, or it reports itself down.
    #[error("advisor is unavailable")]
    Unavailable,

    /// The advisor was called and returned an error.
    #[error("advisor invocation failed: {0}")]
    Invocation(String),

    /// Output did not parse into the advisory schema.
    #[error("malformed advisory output: {0}")]
    Malformed(String),

    /// State machine step not allowed from the current state.
    #[error("illegal advisory transition: {from} -> {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
}

pub type AdvisoryResult<T> = Result<T, AdvisoryError>;
