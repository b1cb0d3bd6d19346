//! Engine error types.
//!
//! Producer and advisory failures never surface as `Err` from an
//! assessment; they become degradations at the call boundary. Only
//! registry construction, configuration and trace handling fail.

use sieve_advisory::AdvisoryError;
use sieve_policy::ConfigError;
use sieve_types::{EvidenceSlot, ProducerId};
use thiserror::Error;

/// Failure of a single producer call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProducerError {
    /// Any other producer failure.
    #[error("producer failed: {0}")]
    Failed(String),

    /// The producer ran but could not interpret its input.
    #[error("unparseable input: {0}")]
    Unparseable(String),

    /// A backing service the producer needs is down.
    #[error("producer unavailable: {0}")]
    Unavailable(String),
}

/// Producer registration conflict.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Two producers share an id.
    #[error("duplicate producer id: {0}")]
    DuplicateId(ProducerId),

    /// Two producers write the same evidence slot.
    #[error("slot {slot:?} already claimed by {existing}, rejected {rejected}")]
    SlotClaimed {
        slot: EvidenceSlot,
        existing: ProducerId,
        rejected: ProducerId,
    },
}

/// Engine construction and trace handling errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Producer registry could not be built.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Configuration failed to load or validate.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Advisory state machine rejected a transition.
    #[error("advisory state error: {0}")]
    Advisory(#[from] AdvisoryError),

    /// Trace could not be serialized or parsed.
    #[error("trace error: {0}")]
    Trace(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
