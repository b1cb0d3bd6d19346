//! Error types for evidence bundle writes.

use thiserror::Error;

use crate::evidence::EvidenceSlot;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BundleError {
    /// The slot already holds a fragment for this request.
    #[error("evidence slot already written: {0}")]
    SlotAlreadyWritten(EvidenceSlot),

    /// A producer returned a fragment for a slot it does not own.
    #[error("producer declared slot {expected} but returned {actual}")]
    SlotMismatch {
        expected: EvidenceSlot,
        actual: EvidenceSlot,
    },
}

pub type BundleResult<T> = Result<T, BundleError>;
