//! Sieve evidence compactor.
//!
//! Turns a [`sieve_types::FrozenBundle`] into a [`CompactedContext`]: the
//! only view of a request an external advisor ever gets. Text artifacts are
//! bounded, stripped of markup, decoded through a bounded number of
//! obfuscation layers, redacted and cut into scored chunks. A single
//! selection pass then enforces the [`sieve_policy::CompactionBudget`].
//!
//! ## Guarantees
//!
//! - No cap in the budget is ever exceeded.
//! - Every exclusion or cut is recorded in `provenance` with a reason.
//! - The highest-ranked artifact is trimmed, never dropped.
//! - Output ordering is identical for identical inputs, and
//!   [`CompactedContext::recompact`] under the same budget is the identity.
//! - Nothing is executed, rendered or fetched.

pub mod compactor;
pub mod decode;
pub(crate) mod patterns;
pub mod redact;
pub mod relevance;
pub mod segment;

pub use compactor::{
    compact, Chunk, CompactedArtifact, CompactedContext, ProvenanceEntry, ProvenanceReason, SignalRef,
};
pub use decode::{decode_layers, Decoded};
pub use redact::{redact_text, redact_url, REDACTED_TOKEN};
pub use relevance::score_chunk;
pub use segment::{segment, Segment};
