//! Sieve deciders: fusion, hard rules and verdict mapping.
//!
//! All three read only a [`sieve_types::FrozenBundle`] and an immutable
//! configuration slice, so recomputing a decision from a recorded bundle is
//! pure.
//!
//! ## Invariants
//!
//! - The fused score is in `[0, 100]`.
//! - The breakdown holds exactly the non-zero factors, sorted by
//!   contribution descending and then by factor name.
//! - Any hard-rule match forces `malicious` and floors the score at the
//!   block threshold.

pub mod fusion;
pub mod rules;
pub mod verdict;

pub use fusion::{extract, fuse, FusionOutcome};
pub use rules::{apply_rules, HardRule, RULES};
pub use verdict::{apply_hard_floor, band, decide, map_verdict, normalize_into_band, Decision};
