//! Sieve advisory boundary.
//!
//! The deterministic core is the authority; the advisor is an untrusted,
//! probabilistic second opinion. This crate holds the contract between
//! the two:
//!
//! - [`Advisor`] sees only a [`sieve_compaction::CompactedContext`].
//! - [`validate`] rejects out-of-range values, claims citing evidence the
//!   request does not contain, and promotions without claims.
//! - [`merge`] promotes past confidence gates and never demotes.
//! - [`AdvisoryState`] enforces `NotInvoked -> Invoked -> {Validated, Rejected}`.
//! - [`settle`] turns a recorded [`CallOutcome`] into the final decision,
//!   purely, so traces replay.
//!
//! Timeouts and cancellation of the call itself belong to the orchestrator.

pub mod advisor;
pub mod error;
pub mod merge;
pub mod mocks;
pub mod sampling;
pub mod settle;
pub mod state;
pub mod validator;

pub use advisor::{Advisor, AdvisoryOutput, Claim};
pub use error::{AdvisoryError, AdvisoryResult};
pub use merge::{merge, promotion_target, MergeOutcome};
pub use mocks::ScriptedAdvisor;
pub use sampling::{is_sampled, sample_point, skip_reason};
pub use settle::{settle, CallOutcome, Settlement};
pub use state::{AdvisoryState, SkipReason};
pub use validator::{resolvable_refs, validate, Rejection};
