//! Sieve routing: from quick features to an executable plan.
//!
//! ## Stages
//!
//! 1. [`route`]: bounded preliminary score over quick features and header
//!    authentication, then a depth band (`score < t_fast` is minimal,
//!    `score >= t_deep` is deep, otherwise standard).
//! 2. [`maybe_escalate`]: at most one widening from minimal to standard when
//!    collected content shows a collaboration intent or a brand lure.
//!
//! ## Invariants
//!
//! - Depth is monotonic in every router input.
//! - `tools(minimal) ⊆ tools(standard) ⊆ tools(deep)` holds structurally:
//!   each depth's list is the union of all cheaper tiers plus its own.
//! - Escalation never changes any score.

pub mod escalation;
pub mod router;

pub use escalation::{find_trigger, maybe_escalate, EscalationTrigger};
pub use router::{preliminary_score, route, select_depth, AuthObservation, ScoreTerm};
