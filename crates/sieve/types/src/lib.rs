//! Shared data model for the Sieve evidence-routing and risk-fusion engine.
//!
//! Every other crate in the workspace speaks in these types:
//!
//! - [`EvidenceBundle`] / [`FrozenBundle`]: per-request write-once slots, one
//!   per signal category, frozen behind an `Arc` before any decider reads them.
//! - [`EvidenceFragment`]: the owned output of a signal producer, tagged with
//!   the slot it fills.
//! - [`Plan`]: the routed, depth-tagged producer list.
//! - [`FactorContribution`] / [`HardRuleMatch`]: the fusion breakdown and the
//!   hard overrides.
//! - [`Verdict`] / [`RouteDepth`]: the two ordinals. Display names for depth
//!   exist only at the output boundary.
//!
//! ## Invariants
//!
//! - An absent slot means "not collected", never "zero risk".
//! - A filled slot is never overwritten; a second write is a [`BundleError`].
//! - Degradations are informational. No scoring path reads them.

pub mod degradation;
pub mod error;
pub mod evidence;
pub mod fragment;
pub mod ids;
pub mod plan;
pub mod scoring;
pub mod verdict;

pub use degradation::{Degradation, DegradationCode, FailureKind, FallbackReason};
pub use error::{BundleError, BundleResult};
pub use evidence::{EvidenceBundle, EvidenceSlot, FrozenBundle};
pub use fragment::{
    ArtifactKind, AttachmentFinding, AttachmentFindings, AuthResult, AuthStatus, ContentIntent,
    DomainFindings, DomainRisk, EvidenceFragment, Intent, QuickFeatures, TextArtifact, UrlFinding,
    UrlFindings,
};
pub use ids::{ArtifactId, ChunkRef, EvidenceId, ProducerId, RequestId};
pub use plan::Plan;
pub use scoring::{FactorContribution, HardRuleMatch};
pub use verdict::{RouteDepth, Verdict};
