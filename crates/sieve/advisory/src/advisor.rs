//! The advisor contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sieve_compaction::CompactedContext;
use sieve_types::Verdict;

use crate::error::{AdvisoryError, AdvisoryResult};

/// One evidence-backed statement from the advisor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub statement: String,
    /// Evidence id, chunk reference or signal ref the claim rests on.
    pub evidence_ref: String,
}

/// Raw advisor output. Untrusted until it passes validation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryOutput {
    pub proposed_verdict: Verdict,
    /// Signed so out-of-range proposals survive parsing and get rejected.
    pub proposed_score: i64,
    pub confidence: f64,
    #[serde(default)]
    pub claims: Vec<Claim>,
}

impl AdvisoryOutput {
    pub fn parse(json: &str) -> AdvisoryResult<Self> {
        serde_json::from_str(json).map_err(|e| AdvisoryError::Malformed(e.to_string()))
    }

    pub fn from_value(value: serde_json::Value) -> AdvisoryResult<Self> {
        serde_json::from_value(value).map_err(|e| AdvisoryError::Malformed(e.to_string()))
    }
}

/// External probabilistic advisor.
///
/// Implementations see only the compacted context. They have no handle on
/// producers, the evidence bundle or the producer registry.
#[async_trait]
pub trait Advisor: Send + Sync {
    /// Short name used in logs and degradations.
    fn name(&self) -> &str;

    /// Cheap readiness check. A `false` skips the call.
    fn is_available(&self) -> bool;

    async fn advise(&self, context: &CompactedContext) -> Result<AdvisoryOutput, AdvisoryError>;
}
