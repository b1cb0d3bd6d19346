//! Turning one advisor call into a final decision.
//!
//! Everything after the call itself is pure, so a recorded
//! [`CallOutcome`] replays to the same settlement.

use serde::{Deserialize, Serialize};
use sieve_compaction::CompactedContext;
use sieve_policy::{AdvisoryConfig, VerdictThresholds};
use sieve_scoring::Decision;
use sieve_types::{EvidenceBundle, FallbackReason};
use tracing::{debug, warn};

use crate::advisor::{AdvisoryOutput, Claim};
use crate::error::{AdvisoryError, AdvisoryResult};
use crate::merge::merge;
use crate::state::{AdvisoryState, SkipReason};
use crate::validator::{validate, Rejection};

/// What the advisor call produced, as recorded in the trace.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum CallOutcome {
    Returned(AdvisoryOutput),
    Malformed(String),
    Unavailable,
    Failed(String),
    TimedOut,
    Cancelled,
}

impl CallOutcome {
    pub fn from_result(result: Result<AdvisoryOutput, AdvisoryError>) -> Self {
        match result {
            Ok(output) => CallOutcome::Returned(output),
            Err(AdvisoryError::Malformed(detail)) => CallOutcome::Malformed(detail),
            Err(AdvisoryError::Unavailable) => CallOutcome::Unavailable,
            Err(other) => CallOutcome::Failed(other.to_string()),
        }
    }

    /// Fallback reason for a call that produced no usable output.
    fn failure(&self) -> Option<(FallbackReason, String)> {
        match self {
            CallOutcome::Returned(_) => None,
            CallOutcome::Malformed(detail) => Some((FallbackReason::AdvisoryInvalid, detail.clone())),
            CallOutcome::Unavailable => Some((
                FallbackReason::AdvisoryUnavailable,
                "advisor became unavailable".to_string(),
            )),
            CallOutcome::Failed(detail) => Some((FallbackReason::AdvisoryError, detail.clone())),
            CallOutcome::TimedOut => Some((FallbackReason::AdvisoryTimeout, "advisor timed out".to_string())),
            CallOutcome::Cancelled => Some((
                FallbackReason::AdvisoryCancelled,
                "request cancelled during advisory call".to_string(),
            )),
        }
    }
}

/// Final advisory state and the decision that goes out.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub state: AdvisoryState,
    pub decision: Decision,
    pub fallback: Option<FallbackReason>,
    pub rejection: Option<Rejection>,
    /// Claims of an output that changed the decision.
    pub applied_claims: Vec<Claim>,
    /// Advisor confidence, when its output was applied.
    pub confidence: Option<f64>,
}

impl Settlement {
    /// The advisor was not consulted.
    pub fn skipped(reason: SkipReason, deterministic: &Decision) -> Self {
        Self {
            state: AdvisoryState::skipped(reason),
            decision: deterministic.clone(),
            fallback: reason.fallback(),
            rejection: None,
            applied_claims: Vec::new(),
            confidence: None,
        }
    }

    /// The advisor was consulted but its outcome could not be settled.
    pub fn rejected(reason: impl Into<String>, fallback: FallbackReason, deterministic: &Decision) -> Self {
        Self {
            state: AdvisoryState::Rejected { reason: reason.into() },
            decision: deterministic.clone(),
            fallback: Some(fallback),
            rejection: None,
            applied_claims: Vec::new(),
            confidence: None,
        }
    }
}

/// Validate and merge one call outcome.
///
/// Any failure leaves `deterministic` unchanged and sets a fallback reason.
pub fn settle(
    outcome: &CallOutcome,
    deterministic: &Decision,
    bundle: &EvidenceBundle,
    context: &CompactedContext,
    config: &AdvisoryConfig,
    thresholds: &VerdictThresholds,
) -> AdvisoryResult<Settlement> {
    let mut state = AdvisoryState::default();
    state.invoke()?;

    let mut settlement = Settlement {
        state: state.clone(),
        decision: deterministic.clone(),
        fallback: None,
        rejection: None,
        applied_claims: Vec::new(),
        confidence: None,
    };

    let output = match outcome {
        CallOutcome::Returned(output) => output,
        other => {
            if let Some((reason, detail)) = other.failure() {
                warn!(fallback = reason.as_str(), detail = %detail, "advisory fallback");
                state.reject(detail)?;
                settlement.fallback = Some(reason);
            }
            settlement.state = state;
            return Ok(settlement);
        }
    };

    if let Err(rejection) = validate(output, deterministic.verdict, bundle, context) {
        warn!(rejection = %rejection, "advisory output rejected");
        state.reject(rejection.to_string())?;
        settlement.state = state;
        settlement.fallback = Some(FallbackReason::AdvisoryInvalid);
        settlement.rejection = Some(rejection);
        return Ok(settlement);
    }

    let merged = merge(deterministic, output, config, thresholds);
    state.validate(merged.applied)?;
    debug!(
        applied = merged.applied,
        verdict = merged.decision.verdict.as_str(),
        score = merged.decision.score,
        "advisory output validated"
    );

    settlement.state = state;
    settlement.decision = merged.decision;
    if merged.applied {
        settlement.applied_claims = output.claims.clone();
        settlement.confidence = Some(output.confidence);
    }
    Ok(settlement)
}
