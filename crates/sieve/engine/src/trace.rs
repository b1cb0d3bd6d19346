//! Replayable decision traces.
//!
//! A trace keeps everything a decision depends on that is not pure
//! computation: the frozen bundle, the executed plan, producer
//! degradations, cancellation and the recorded advisory call. [`replay`]
//! recomputes the rest without touching producers or the advisor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sieve_advisory::{CallOutcome, SkipReason};
use sieve_policy::EngineConfig;
use sieve_types::{Degradation, FrozenBundle, Plan, RequestId};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::orchestrator::{conclude, Deterministic, Recorded};
use crate::response::AssessmentResponse;

/// Hex blake3 of a value's JSON form.
pub fn hash_json<T: Serialize + ?Sized>(value: &T) -> String {
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    blake3::hash(&bytes).to_hex().to_string()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStep {
    pub step: String,
    pub input_hash: String,
    pub output_summary: String,
}

/// Ordered step log filled while a decision is computed.
#[derive(Clone, Debug, Default)]
pub struct StepLog(Vec<TraceStep>);

impl StepLog {
    pub fn record<T: Serialize + ?Sized>(&mut self, step: &str, input: &T, summary: impl Into<String>) {
        self.0.push(TraceStep {
            step: step.to_string(),
            input_hash: hash_json(input),
            output_summary: summary.into(),
        });
    }

    pub fn into_steps(self) -> Vec<TraceStep> {
        self.0
    }
}

/// How the advisory stage went, as far as replay needs to know.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdvisoryRecord {
    Skipped { reason: SkipReason },
    Called { outcome: CallOutcome },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionTrace {
    pub trace_id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub request_id: RequestId,
    pub config_fingerprint: String,
    pub steps: Vec<TraceStep>,
    pub bundle: FrozenBundle,
    pub plan: Plan,
    /// Degradations reported by producers, in run order.
    pub producer_degradations: Vec<Degradation>,
    pub cancelled: bool,
    pub empty_input: bool,
    pub advisory: AdvisoryRecord,
    pub response: AssessmentResponse,
}

impl DecisionTrace {
    pub fn to_json(&self) -> EngineResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| EngineError::Trace(e.to_string()))
    }

    pub fn from_json(json: &str) -> EngineResult<Self> {
        serde_json::from_str(json).map_err(|e| EngineError::Trace(e.to_string()))
    }

    pub(crate) fn recorded(&self) -> Recorded<'_> {
        Recorded {
            request_id: &self.request_id,
            plan: &self.plan,
            producer_degradations: &self.producer_degradations,
            cancelled: self.cancelled,
            empty_input: self.empty_input,
        }
    }
}

/// Recompute a decision from its trace.
///
/// Pure: no producer or advisor is invoked. Under the configuration the
/// trace was recorded with, the result equals `trace.response`.
pub fn replay(trace: &DecisionTrace, config: &EngineConfig) -> AssessmentResponse {
    let fingerprint = config.fingerprint();
    if fingerprint != trace.config_fingerprint {
        warn!(
            recorded = %trace.config_fingerprint,
            current = %fingerprint,
            "replaying under a different configuration"
        );
    }
    let mut steps = StepLog::default();
    let deterministic = Deterministic::compute(&trace.bundle, config, &mut steps);
    let response = conclude(
        &trace.recorded(),
        &trace.bundle,
        &deterministic,
        &trace.advisory,
        None,
        config,
        &mut steps,
    );
    info!(
        request_id = %trace.request_id,
        verdict = response.verdict.as_str(),
        score = response.score,
        matches_recorded = response == trace.response,
        "trace replayed"
    );
    response
}
