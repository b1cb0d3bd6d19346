//! Outward-facing assessment result.

use serde::{Deserialize, Serialize};
use sieve_advisory::AdvisoryState;
use sieve_types::{
    Degradation, DegradationCode, FactorContribution, FallbackReason, HardRuleMatch, RequestId, RouteDepth,
    Verdict,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResponse {
    pub request_id: RequestId,
    pub verdict: Verdict,
    pub score: u8,
    /// Deterministic fusion breakdown, non-zero factors only.
    pub breakdown: Vec<FactorContribution>,
    pub hard_rule_matches: Vec<HardRuleMatch>,
    pub top_signals: Vec<String>,
    /// Serialized as `FAST`, `STANDARD` or `DEEP`.
    #[serde(with = "sieve_types::verdict::display_depth")]
    pub route_depth: RouteDepth,
    pub degradations: Vec<Degradation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
    pub evidence_insufficient: bool,
    pub advisory: AdvisoryState,
    pub recommended_action: String,
    pub confidence: f64,
}

impl AssessmentResponse {
    pub fn has_degradation(&self, code: DegradationCode) -> bool {
        self.degradations.iter().any(|d| d.code == code)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
