//! Score breakdown and hard-rule records.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::ids::EvidenceId;

/// One weighted factor of the fused score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FactorContribution {
    pub factor: String,
    /// Extracted value in `[0, 1]`.
    pub value: f64,
    pub weight: f64,
    /// `value * weight`.
    pub contribution: f64,
    /// Evidence the value was read from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<EvidenceId>,
}

impl FactorContribution {
    pub fn new(factor: impl Into<String>, value: f64, weight: f64, evidence: Option<EvidenceId>) -> Self {
        Self {
            factor: factor.into(),
            value,
            weight,
            contribution: value * weight,
            evidence,
        }
    }

    pub fn is_nonzero(&self) -> bool {
        self.contribution > 0.0
    }

    /// Breakdown order: contribution descending, then factor name ascending.
    pub fn breakdown_order(a: &Self, b: &Self) -> Ordering {
        b.contribution
            .total_cmp(&a.contribution)
            .then_with(|| a.factor.cmp(&b.factor))
    }
}

/// A fired hard rule. Any match forces the malicious verdict.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardRuleMatch {
    pub code: String,
    pub matched_factors: Vec<String>,
    /// Evidence identifiers the predicates read.
    #[serde(default)]
    pub evidence: Vec<EvidenceId>,
}
