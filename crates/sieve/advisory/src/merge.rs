//! Bounded merge of a validated advisory output into the deterministic decision.
//!
//! The advisor can only promote, never demote, and only past the
//! configured confidence gates. A promoted score is normalized into the
//! band of the promoted verdict.

use serde::{Deserialize, Serialize};
use sieve_policy::{AdvisoryConfig, VerdictThresholds};
use sieve_scoring::{normalize_into_band, Decision};
use sieve_types::Verdict;

use crate::advisor::AdvisoryOutput;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOutcome {
    pub decision: Decision,
    /// Whether the advisory output changed the verdict.
    pub applied: bool,
}

/// Highest verdict the output's confidence allows it to push for.
pub fn promotion_target(output: &AdvisoryOutput, config: &AdvisoryConfig) -> Option<Verdict> {
    match output.proposed_verdict {
        Verdict::Malicious if output.confidence >= config.promote_to_malicious_confidence => {
            Some(Verdict::Malicious)
        }
        Verdict::Malicious | Verdict::Suspicious if output.confidence >= config.promote_confidence => {
            Some(Verdict::Suspicious)
        }
        _ => None,
    }
}

/// Merge a validated output. The result is never below `deterministic`.
pub fn merge(
    deterministic: &Decision,
    output: &AdvisoryOutput,
    config: &AdvisoryConfig,
    thresholds: &VerdictThresholds,
) -> MergeOutcome {
    match promotion_target(output, config) {
        Some(target) if target > deterministic.verdict => {
            let proposed = output.proposed_score.clamp(0, 100) as u8;
            let score = normalize_into_band(deterministic.score.max(proposed), target, thresholds);
            MergeOutcome {
                decision: Decision {
                    score,
                    verdict: target,
                },
                applied: true,
            }
        }
        _ => MergeOutcome {
            decision: deterministic.clone(),
            applied: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::Claim;

    fn output(verdict: Verdict, score: i64, confidence: f64) -> AdvisoryOutput {
        AdvisoryOutput {
            proposed_verdict: verdict,
            proposed_score: score,
            confidence,
            claims: vec![Claim {
                statement: "lure".into(),
                evidence_ref: "content_intent".into(),
            }],
        }
    }

    fn det(score: u8, verdict: Verdict) -> Decision {
        Decision { score, verdict }
    }

    #[test]
    fn low_confidence_never_promotes() {
        let out = merge(
            &det(10, Verdict::Benign),
            &output(Verdict::Malicious, 95, 0.5),
            &AdvisoryConfig::default(),
            &VerdictThresholds::default(),
        );
        assert!(!out.applied);
        assert_eq!(out.decision, det(10, Verdict::Benign));
    }

    #[test]
    fn mid_confidence_caps_at_suspicious() {
        let out = merge(
            &det(10, Verdict::Benign),
            &output(Verdict::Malicious, 95, 0.7),
            &AdvisoryConfig::default(),
            &VerdictThresholds::default(),
        );
        assert!(out.applied);
        assert_eq!(out.decision.verdict, Verdict::Suspicious);
        // 95 normalized into [30, 69]
        assert_eq!(out.decision.score, 69);
    }

    #[test]
    fn high_confidence_promotes_to_malicious() {
        let out = merge(
            &det(45, Verdict::Suspicious),
            &output(Verdict::Malicious, 40, 0.85),
            &AdvisoryConfig::default(),
            &VerdictThresholds::default(),
        );
        assert_eq!(out.decision.verdict, Verdict::Malicious);
        assert_eq!(out.decision.score, 70);
    }

    #[test]
    fn never_demotes() {
        let out = merge(
            &det(80, Verdict::Malicious),
            &output(Verdict::Benign, 5, 1.0),
            &AdvisoryConfig::default(),
            &VerdictThresholds::default(),
        );
        assert!(!out.applied);
        assert_eq!(out.decision, det(80, Verdict::Malicious));

        let out = merge(
            &det(40, Verdict::Suspicious),
            &output(Verdict::Suspicious, 90, 0.99),
            &AdvisoryConfig::default(),
            &VerdictThresholds::default(),
        );
        assert!(!out.applied);
        assert_eq!(out.decision.score, 40);
    }
}
