//! Structural validation of advisor output.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sieve_compaction::CompactedContext;
use sieve_types::{EvidenceBundle, Verdict};
use thiserror::Error;

use crate::advisor::AdvisoryOutput;

/// Why an advisory output was rejected.
#[derive(Clone, Debug, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
    /// Proposed score is not a valid 0 to 100 score.
    #[error("proposed score {score} outside 0..=100")]
    ScoreOutOfRange { score: i64 },

    /// Confidence is not a probability.
    #[error("confidence {confidence} outside [0, 1]")]
    ConfidenceOutOfRange { confidence: f64 },

    /// A claim cites evidence the advisor was never shown.
    #[error("claim references unknown evidence '{reference}'")]
    UnresolvedReference { reference: String },

    /// Verdict promotion with no supporting claims.
    #[error("promotion from {from} to {to} without claims")]
    UnsupportedPromotion { from: Verdict, to: Verdict },
}

/// Every reference a claim may cite: bundle evidence ids, chunk references
/// and signal refs present in the context.
pub fn resolvable_refs(bundle: &EvidenceBundle, context: &CompactedContext) -> BTreeSet<String> {
    let mut refs = context.known_refs();
    refs.extend(bundle.evidence_ids().into_iter().map(|id| id.0));
    refs
}

/// Accept or reject an advisory output against the deterministic verdict.
pub fn validate(
    output: &AdvisoryOutput,
    deterministic: Verdict,
    bundle: &EvidenceBundle,
    context: &CompactedContext,
) -> Result<(), Rejection> {
    if !(0..=100).contains(&output.proposed_score) {
        return Err(Rejection::ScoreOutOfRange {
            score: output.proposed_score,
        });
    }
    if !output.confidence.is_finite() || !(0.0..=1.0).contains(&output.confidence) {
        return Err(Rejection::ConfidenceOutOfRange {
            confidence: output.confidence,
        });
    }

    let known = resolvable_refs(bundle, context);
    if let Some(claim) = output
        .claims
        .iter()
        .find(|claim| !known.contains(claim.evidence_ref.trim()))
    {
        return Err(Rejection::UnresolvedReference {
            reference: claim.evidence_ref.clone(),
        });
    }

    if output.proposed_verdict > deterministic && output.claims.is_empty() {
        return Err(Rejection::UnsupportedPromotion {
            from: deterministic,
            to: output.proposed_verdict,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::Claim;
    use sieve_compaction::compact;
    use sieve_policy::CompactionConfig;
    use sieve_types::{
        ArtifactKind, ContentIntent, EvidenceFragment, FrozenBundle, Intent, TextArtifact,
    };

    fn fixture() -> (FrozenBundle, CompactedContext) {
        let mut bundle = EvidenceBundle::new();
        bundle
            .insert(EvidenceFragment::ContentIntent(ContentIntent {
                intent: Intent::CredentialTheft,
                urgency: 2,
                brand_entities: vec![],
                requested_actions: vec![],
                confidence: 0.9,
                artifacts: vec![TextArtifact::new(
                    "body",
                    ArtifactKind::Body,
                    "Please verify your password today.",
                )],
            }))
            .unwrap();
        let bundle = bundle.freeze();
        let context = compact(&bundle, &[], Verdict::Benign, &CompactionConfig::default());
        (bundle, context)
    }

    fn output(verdict: Verdict, score: i64, confidence: f64, refs: &[&str]) -> AdvisoryOutput {
        AdvisoryOutput {
            proposed_verdict: verdict,
            proposed_score: score,
            confidence,
            claims: refs
                .iter()
                .map(|r| Claim {
                    statement: "credential lure".into(),
                    evidence_ref: r.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn accepts_bundle_and_chunk_refs() {
        let (bundle, ctx) = fixture();
        let out = output(Verdict::Suspicious, 50, 0.7, &["content_intent", "body@0"]);
        assert_eq!(validate(&out, Verdict::Benign, &bundle, &ctx), Ok(()));
    }

    #[test]
    fn rejects_unknown_reference() {
        let (bundle, ctx) = fixture();
        let out = output(Verdict::Suspicious, 50, 0.7, &["url_chain/7"]);
        assert_eq!(
            validate(&out, Verdict::Benign, &bundle, &ctx),
            Err(Rejection::UnresolvedReference {
                reference: "url_chain/7".into()
            })
        );
    }

    #[test]
    fn rejects_out_of_range_values() {
        let (bundle, ctx) = fixture();
        let out = output(Verdict::Benign, 101, 0.5, &[]);
        assert!(matches!(
            validate(&out, Verdict::Benign, &bundle, &ctx),
            Err(Rejection::ScoreOutOfRange { .. })
        ));
        let out = output(Verdict::Benign, 10, f64::NAN, &[]);
        assert!(matches!(
            validate(&out, Verdict::Benign, &bundle, &ctx),
            Err(Rejection::ConfidenceOutOfRange { .. })
        ));
    }

    #[test]
    fn promotion_needs_claims() {
        let (bundle, ctx) = fixture();
        let out = output(Verdict::Malicious, 90, 0.95, &[]);
        assert!(matches!(
            validate(&out, Verdict::Suspicious, &bundle, &ctx),
            Err(Rejection::UnsupportedPromotion { .. })
        ));
        // agreeing with the deterministic verdict needs none
        let out = output(Verdict::Suspicious, 40, 0.9, &[]);
        assert_eq!(validate(&out, Verdict::Suspicious, &bundle, &ctx), Ok(()));
    }
}
