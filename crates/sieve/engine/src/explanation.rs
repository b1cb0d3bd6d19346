//! Evidence-referencing explanation of a final decision.

use serde::{Deserialize, Serialize};
use sieve_advisory::Settlement;
use sieve_policy::ExplanationConfig;
use sieve_scoring::FusionOutcome;
use sieve_types::{Degradation, HardRuleMatch, Verdict};

const MAX_CLAIM_CHARS: usize = 120;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub top_signals: Vec<String>,
    pub recommended_action: String,
    pub confidence: f64,
}

fn format_points(points: f64) -> String {
    if points.fract() == 0.0 {
        format!("{points:.0}")
    } else {
        format!("{points:.2}")
    }
}

fn with_ref(text: String, reference: Option<&str>) -> String {
    match reference {
        Some(r) => format!("{text} [{r}]"),
        None => text,
    }
}

/// Hard rules first, then the fusion breakdown, then applied advisory claims.
fn rank_signals(fusion: &FusionOutcome, hard_matches: &[HardRuleMatch], advisory: &Settlement) -> Vec<String> {
    let hard = hard_matches
        .iter()
        .map(|m| format!("hard_rule:{} ({})", m.code, m.matched_factors.join(",")));
    let factors = fusion.breakdown.iter().map(|f| {
        with_ref(
            format!("{} +{}", f.factor, format_points(f.contribution)),
            f.evidence.as_ref().map(|e| e.as_str()),
        )
    });
    let claims = advisory.applied_claims.iter().map(|c| {
        let statement: String = c.statement.chars().take(MAX_CLAIM_CHARS).collect();
        with_ref(format!("advisory:{}", statement.trim()), Some(&c.evidence_ref))
    });
    hard.chain(factors).chain(claims).collect()
}

/// Confidence in the final verdict, rounded to two decimals.
pub fn confidence(verdict: Verdict, score: u8, advisory: &Settlement, degradations: &[Degradation]) -> f64 {
    let mut value = advisory
        .confidence
        .unwrap_or(0.35 + f64::from(score) / 100.0 * 0.55);

    let missing = degradations
        .iter()
        .filter(|d| d.code.is_missing_evidence())
        .count();
    value -= (0.05 * missing as f64).min(0.2);

    match verdict {
        Verdict::Suspicious => value = value.min(0.78),
        Verdict::Benign if score >= 20 => value = value.min(0.62),
        _ => {}
    }
    (value.clamp(0.0, 1.0) * 100.0).round() / 100.0
}

pub fn build(
    verdict: Verdict,
    score: u8,
    fusion: &FusionOutcome,
    hard_matches: &[HardRuleMatch],
    advisory: &Settlement,
    degradations: &[Degradation],
    config: &ExplanationConfig,
) -> Explanation {
    let mut top_signals = rank_signals(fusion, hard_matches, advisory);
    top_signals.truncate(config.max_top_signals);
    if verdict == Verdict::Malicious && top_signals.is_empty() {
        top_signals.push(format!("score_threshold:{score}"));
    }
    Explanation {
        top_signals,
        recommended_action: verdict.recommended_action().to_string(),
        confidence: confidence(verdict, score, advisory, degradations),
    }
}
