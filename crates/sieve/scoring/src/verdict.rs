//! Verdict bands.

use sieve_policy::VerdictThresholds;
use sieve_types::{HardRuleMatch, Verdict};

/// Map a score and the hard-rule outcome to a verdict.
pub fn map_verdict(score: u8, hard_matches: &[HardRuleMatch], thresholds: &VerdictThresholds) -> Verdict {
    if !hard_matches.is_empty() || score >= thresholds.block {
        Verdict::Malicious
    } else if score >= thresholds.escalate {
        Verdict::Suspicious
    } else {
        Verdict::Benign
    }
}

/// Floor the score at the block threshold when any hard rule fired.
pub fn apply_hard_floor(score: u8, hard_matches: &[HardRuleMatch], thresholds: &VerdictThresholds) -> u8 {
    if hard_matches.is_empty() {
        score
    } else {
        score.max(thresholds.block)
    }
}

/// Inclusive score range consistent with a verdict.
pub fn band(verdict: Verdict, thresholds: &VerdictThresholds) -> (u8, u8) {
    match verdict {
        Verdict::Benign => (0, thresholds.escalate.saturating_sub(1)),
        Verdict::Suspicious => (thresholds.escalate, thresholds.block.saturating_sub(1)),
        Verdict::Malicious => (thresholds.block, 100),
    }
}

/// Clamp a score into the band of `verdict`.
pub fn normalize_into_band(score: u8, verdict: Verdict, thresholds: &VerdictThresholds) -> u8 {
    let (low, high) = band(verdict, thresholds);
    score.clamp(low, high)
}

/// Deterministic score and verdict for one request.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Decision {
    pub score: u8,
    pub verdict: Verdict,
}

/// Combine fused score and hard matches into the preliminary decision.
pub fn decide(fused_score: u8, hard_matches: &[HardRuleMatch], thresholds: &VerdictThresholds) -> Decision {
    let score = apply_hard_floor(fused_score, hard_matches, thresholds);
    Decision {
        score,
        verdict: map_verdict(score, hard_matches, thresholds),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hard() -> Vec<HardRuleMatch> {
        vec![HardRuleMatch {
            code: "dmarc_fail_reply_to_login_url".into(),
            matched_factors: vec![],
            evidence: vec![],
        }]
    }

    #[test]
    fn threshold_bands() {
        let t = VerdictThresholds::default();
        assert_eq!(map_verdict(0, &[], &t), Verdict::Benign);
        assert_eq!(map_verdict(29, &[], &t), Verdict::Benign);
        assert_eq!(map_verdict(30, &[], &t), Verdict::Suspicious);
        assert_eq!(map_verdict(69, &[], &t), Verdict::Suspicious);
        assert_eq!(map_verdict(70, &[], &t), Verdict::Malicious);
    }

    #[test]
    fn hard_match_overrides_score() {
        let t = VerdictThresholds::default();
        let decision = decide(5, &hard(), &t);
        assert_eq!(decision.verdict, Verdict::Malicious);
        assert_eq!(decision.score, 70);
        assert_eq!(decide(91, &hard(), &t).score, 91);
    }

    #[test]
    fn normalize_clamps_into_band() {
        let t = VerdictThresholds::default();
        assert_eq!(normalize_into_band(95, Verdict::Suspicious, &t), 69);
        assert_eq!(normalize_into_band(10, Verdict::Suspicious, &t), 30);
        assert_eq!(normalize_into_band(40, Verdict::Malicious, &t), 70);
        assert_eq!(normalize_into_band(40, Verdict::Benign, &t), 29);
    }
}
