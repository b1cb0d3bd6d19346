//! Cost-sensitive routing under partial information.
//!
//! The router sees only the quick features and the header authentication
//! result. It sums a bounded preliminary score, picks a depth band, and
//! emits the union of every producer tier up to that depth.

use serde::{Deserialize, Serialize};
use sieve_policy::{RouterConfig, RouterWeights};
use sieve_types::{
    AuthResult, Degradation, DegradationCode, Plan, QuickFeatures, RouteDepth,
};
use tracing::debug;

/// What the router knows about header authentication.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum AuthObservation {
    Parsed(AuthResult),
    /// The producer ran but its result could not be interpreted.
    Unparseable(String),
    Missing,
}

impl AuthObservation {
    pub fn parsed(&self) -> Option<&AuthResult> {
        match self {
            AuthObservation::Parsed(result) => Some(result),
            _ => None,
        }
    }
}

impl From<Option<&AuthResult>> for AuthObservation {
    fn from(value: Option<&AuthResult>) -> Self {
        match value {
            Some(result) => AuthObservation::Parsed(result.clone()),
            None => AuthObservation::Missing,
        }
    }
}

/// One non-zero term of the preliminary score.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoreTerm {
    pub name: &'static str,
    pub points: f64,
}

/// Preliminary score in `[0, 100]` plus its non-zero terms in table order.
pub fn preliminary_score(
    quick: Option<&QuickFeatures>,
    auth: &AuthObservation,
    weights: &RouterWeights,
) -> (u8, Vec<ScoreTerm>) {
    let defaults = QuickFeatures::default();
    let quick = quick.unwrap_or(&defaults);
    let hits = quick.subject_hits().min(weights.subject_keyword_cap);

    let mut terms = Vec::new();
    let mut push = |name: &'static str, on: bool, points: f64| {
        if on && points > 0.0 {
            terms.push(ScoreTerm { name, points });
        }
    };

    push("reply_to_mismatch", quick.reply_to_mismatch, weights.reply_to_mismatch);
    push("from_domain_mismatch", quick.from_domain_mismatch, weights.from_domain_mismatch);
    push("has_urls", quick.has_urls, weights.has_urls);
    push("subject_keyword", hits > 0, weights.subject_keyword * f64::from(hits));
    if let Some(result) = auth.parsed() {
        push("spf_fail", result.spf.is_fail(), weights.spf_fail);
        push("dkim_fail", result.dkim.is_fail(), weights.dkim_fail);
        push("dmarc_fail", result.dmarc.is_fail(), weights.dmarc_fail);
    }

    let total: f64 = terms.iter().map(|t| t.points).sum();
    let score = total.round().clamp(0.0, 100.0) as u8;
    (score, terms)
}

/// Depth band for a preliminary score.
pub fn select_depth(score: u8, config: &RouterConfig) -> RouteDepth {
    if score < config.t_fast {
        RouteDepth::Minimal
    } else if score >= config.t_deep {
        RouteDepth::Deep
    } else {
        RouteDepth::Standard
    }
}

/// Build the plan for one request.
pub fn route(
    quick: Option<&QuickFeatures>,
    auth: &AuthObservation,
    config: &RouterConfig,
) -> Plan {
    let (score, terms) = preliminary_score(quick, auth, &config.weights);
    let depth = select_depth(score, config);

    let mut rationale = vec![format!(
        "preliminary_score={score} -> {} (t_fast={}, t_deep={})",
        depth, config.t_fast, config.t_deep
    )];
    rationale.extend(terms.iter().map(|t| format!("{} +{}", t.name, t.points)));

    let mut degradations = Vec::new();
    if quick.is_none() {
        rationale.push("quick_features missing, least-risky defaults used".to_string());
    }
    if let AuthObservation::Unparseable(reason) = auth {
        degradations.push(
            Degradation::new(DegradationCode::AuthParseError, reason.clone())
                .with_source("router"),
        );
    }

    debug!(score, depth = %depth, terms = terms.len(), "route selected");

    Plan {
        depth,
        producers: config.tools_for(depth),
        rationale,
        fallback: config.fallback,
        preliminary_score: score,
        budget_ms: config.budget_ms,
        producer_timeout_ms: config.producer_timeout_ms,
        degradations,
        escalated: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sieve_types::AuthStatus;

    fn failing_auth() -> AuthObservation {
        AuthObservation::Parsed(AuthResult {
            spf: AuthStatus::Fail,
            dkim: AuthStatus::Fail,
            dmarc: AuthStatus::Fail,
            aligned: false,
            anomalies: vec![],
        })
    }

    #[test]
    fn no_signals_routes_minimal() {
        let plan = route(None, &AuthObservation::Missing, &RouterConfig::default());
        assert_eq!(plan.depth, RouteDepth::Minimal);
        assert_eq!(plan.preliminary_score, 0);
        assert_eq!(plan.producers.len(), 2);
        assert!(plan.degradations.is_empty());
        assert!(!plan.escalated);
    }

    #[test]
    fn mid_score_routes_standard() {
        let quick = QuickFeatures {
            reply_to_mismatch: true,
            has_urls: true,
            ..Default::default()
        };
        let plan = route(Some(&quick), &AuthObservation::Missing, &RouterConfig::default());
        assert_eq!(plan.preliminary_score, 30);
        assert_eq!(plan.depth, RouteDepth::Standard);
        assert_eq!(plan.producers.len(), 3);
    }

    #[test]
    fn auth_failures_push_to_deep() {
        let quick = QuickFeatures {
            reply_to_mismatch: true,
            ..Default::default()
        };
        let plan = route(Some(&quick), &failing_auth(), &RouterConfig::default());
        // 20 + 12 + 6 + 15
        assert_eq!(plan.preliminary_score, 53);
        assert_eq!(plan.depth, RouteDepth::Standard);

        let quick = QuickFeatures {
            reply_to_mismatch: true,
            from_domain_mismatch: true,
            ..Default::default()
        };
        let plan = route(Some(&quick), &failing_auth(), &RouterConfig::default());
        assert_eq!(plan.depth, RouteDepth::Deep);
        assert_eq!(plan.producers.len(), 5);
    }

    #[test]
    fn subject_hits_are_capped() {
        let quick = QuickFeatures {
            subject_keyword_hits: 10,
            ..Default::default()
        };
        let (score, _) = preliminary_score(
            Some(&quick),
            &AuthObservation::Missing,
            &RouterWeights::default(),
        );
        assert_eq!(score, 24);
    }

    #[test]
    fn score_is_clamped_to_100() {
        let weights = RouterWeights {
            reply_to_mismatch: 90.0,
            from_domain_mismatch: 90.0,
            ..Default::default()
        };
        let quick = QuickFeatures {
            reply_to_mismatch: true,
            from_domain_mismatch: true,
            ..Default::default()
        };
        let (score, _) = preliminary_score(Some(&quick), &AuthObservation::Missing, &weights);
        assert_eq!(score, 100);
    }

    #[test]
    fn unparseable_auth_degrades_without_weight() {
        let plan = route(
            None,
            &AuthObservation::Unparseable("garbled Authentication-Results".into()),
            &RouterConfig::default(),
        );
        assert_eq!(plan.preliminary_score, 0);
        assert!(plan.has_degradation(DegradationCode::AuthParseError));
    }

    #[test]
    fn plan_carries_budget_metadata() {
        let plan = route(None, &AuthObservation::Missing, &RouterConfig::default());
        assert_eq!(plan.budget_ms, 1500);
        assert_eq!(plan.producer_timeout_ms, 2000);
        assert_eq!(plan.fallback, RouteDepth::Standard);
    }
}
