//! Weighted multi-source risk fusion.
//!
//! Each configured factor maps to one extraction function over the frozen
//! bundle returning a value in `[0, 1]`. Absent slots extract as 0; the
//! factor still appears in the factor table so its cardinality never varies
//! between requests.

use serde::{Deserialize, Serialize};
use sieve_policy::ScoringConfig;
use sieve_types::{EvidenceBundle, EvidenceId, EvidenceSlot, FactorContribution, FrozenBundle, Intent};
use tracing::debug;

/// Result of fusing one bundle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FusionOutcome {
    /// `clamp(round(sum of contributions), 0, 100)`.
    pub score: u8,
    /// Non-zero contributions, contribution descending then name ascending.
    pub breakdown: Vec<FactorContribution>,
    /// Every configured factor, in configuration order, including zeros.
    pub factors: Vec<FactorContribution>,
}

impl FusionOutcome {
    pub fn contribution_of(&self, factor: &str) -> f64 {
        self.factors
            .iter()
            .find(|f| f.factor == factor)
            .map(|f| f.contribution)
            .unwrap_or(0.0)
    }
}

type Extracted = (f64, Option<EvidenceId>);

fn flag(on: bool, evidence: EvidenceId) -> Extracted {
    if on {
        (1.0, Some(evidence))
    } else {
        (0.0, None)
    }
}

fn first_item(slot: EvidenceSlot, index: Option<usize>) -> Extracted {
    match index {
        Some(i) => (1.0, Some(EvidenceId::item(slot, i))),
        None => (0.0, None),
    }
}

fn auth_factor(bundle: &EvidenceBundle, field: &str) -> Extracted {
    let Some(auth) = bundle.header_auth() else {
        return (0.0, None);
    };
    let status = match field {
        "spf" => auth.spf,
        "dkim" => auth.dkim,
        _ => auth.dmarc,
    };
    flag(status.is_fail(), EvidenceId::field(EvidenceSlot::HeaderAuth, field))
}

fn quick_factor(bundle: &EvidenceBundle, field: &str, on: impl Fn(&sieve_types::QuickFeatures) -> bool) -> Extracted {
    match bundle.quick_features() {
        Some(quick) => flag(on(quick), EvidenceId::field(EvidenceSlot::QuickFeatures, field)),
        None => (0.0, None),
    }
}

fn url_factor(bundle: &EvidenceBundle, pick: impl Fn(&sieve_types::UrlFinding) -> bool) -> Extracted {
    let index = bundle.url_chain().and_then(|urls| urls.first_index(pick));
    first_item(EvidenceSlot::UrlChain, index)
}

fn intent_factor(bundle: &EvidenceBundle, matches: impl Fn(&Intent) -> bool) -> Extracted {
    match bundle.content_intent() {
        Some(content) => flag(matches(&content.intent), EvidenceId::slot(EvidenceSlot::ContentIntent)),
        None => (0.0, None),
    }
}

/// Value and evidence of one named factor.
///
/// `collaboration` is the consent-style intent set escalation also reads.
pub fn extract(
    factor: &str,
    bundle: &EvidenceBundle,
    config: &ScoringConfig,
    collaboration: &[Intent],
) -> Extracted {
    match factor {
        "spf_fail" => auth_factor(bundle, "spf"),
        "dkim_fail" => auth_factor(bundle, "dkim"),
        "dmarc_fail" => auth_factor(bundle, "dmarc"),
        "reply_to_mismatch" => quick_factor(bundle, factor, |q| q.reply_to_mismatch),
        "from_domain_mismatch" => quick_factor(bundle, factor, |q| q.from_domain_mismatch),
        "url_present" => {
            let quick = quick_factor(bundle, "has_urls", |q| q.has_urls);
            if quick.0 > 0.0 {
                quick
            } else {
                url_factor(bundle, |_| true)
            }
        }
        "url_login_keywords" => url_factor(bundle, |u| u.contains_login_keywords),
        "url_shortener" => url_factor(bundle, |u| u.shortener),
        "url_ip_host" => url_factor(bundle, |u| u.has_ip),
        "url_suspicious_tld" => url_factor(bundle, |u| u.suspicious_tld),
        "lookalike_domain" => first_item(
            EvidenceSlot::DomainRisk,
            bundle.domain_risk().and_then(|d| d.lookalike_index()),
        ),
        "semantic_credential_intent" => intent_factor(bundle, |i| *i == Intent::CredentialTheft),
        "semantic_urgency" => match bundle.content_intent() {
            Some(content) if content.urgency > 0 => {
                let value = (f64::from(content.urgency) / config.urgency_divisor).min(1.0);
                (value, Some(EvidenceId::slot(EvidenceSlot::ContentIntent)))
            }
            _ => (0.0, None),
        },
        "collaboration_oauth_intent" => intent_factor(bundle, |i| collaboration.contains(i)),
        "attachment_macro" => first_item(
            EvidenceSlot::AttachmentScan,
            bundle.attachment_scan().and_then(|a| a.macro_index()),
        ),
        "attachment_executable" => first_item(
            EvidenceSlot::AttachmentScan,
            bundle.attachment_scan().and_then(|a| a.executable_index()),
        ),
        _ => (0.0, None),
    }
}

/// Fuse a frozen bundle into a bounded score and a sorted breakdown.
///
/// `collaboration` is the intent set that scores `collaboration_oauth_intent`.
pub fn fuse(bundle: &FrozenBundle, config: &ScoringConfig, collaboration: &[Intent]) -> FusionOutcome {
    let factors: Vec<FactorContribution> = config
        .weights
        .iter()
        .map(|(name, weight)| {
            let (value, evidence) = extract(name, bundle, config, collaboration);
            let value = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };
            FactorContribution::new(name.clone(), value, *weight, evidence)
        })
        .collect();

    let mut breakdown: Vec<FactorContribution> =
        factors.iter().filter(|f| f.is_nonzero()).cloned().collect();
    breakdown.sort_by(FactorContribution::breakdown_order);

    let total: f64 = factors.iter().map(|f| f.contribution).sum();
    let score = if total.is_finite() {
        total.round().clamp(0.0, 100.0) as u8
    } else {
        0
    };

    debug!(score, nonzero = breakdown.len(), factors = factors.len(), "fusion complete");

    FusionOutcome {
        score,
        breakdown,
        factors,
    }
}
