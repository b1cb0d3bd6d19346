//! Router and contextual-escalation configuration.

use serde::{Deserialize, Serialize};
use sieve_types::{Intent, ProducerId, RouteDepth};

use crate::error::{ConfigError, ConfigResult};

/// Configuration for the preliminary-score router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Scores strictly below this route to minimal depth.
    pub t_fast: u8,

    /// Scores at or above this route to deep depth.
    pub t_deep: u8,

    /// Per-signal weights of the preliminary score.
    pub weights: RouterWeights,

    /// Producers per tier. Each tier lists only what it adds to the
    /// cheaper tiers.
    pub tiers: TierConfig,

    /// Producers that run in the quick pass alongside the minimal tier.
    pub quick_pass: Vec<ProducerId>,

    /// Depth recorded as the plan fallback.
    pub fallback: RouteDepth,

    /// Overall latency budget recorded on the plan.
    pub budget_ms: u64,

    /// Per-producer call timeout.
    pub producer_timeout_ms: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            t_fast: 20,
            t_deep: 60,
            weights: RouterWeights::default(),
            tiers: TierConfig::default(),
            quick_pass: vec![ProducerId::from(ProducerId::QUICK_FEATURES)],
            fallback: RouteDepth::Standard,
            budget_ms: 1500,
            producer_timeout_ms: 2000,
        }
    }
}

impl RouterConfig {
    /// Order-preserving, de-duplicated union of every tier up to `depth`.
    pub fn tools_for(&self, depth: RouteDepth) -> Vec<ProducerId> {
        let mut out: Vec<ProducerId> = Vec::new();
        for tier in RouteDepth::ALL.into_iter().filter(|d| *d <= depth) {
            for producer in self.tiers.additions(tier) {
                if !out.contains(producer) {
                    out.push(producer.clone());
                }
            }
        }
        out
    }

    /// Producers of the quick pass: the minimal tier plus `quick_pass`.
    pub fn quick_pass_tools(&self) -> Vec<ProducerId> {
        let mut out = self.tools_for(RouteDepth::Minimal);
        for producer in &self.quick_pass {
            if !out.contains(producer) {
                out.push(producer.clone());
            }
        }
        out
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.t_fast >= self.t_deep {
            return Err(ConfigError::invalid(format!(
                "router.t_fast ({}) must be below router.t_deep ({})",
                self.t_fast, self.t_deep
            )));
        }
        if self.t_deep > 100 {
            return Err(ConfigError::invalid("router.t_deep must be at most 100"));
        }
        self.weights.validate()?;
        if self.tiers.minimal.is_empty() {
            return Err(ConfigError::invalid("router.tiers.minimal must not be empty"));
        }
        if self.budget_ms == 0 || self.producer_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "router.budget_ms and router.producer_timeout_ms must be positive",
            ));
        }
        Ok(())
    }
}

/// Weights of the router's preliminary score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterWeights {
    pub reply_to_mismatch: f64,
    pub from_domain_mismatch: f64,
    pub has_urls: f64,
    /// Points per subject keyword hit.
    pub subject_keyword: f64,
    /// Maximum number of subject hits counted.
    pub subject_keyword_cap: u32,
    pub spf_fail: f64,
    pub dkim_fail: f64,
    pub dmarc_fail: f64,
}

impl Default for RouterWeights {
    fn default() -> Self {
        Self {
            reply_to_mismatch: 20.0,
            from_domain_mismatch: 15.0,
            has_urls: 10.0,
            subject_keyword: 8.0,
            subject_keyword_cap: 3,
            spf_fail: 12.0,
            dkim_fail: 6.0,
            dmarc_fail: 15.0,
        }
    }
}

impl RouterWeights {
    fn named(&self) -> [(&'static str, f64); 7] {
        [
            ("reply_to_mismatch", self.reply_to_mismatch),
            ("from_domain_mismatch", self.from_domain_mismatch),
            ("has_urls", self.has_urls),
            ("subject_keyword", self.subject_keyword),
            ("spf_fail", self.spf_fail),
            ("dkim_fail", self.dkim_fail),
            ("dmarc_fail", self.dmarc_fail),
        ]
    }

    pub fn validate(&self) -> ConfigResult<()> {
        for (name, weight) in self.named() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::invalid(format!(
                    "router.weights.{name} must be finite and non-negative, got {weight}"
                )));
            }
        }
        Ok(())
    }
}

/// Producer additions per depth tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    pub minimal: Vec<ProducerId>,
    pub standard: Vec<ProducerId>,
    pub deep: Vec<ProducerId>,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            minimal: vec![
                ProducerId::from(ProducerId::HEADER_AUTH),
                ProducerId::from(ProducerId::SEMANTIC),
            ],
            standard: vec![ProducerId::from(ProducerId::URL_CHAIN)],
            deep: vec![
                ProducerId::from(ProducerId::DOMAIN_RISK),
                ProducerId::from(ProducerId::ATTACHMENT_SCAN),
            ],
        }
    }
}

impl TierConfig {
    pub fn additions(&self, depth: RouteDepth) -> &[ProducerId] {
        match depth {
            RouteDepth::Minimal => &self.minimal,
            RouteDepth::Standard => &self.standard,
            RouteDepth::Deep => &self.deep,
        }
    }
}

/// Configuration for the contextual escalator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    pub enabled: bool,

    /// Sender domains that never escalate. Subdomains match too.
    pub allow_list: Vec<String>,

    /// Content intents treated as collaboration / consent requests.
    pub collaboration_intents: Vec<Intent>,

    /// Brand keywords matched against brand entities and body text.
    pub brand_keywords: Vec<String>,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allow_list: Vec::new(),
            collaboration_intents: Intent::collaboration_defaults(),
            brand_keywords: default_brand_keywords(),
        }
    }
}

impl EscalationConfig {
    /// Whether `domain` equals an allow-listed domain or is a subdomain of one.
    pub fn is_allow_listed(&self, domain: &str) -> bool {
        let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();
        if domain.is_empty() {
            return false;
        }
        self.allow_list.iter().any(|entry| {
            let entry = entry.trim().trim_end_matches('.').to_ascii_lowercase();
            !entry.is_empty()
                && (domain == entry
                    || domain
                        .strip_suffix(entry.as_str())
                        .is_some_and(|prefix| prefix.ends_with('.')))
        })
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.brand_keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::invalid(
                "escalation.brand_keywords must not contain empty entries",
            ));
        }
        Ok(())
    }
}

pub(crate) fn default_brand_keywords() -> Vec<String> {
    [
        "microsoft",
        "office365",
        "outlook",
        "paypal",
        "google",
        "apple",
        "amazon",
        "dhl",
        "bank",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_nested_supersets() {
        let config = RouterConfig::default();
        let minimal = config.tools_for(RouteDepth::Minimal);
        let standard = config.tools_for(RouteDepth::Standard);
        let deep = config.tools_for(RouteDepth::Deep);
        assert!(minimal.iter().all(|p| standard.contains(p)));
        assert!(standard.iter().all(|p| deep.contains(p)));
        assert_eq!(minimal.len(), 2);
        assert_eq!(standard.len(), 3);
        assert_eq!(deep.len(), 5);
    }

    #[test]
    fn tier_union_dedups_repeated_producers() {
        let mut config = RouterConfig::default();
        config.tiers.standard.push(ProducerId::from(ProducerId::HEADER_AUTH));
        let standard = config.tools_for(RouteDepth::Standard);
        assert_eq!(standard.len(), 3);
        assert_eq!(standard[0].as_str(), ProducerId::HEADER_AUTH);
    }

    #[test]
    fn quick_pass_includes_minimal_tier() {
        let config = RouterConfig::default();
        let ids: Vec<String> = config
            .quick_pass_tools()
            .into_iter()
            .map(|p| p.0)
            .collect();
        assert_eq!(
            ids,
            vec!["header_auth_check", "semantic_extract", "quick_features"]
        );
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let config = RouterConfig {
            t_fast: 60,
            t_deep: 20,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let equal = RouterConfig {
            t_fast: 40,
            t_deep: 40,
            ..Default::default()
        };
        assert!(equal.validate().is_err());
    }

    #[test]
    fn negative_router_weight_rejected() {
        let mut config = RouterConfig::default();
        config.weights.dkim_fail = -1.0;
        assert!(config.validate().is_err());
        config.weights.dkim_fail = f64::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn allow_list_matches_subdomains_case_insensitively() {
        let config = EscalationConfig {
            allow_list: vec!["Example.com".into()],
            ..Default::default()
        };
        assert!(config.is_allow_listed("example.com"));
        assert!(config.is_allow_listed("mail.EXAMPLE.com"));
        assert!(!config.is_allow_listed("badexample.com"));
        assert!(!config.is_allow_listed("example.com.evil.net"));
        assert!(!config.is_allow_listed(""));
    }
}
