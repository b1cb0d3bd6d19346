//! Fusion weights and verdict thresholds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Every factor the fusion engine knows how to extract.
pub const FACTOR_NAMES: [&str; 16] = [
    "spf_fail",
    "dkim_fail",
    "dmarc_fail",
    "reply_to_mismatch",
    "from_domain_mismatch",
    "url_present",
    "url_login_keywords",
    "url_shortener",
    "url_ip_host",
    "url_suspicious_tld",
    "lookalike_domain",
    "semantic_credential_intent",
    "semantic_urgency",
    "collaboration_oauth_intent",
    "attachment_macro",
    "attachment_executable",
];

/// Weights of the risk fusion engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Factor name to weight. Factors left out are not configured and do
    /// not appear in the factor table.
    pub weights: BTreeMap<String, f64>,

    /// Divisor that normalizes the ordinal urgency level into `[0, 1]`.
    pub urgency_divisor: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let weights = [
            ("spf_fail", 12.0),
            ("dkim_fail", 6.0),
            ("dmarc_fail", 12.0),
            ("reply_to_mismatch", 8.0),
            ("from_domain_mismatch", 6.0),
            ("url_present", 4.0),
            ("url_login_keywords", 8.0),
            ("url_shortener", 4.0),
            ("url_ip_host", 6.0),
            ("url_suspicious_tld", 4.0),
            ("lookalike_domain", 10.0),
            ("semantic_credential_intent", 10.0),
            ("semantic_urgency", 4.0),
            ("collaboration_oauth_intent", 10.0),
            ("attachment_macro", 3.0),
            ("attachment_executable", 3.0),
        ]
        .into_iter()
        .map(|(name, weight)| (name.to_string(), weight))
        .collect();

        Self {
            weights,
            urgency_divisor: 3.0,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        for (name, weight) in &self.weights {
            if !FACTOR_NAMES.contains(&name.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "scoring.weights: unknown factor '{name}'"
                )));
            }
            if !weight.is_finite() {
                return Err(ConfigError::invalid(format!(
                    "scoring.weights.{name} must be finite"
                )));
            }
            if *weight < 0.0 {
                return Err(ConfigError::invalid(format!(
                    "scoring.weights.{name} must be non-negative, got {weight}"
                )));
            }
        }
        if !self.urgency_divisor.is_finite() || self.urgency_divisor <= 0.0 {
            return Err(ConfigError::invalid(
                "scoring.urgency_divisor must be finite and positive",
            ));
        }
        Ok(())
    }
}

/// Score bands of the verdict mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerdictThresholds {
    /// Scores at or above this are at least suspicious.
    pub escalate: u8,
    /// Scores at or above this are malicious.
    pub block: u8,
}

impl Default for VerdictThresholds {
    fn default() -> Self {
        Self {
            escalate: 30,
            block: 70,
        }
    }
}

impl VerdictThresholds {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.escalate >= self.block {
            return Err(ConfigError::invalid(format!(
                "thresholds.escalate ({}) must be below thresholds.block ({})",
                self.escalate, self.block
            )));
        }
        if self.block > 100 {
            return Err(ConfigError::invalid("thresholds.block must be at most 100"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_factor() {
        let config = ScoringConfig::default();
        assert_eq!(config.weights.len(), FACTOR_NAMES.len());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_factor_rejected() {
        let mut config = ScoringConfig::default();
        config.weights.insert("sender_reputation".into(), 5.0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("unknown factor"));
    }

    #[test]
    fn negative_and_nan_weights_rejected() {
        let mut config = ScoringConfig::default();
        config.weights.insert("spf_fail".into(), -2.0);
        assert!(config.validate().is_err());
        config.weights.insert("spf_fail".into(), f64::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_urgency_divisor_rejected() {
        let config = ScoringConfig {
            urgency_divisor: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn threshold_ordering_enforced() {
        assert!(VerdictThresholds::default().validate().is_ok());
        let inverted = VerdictThresholds {
            escalate: 70,
            block: 30,
        };
        assert!(inverted.validate().is_err());
        let over = VerdictThresholds {
            escalate: 30,
            block: 101,
        };
        assert!(over.validate().is_err());
    }
}
