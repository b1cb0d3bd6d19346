//! Advisory merge policy and explanation settings.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// When the external advisor is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryMode {
    Always,
    /// Deterministic hash-based sampling on the request id.
    Sampled,
    Never,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisoryConfig {
    pub mode: AdvisoryMode,

    /// Fraction of requests sampled in `sampled` mode, in `[0, 1]`.
    pub sample_rate: f64,

    /// Salt mixed into the sampling hash.
    pub salt: String,

    pub timeout_ms: u64,

    /// Minimum confidence for any promotion.
    pub promote_confidence: f64,

    /// Minimum confidence for a promotion to malicious.
    pub promote_to_malicious_confidence: f64,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            mode: AdvisoryMode::Always,
            sample_rate: 0.5,
            salt: "sieve-advisory".to_string(),
            timeout_ms: 8_000,
            promote_confidence: 0.65,
            promote_to_malicious_confidence: 0.8,
        }
    }
}

fn unit_interval(name: &str, value: f64) -> ConfigResult<()> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::invalid(format!(
            "advisory.{name} must be within [0, 1], got {value}"
        )));
    }
    Ok(())
}

impl AdvisoryConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        unit_interval("sample_rate", self.sample_rate)?;
        unit_interval("promote_confidence", self.promote_confidence)?;
        unit_interval(
            "promote_to_malicious_confidence",
            self.promote_to_malicious_confidence,
        )?;
        if self.promote_confidence > self.promote_to_malicious_confidence {
            return Err(ConfigError::invalid(
                "advisory.promote_confidence must not exceed promote_to_malicious_confidence",
            ));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::invalid("advisory.timeout_ms must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplanationConfig {
    pub max_top_signals: usize,
}

impl Default for ExplanationConfig {
    fn default() -> Self {
        Self { max_top_signals: 5 }
    }
}

impl ExplanationConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_top_signals == 0 {
            return Err(ConfigError::invalid(
                "explanation.max_top_signals must be at least 1",
            ));
        }
        Ok(())
    }
}
