//! Root engine configuration and file loading.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::advisory::{AdvisoryConfig, ExplanationConfig};
use crate::compaction::CompactionConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::routing::{EscalationConfig, RouterConfig};
use crate::scoring::{ScoringConfig, VerdictThresholds};

/// Immutable configuration shared by every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub router: RouterConfig,
    pub escalation: EscalationConfig,
    pub scoring: ScoringConfig,
    pub thresholds: VerdictThresholds,
    pub compaction: CompactionConfig,
    pub advisory: AdvisoryConfig,
    pub explanation: ExplanationConfig,
}

/// File formats accepted by [`EngineConfig::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "toml" => Ok(ConfigFormat::Toml),
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "json" => Ok(ConfigFormat::Json),
            other => Err(ConfigError::UnsupportedFormat(if other.is_empty() {
                path.display().to_string()
            } else {
                other.to_string()
            })),
        }
    }
}

impl EngineConfig {
    /// Load and validate a configuration file.
    ///
    /// A path that does not exist yields the validated defaults.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "configuration file not found, using defaults");
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        let format = ConfigFormat::from_path(path)?;
        let contents = std::fs::read_to_string(path)?;
        let config = Self::parse(&contents, format)?;
        debug!(path = %path.display(), fingerprint = %config.fingerprint(), "configuration loaded");
        Ok(config)
    }

    /// Parse and validate configuration text.
    pub fn parse(contents: &str, format: ConfigFormat) -> ConfigResult<Self> {
        let config: EngineConfig = match format {
            ConfigFormat::Toml => {
                toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?
            }
            ConfigFormat::Yaml => {
                serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?
            }
            ConfigFormat::Json => {
                serde_json::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Check every cross-field invariant. Any violation is fatal.
    pub fn validate(&self) -> ConfigResult<()> {
        self.router.validate()?;
        self.escalation.validate()?;
        self.scoring.validate()?;
        self.thresholds.validate()?;
        self.compaction.validate()?;
        self.advisory.validate()?;
        self.explanation.validate()?;
        Ok(())
    }

    /// Hex blake3 digest of the canonical JSON form.
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&bytes).to_hex().to_string()
    }
}
