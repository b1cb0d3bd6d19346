//! Atomic configuration reload.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::config::EngineConfig;
use crate::error::ConfigResult;

/// Process-wide holder of the current configuration.
///
/// Readers take an `Arc` snapshot per request. Reload validates the new
/// configuration first and then swaps the whole object; fields are never
/// mutated in place.
#[derive(Debug)]
pub struct ConfigHandle {
    current: RwLock<Arc<EngineConfig>>,
}

impl ConfigHandle {
    pub fn new(config: EngineConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            current: RwLock::new(Arc::new(config)),
        })
    }

    pub fn snapshot(&self) -> Arc<EngineConfig> {
        Arc::clone(&self.current.read())
    }

    /// Replace the configuration. On error the previous one stays active.
    pub fn replace(&self, config: EngineConfig) -> ConfigResult<()> {
        config.validate()?;
        let fingerprint = config.fingerprint();
        *self.current.write() = Arc::new(config);
        info!(fingerprint = %fingerprint, "configuration swapped");
        Ok(())
    }

    pub fn reload_from(&self, path: &Path) -> ConfigResult<()> {
        let config = EngineConfig::load(path)?;
        self.replace(config)
    }
}
