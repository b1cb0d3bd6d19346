//! Advisor backed by a recorded response file.

use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use sieve_advisory::{Advisor, AdvisoryError, AdvisoryOutput};
use sieve_compaction::CompactedContext;

/// Answers every request with the same recorded output.
///
/// The file is read once; its contents are parsed per call so a malformed
/// recording surfaces as a malformed advisor response.
pub struct FileAdvisor {
    raw: String,
}

impl FileAdvisor {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading advisory response {}", path.display()))?;
        Ok(Self { raw })
    }
}

#[async_trait]
impl Advisor for FileAdvisor {
    fn name(&self) -> &str {
        "file"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn advise(&self, _context: &CompactedContext) -> Result<AdvisoryOutput, AdvisoryError> {
        AdvisoryOutput::parse(&self.raw)
    }
}
