//! Evidence files: a normalized input plus pre-computed producer output.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sieve_engine::NormalizedInput;
use sieve_types::EvidenceFragment;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceFile {
    pub input: NormalizedInput,
    /// One fragment per slot; served by static producers.
    pub fragments: Vec<EvidenceFragment>,
}

impl EvidenceFile {
    pub fn parse(contents: &str, yaml: bool) -> anyhow::Result<Self> {
        if yaml {
            Ok(serde_yaml::from_str(contents)?)
        } else {
            Ok(serde_json::from_str(contents)?)
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("reading evidence file {}", path.display()))?;
        let yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        Self::parse(&contents, yaml).with_context(|| format!("parsing evidence file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sieve_types::EvidenceSlot;

    #[test]
    fn parses_json_evidence() {
        let file = EvidenceFile::parse(
            r#"{
                "input": { "sender": "a@example.com", "subject": "Invoice" },
                "fragments": [
                    { "slot": "header_auth", "data": { "spf": "pass", "dkim": "pass", "dmarc": "fail" } },
                    { "slot": "quick_features", "data": { "reply_to_mismatch": true } }
                ]
            }"#,
            false,
        )
        .unwrap();
        assert_eq!(file.input.subject, "Invoice");
        assert_eq!(file.fragments.len(), 2);
        assert_eq!(file.fragments[0].slot(), EvidenceSlot::HeaderAuth);
    }

    #[test]
    fn parses_yaml_evidence() {
        let file = EvidenceFile::parse(
            "input:\n  sender: a@example.com\nfragments:\n  - slot: quick_features\n    data:\n      has_urls: true\n",
            true,
        )
        .unwrap();
        assert_eq!(file.fragments[0].slot(), EvidenceSlot::QuickFeatures);
    }

    #[test]
    fn missing_file_is_reported_with_path() {
        let err = EvidenceFile::load(Path::new("/nonexistent/evidence.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/evidence.json"));
    }
}
