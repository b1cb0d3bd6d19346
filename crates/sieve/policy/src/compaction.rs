//! Compaction budget and relevance table.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::routing::default_brand_keywords;

/// Hard caps on the compacted context. None may ever be exceeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactionBudget {
    pub max_raw_chars: usize,
    pub max_snippets_per_artifact: usize,
    pub max_artifacts: usize,
    pub max_snippet_chars: usize,
    pub max_total_chars: usize,
    pub max_signal_refs: usize,
    pub max_decode_rounds: usize,
    pub max_base64_depth: usize,
}

impl Default for CompactionBudget {
    fn default() -> Self {
        Self {
            max_raw_chars: 20_000,
            max_snippets_per_artifact: 4,
            max_artifacts: 4,
            max_snippet_chars: 280,
            max_total_chars: 2_400,
            max_signal_refs: 24,
            max_decode_rounds: 2,
            max_base64_depth: 1,
        }
    }
}

/// Points added once when any of `terms` occurs in a chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub terms: Vec<String>,
    pub points: u32,
}

impl KeywordRule {
    fn new(terms: &[&str], points: u32) -> Self {
        Self {
            terms: terms.iter().map(|t| t.to_string()).collect(),
            points,
        }
    }
}

/// Phishing-relevance heuristic used to rank chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevanceTable {
    pub keywords: Vec<KeywordRule>,
    /// Points for a chunk that contains a URL.
    pub url_points: u32,
    /// Points per configured brand keyword present.
    pub brand_points: u32,
    pub brand_keywords: Vec<String>,
}

impl Default for RelevanceTable {
    fn default() -> Self {
        Self {
            keywords: vec![
                KeywordRule::new(&["password"], 5),
                KeywordRule::new(&["verify"], 4),
                KeywordRule::new(&["login", "log in", "sign in"], 4),
                KeywordRule::new(&["mfa", "otp"], 3),
                KeywordRule::new(&["invoice", "payment"], 3),
                KeywordRule::new(&["urgent", "immediately"], 2),
            ],
            url_points: 2,
            brand_points: 2,
            brand_keywords: default_brand_keywords(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CompactionConfig {
    pub budget: CompactionBudget,
    pub relevance: RelevanceTable,
}

impl CompactionConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        let b = &self.budget;
        let caps = [
            ("max_raw_chars", b.max_raw_chars),
            ("max_snippets_per_artifact", b.max_snippets_per_artifact),
            ("max_artifacts", b.max_artifacts),
            ("max_snippet_chars", b.max_snippet_chars),
            ("max_total_chars", b.max_total_chars),
            ("max_signal_refs", b.max_signal_refs),
        ];
        for (name, value) in caps {
            if value == 0 {
                return Err(ConfigError::invalid(format!(
                    "compaction.budget.{name} must be positive"
                )));
            }
        }
        if b.max_snippet_chars > b.max_total_chars {
            return Err(ConfigError::invalid(
                "compaction.budget.max_snippet_chars must not exceed max_total_chars",
            ));
        }
        if self
            .relevance
            .keywords
            .iter()
            .any(|rule| rule.terms.iter().any(|t| t.trim().is_empty()))
        {
            return Err(ConfigError::invalid(
                "compaction.relevance.keywords must not contain empty terms",
            ));
        }
        Ok(())
    }
}
