//! Sieve engine configuration.
//!
//! [`EngineConfig`] is a plain value: loaded once, validated, then shared
//! behind an `Arc`. Every weight, threshold, divisor and cap the engine uses
//! lives here with a documented default. Nothing downstream hard-codes a
//! calibration constant.
//!
//! Validation is fatal. A configuration with inverted thresholds, unknown
//! factors, negative or non-finite weights, or zero caps never reaches a
//! request. [`ConfigHandle`] swaps the whole configuration atomically on
//! reload.

pub mod advisory;
pub mod compaction;
pub mod config;
pub mod error;
pub mod handle;
pub mod routing;
pub mod scoring;

pub use advisory::{AdvisoryConfig, AdvisoryMode, ExplanationConfig};
pub use compaction::{CompactionBudget, CompactionConfig, KeywordRule, RelevanceTable};
pub use config::{ConfigFormat, EngineConfig};
pub use error::{ConfigError, ConfigResult};
pub use handle::ConfigHandle;
pub use routing::{EscalationConfig, RouterConfig, RouterWeights, TierConfig};
pub use scoring::{ScoringConfig, VerdictThresholds, FACTOR_NAMES};
