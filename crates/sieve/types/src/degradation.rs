//! Non-fatal shortfalls and fallback reasons.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error taxonomy shared by every stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// One evidence source missing or failed. Non-fatal, zero-risk default.
    ProducerDegraded,
    /// A threshold or weight invariant was violated. Fatal at load.
    ConfigurationInvalid,
    AdvisoryUnavailable,
    AdvisoryTimeout,
    AdvisoryInvalid,
    /// Compaction had to drop content. Recorded in provenance.
    BudgetExceeded,
    /// No usable signal at all.
    EmptyInput,
}

/// Machine-readable degradation code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationCode {
    AuthParseError,
    EscalatedContextualSignal,
    ProducerFailed,
    ProducerTimeout,
    ProducerSlotMismatch,
    ProducerCancelled,
    AdvisoryUnavailable,
    EmptyInput,
}

impl DegradationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DegradationCode::AuthParseError => "auth_parse_error",
            DegradationCode::EscalatedContextualSignal => "escalated_contextual_signal",
            DegradationCode::ProducerFailed => "producer_failed",
            DegradationCode::ProducerTimeout => "producer_timeout",
            DegradationCode::ProducerSlotMismatch => "producer_slot_mismatch",
            DegradationCode::ProducerCancelled => "producer_cancelled",
            DegradationCode::AdvisoryUnavailable => "advisory_unavailable",
            DegradationCode::EmptyInput => "empty_input",
        }
    }

    /// Failure class, if the code reports a failure at all.
    /// The escalation marker is informational and has none.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            DegradationCode::AuthParseError
            | DegradationCode::ProducerFailed
            | DegradationCode::ProducerTimeout
            | DegradationCode::ProducerSlotMismatch
            | DegradationCode::ProducerCancelled => Some(FailureKind::ProducerDegraded),
            DegradationCode::AdvisoryUnavailable => Some(FailureKind::AdvisoryUnavailable),
            DegradationCode::EmptyInput => Some(FailureKind::EmptyInput),
            DegradationCode::EscalatedContextualSignal => None,
        }
    }

    /// Whether this code means a planned producer left its slot empty.
    pub fn is_missing_evidence(&self) -> bool {
        matches!(
            self,
            DegradationCode::ProducerFailed
                | DegradationCode::ProducerTimeout
                | DegradationCode::ProducerSlotMismatch
                | DegradationCode::ProducerCancelled
        )
    }
}

impl fmt::Display for DegradationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded non-fatal shortfall. Degradations never feed scoring.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degradation {
    pub code: DegradationCode,
    /// Producer or component that reported it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub detail: String,
}

impl Degradation {
    pub fn new(code: DegradationCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            source: None,
            detail: detail.into(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Why the final result is the deterministic fallback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    AdvisoryUnavailable,
    AdvisoryTimeout,
    AdvisoryInvalid,
    AdvisoryError,
    AdvisoryCancelled,
    Cancelled,
    EmptyInput,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::AdvisoryUnavailable => "advisory_unavailable",
            FallbackReason::AdvisoryTimeout => "advisory_timeout",
            FallbackReason::AdvisoryInvalid => "advisory_invalid",
            FallbackReason::AdvisoryError => "advisory_error",
            FallbackReason::AdvisoryCancelled => "advisory_cancelled",
            FallbackReason::Cancelled => "cancelled",
            FallbackReason::EmptyInput => "empty_input",
        }
    }

    pub fn failure_kind(&self) -> FailureKind {
        match self {
            FallbackReason::AdvisoryUnavailable => FailureKind::AdvisoryUnavailable,
            FallbackReason::AdvisoryTimeout => FailureKind::AdvisoryTimeout,
            FallbackReason::AdvisoryInvalid
            | FallbackReason::AdvisoryError
            | FallbackReason::AdvisoryCancelled => FailureKind::AdvisoryInvalid,
            FallbackReason::Cancelled => FailureKind::ProducerDegraded,
            FallbackReason::EmptyInput => FailureKind::EmptyInput,
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escalation_marker_is_not_a_failure() {
        assert_eq!(DegradationCode::EscalatedContextualSignal.failure_kind(), None);
        assert!(!DegradationCode::EscalatedContextualSignal.is_missing_evidence());
        assert!(!DegradationCode::AuthParseError.is_missing_evidence());
        assert!(DegradationCode::ProducerTimeout.is_missing_evidence());
    }

    #[test]
    fn serde_names_match_as_str() {
        let json = serde_json::to_string(&DegradationCode::EscalatedContextualSignal).unwrap();
        assert_eq!(json, "\"escalated_contextual_signal\"");
        let json = serde_json::to_string(&FallbackReason::AdvisoryTimeout).unwrap();
        assert_eq!(json, format!("\"{}\"", FallbackReason::AdvisoryTimeout.as_str()));
    }

    #[test]
    fn degradation_builder() {
        let d = Degradation::new(DegradationCode::ProducerFailed, "dns error")
            .with_source("url_chain_resolve");
        assert_eq!(d.source.as_deref(), Some("url_chain_resolve"));
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["code"], "producer_failed");
    }
}
