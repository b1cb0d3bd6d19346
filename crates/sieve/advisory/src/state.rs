//! Advisory lifecycle.
//!
//! `NotInvoked -> Invoked -> {Validated, Rejected}`. Any other move is an
//! internal error.

use serde::{Deserialize, Serialize};
use sieve_types::FallbackReason;

use crate::error::{AdvisoryError, AdvisoryResult};

/// Why the advisor was not consulted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MinimalDepth,
    ModeNever,
    Unavailable,
    NotSampled,
    /// The request was cancelled before the advisory stage.
    Cancelled,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::MinimalDepth => "minimal_depth",
            SkipReason::ModeNever => "mode_never",
            SkipReason::Unavailable => "unavailable",
            SkipReason::NotSampled => "not_sampled",
            SkipReason::Cancelled => "cancelled",
        }
    }

    /// Only an unavailable advisor is a fallback; the rest are policy.
    pub fn fallback(&self) -> Option<FallbackReason> {
        match self {
            SkipReason::Unavailable => Some(FallbackReason::AdvisoryUnavailable),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AdvisoryState {
    NotInvoked {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        skip_reason: Option<SkipReason>,
    },
    Invoked,
    Validated {
        /// Whether the merge changed the decision.
        applied: bool,
    },
    /// Output failed validation, or the call itself failed.
    Rejected { reason: String },
}

impl Default for AdvisoryState {
    fn default() -> Self {
        AdvisoryState::NotInvoked { skip_reason: None }
    }
}

impl AdvisoryState {
    pub fn skipped(reason: SkipReason) -> Self {
        AdvisoryState::NotInvoked {
            skip_reason: Some(reason),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AdvisoryState::NotInvoked { .. } => "not_invoked",
            AdvisoryState::Invoked => "invoked",
            AdvisoryState::Validated { .. } => "validated",
            AdvisoryState::Rejected { .. } => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AdvisoryState::Validated { .. } | AdvisoryState::Rejected { .. }
        )
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, AdvisoryState::Validated { applied: true })
    }

    fn illegal(&self, to: &'static str) -> AdvisoryError {
        AdvisoryError::InvalidTransition {
            from: self.name(),
            to,
        }
    }

    pub fn invoke(&mut self) -> AdvisoryResult<()> {
        match self {
            AdvisoryState::NotInvoked { skip_reason: None } => {
                *self = AdvisoryState::Invoked;
                Ok(())
            }
            _ => Err(self.illegal("invoked")),
        }
    }

    pub fn validate(&mut self, applied: bool) -> AdvisoryResult<()> {
        match self {
            AdvisoryState::Invoked => {
                *self = AdvisoryState::Validated { applied };
                Ok(())
            }
            _ => Err(self.illegal("validated")),
        }
    }

    pub fn reject(&mut self, reason: impl Into<String>) -> AdvisoryResult<()> {
        match self {
            AdvisoryState::Invoked => {
                *self = AdvisoryState::Rejected {
                    reason: reason.into(),
                };
                Ok(())
            }
            _ => Err(self.illegal("rejected")),
        }
    }
}
