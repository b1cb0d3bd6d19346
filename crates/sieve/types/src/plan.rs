//! Routed investigation plan.

use serde::{Deserialize, Serialize};

use crate::degradation::{Degradation, DegradationCode};
use crate::ids::ProducerId;
use crate::verdict::RouteDepth;

/// Ordered, depth-tagged set of producers to run for one request.
///
/// The router creates a plan once. The contextual escalator may widen it
/// exactly once, before execution starts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub depth: RouteDepth,
    pub producers: Vec<ProducerId>,
    pub rationale: Vec<String>,
    pub fallback: RouteDepth,
    pub preliminary_score: u8,
    pub budget_ms: u64,
    pub producer_timeout_ms: u64,
    #[serde(default)]
    pub degradations: Vec<Degradation>,
    #[serde(default)]
    pub escalated: bool,
}

impl Plan {
    pub fn contains(&self, producer: &ProducerId) -> bool {
        self.producers.iter().any(|p| p == producer)
    }

    /// Append producers not already planned, preserving order.
    pub fn union_producers<'a>(&mut self, extra: impl IntoIterator<Item = &'a ProducerId>) {
        for producer in extra {
            if !self.contains(producer) {
                self.producers.push(producer.clone());
            }
        }
    }

    pub fn has_degradation(&self, code: DegradationCode) -> bool {
        self.degradations.iter().any(|d| d.code == code)
    }
}
