use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use sieve_compaction::CompactedContext;

use crate::advisor::{Advisor, AdvisoryOutput};
use crate::error::AdvisoryError;

/// Advisor that replays a fixed response.
///
/// Records every context it was shown so tests can check what crossed
/// the boundary.
pub struct ScriptedAdvisor {
    name: String,
    available: bool,
    response: Result<AdvisoryOutput, AdvisoryError>,
    delay: Option<Duration>,
    seen: Mutex<Vec<CompactedContext>>,
}

impl ScriptedAdvisor {
    pub fn responding(output: AdvisoryOutput) -> Self {
        Self {
            name: "scripted".into(),
            available: true,
            response: Ok(output),
            delay: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: AdvisoryError) -> Self {
        Self {
            response: Err(error),
            ..Self::responding(placeholder())
        }
    }

    /// Reports unavailable; `advise` is never expected to be called.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            response: Err(AdvisoryError::Unavailable),
            ..Self::responding(placeholder())
        }
    }

    /// Sleeps long enough to hit any sane timeout.
    pub fn hanging() -> Self {
        Self::responding(placeholder()).with_delay(Duration::from_secs(3_600))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn last_context(&self) -> Option<CompactedContext> {
        self.seen.lock().last().cloned()
    }
}

fn placeholder() -> AdvisoryOutput {
    AdvisoryOutput {
        proposed_verdict: sieve_types::Verdict::Benign,
        proposed_score: 0,
        confidence: 0.0,
        claims: Vec::new(),
    }
}

#[async_trait]
impl Advisor for ScriptedAdvisor {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn advise(&self, context: &CompactedContext) -> Result<AdvisoryOutput, AdvisoryError> {
        self.seen.lock().push(context.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.response.clone()
    }
}
