use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sieve_types::{EvidenceFragment, EvidenceSlot, ProducerId};

use crate::error::ProducerError;
use crate::producer::{default_producer_for, NormalizedInput, SignalProducer};

/// What a [`MockProducer`] does when called.
#[derive(Clone, Debug)]
pub enum MockBehavior {
    Produce(EvidenceFragment),
    Fail(ProducerError),
    /// Sleep, then produce.
    Delay(Duration, EvidenceFragment),
    /// Returns a fragment for a different slot than declared.
    WrongSlot(EvidenceFragment),
    Panic,
}

/// Scriptable producer for tests.
pub struct MockProducer {
    id: ProducerId,
    slot: EvidenceSlot,
    behavior: MockBehavior,
    calls: AtomicUsize,
    completed: AtomicUsize,
}

impl MockProducer {
    /// Produces `fragment` under the default id of its slot.
    pub fn producing(fragment: EvidenceFragment) -> Self {
        let slot = fragment.slot();
        Self::new(default_producer_for(slot), slot, MockBehavior::Produce(fragment))
    }

    pub fn failing(slot: EvidenceSlot, error: ProducerError) -> Self {
        Self::new(default_producer_for(slot), slot, MockBehavior::Fail(error))
    }

    pub fn delayed(delay: Duration, fragment: EvidenceFragment) -> Self {
        let slot = fragment.slot();
        Self::new(default_producer_for(slot), slot, MockBehavior::Delay(delay, fragment))
    }

    pub fn new(id: ProducerId, slot: EvidenceSlot, behavior: MockBehavior) -> Self {
        Self {
            id,
            slot,
            behavior,
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls that ran to the end rather than being dropped mid-flight.
    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SignalProducer for MockProducer {
    fn id(&self) -> ProducerId {
        self.id.clone()
    }

    fn slot(&self) -> EvidenceSlot {
        self.slot
    }

    async fn produce(&self, _input: &NormalizedInput) -> Result<EvidenceFragment, ProducerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = match &self.behavior {
            MockBehavior::Produce(fragment) | MockBehavior::WrongSlot(fragment) => Ok(fragment.clone()),
            MockBehavior::Fail(error) => Err(error.clone()),
            MockBehavior::Delay(delay, fragment) => {
                tokio::time::sleep(*delay).await;
                Ok(fragment.clone())
            }
            MockBehavior::Panic => panic!("mock producer {} panicked", self.id),
        };
        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }
}
