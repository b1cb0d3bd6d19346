//! Signal producer contract and registry.
//!
//! A producer owns exactly one evidence slot. The registry is built once
//! at startup and rejects two producers claiming the same id or slot, so
//! concurrent fan-out never writes the same slot twice.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sieve_types::{EvidenceFragment, EvidenceSlot, ProducerId, RequestId};

use crate::error::{ProducerError, RegistryError};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMeta {
    pub filename: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub size_bytes: u64,
}

/// Message-like input after MIME parsing, owned by the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizedInput {
    pub message_id: Option<String>,
    pub sender: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub headers: Vec<(String, String)>,
    pub body_text: String,
    pub body_html: Option<String>,
    pub urls: Vec<String>,
    pub attachments: Vec<AttachmentMeta>,
}

impl NormalizedInput {
    /// The message id when present, otherwise a digest of the content.
    pub fn request_id(&self) -> RequestId {
        match self.message_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => RequestId::new(id),
            _ => RequestId::derive(&[self.sender.as_str(), self.subject.as_str(), self.body_text.as_str()]),
        }
    }

    /// No headers, subject, body, links or attachments.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
            && self.subject.trim().is_empty()
            && self.body_text.trim().is_empty()
            && self.body_html.as_deref().map_or(true, |h| h.trim().is_empty())
            && self.urls.is_empty()
            && self.attachments.is_empty()
    }
}

/// A pluggable evidence producer.
#[async_trait]
pub trait SignalProducer: Send + Sync {
    fn id(&self) -> ProducerId;

    /// The one slot this producer fills.
    fn slot(&self) -> EvidenceSlot;

    async fn produce(&self, input: &NormalizedInput) -> Result<EvidenceFragment, ProducerError>;
}

/// Immutable set of producers keyed by id.
#[derive(Clone, Default)]
pub struct ProducerRegistry {
    producers: BTreeMap<ProducerId, Arc<dyn SignalProducer>>,
}

impl std::fmt::Debug for ProducerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProducerRegistry")
            .field("producers", &self.producers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ProducerRegistry {
    pub fn builder() -> ProducerRegistryBuilder {
        ProducerRegistryBuilder::default()
    }

    pub fn get(&self, id: &ProducerId) -> Option<&Arc<dyn SignalProducer>> {
        self.producers.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ProducerId> {
        self.producers.keys()
    }

    pub fn len(&self) -> usize {
        self.producers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }
}

#[derive(Default)]
pub struct ProducerRegistryBuilder {
    producers: BTreeMap<ProducerId, Arc<dyn SignalProducer>>,
    slots: BTreeMap<EvidenceSlot, ProducerId>,
}

impl std::fmt::Debug for ProducerRegistryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProducerRegistryBuilder")
            .field("slots", &self.slots)
            .finish()
    }
}

impl ProducerRegistryBuilder {
    pub fn register(mut self, producer: Arc<dyn SignalProducer>) -> Result<Self, RegistryError> {
        let id = producer.id();
        if self.producers.contains_key(&id) {
            return Err(RegistryError::DuplicateId(id));
        }
        let slot = producer.slot();
        if let Some(existing) = self.slots.get(&slot) {
            return Err(RegistryError::SlotClaimed {
                slot,
                existing: existing.clone(),
                rejected: id,
            });
        }
        self.slots.insert(slot, id.clone());
        self.producers.insert(id, producer);
        Ok(self)
    }

    pub fn build(self) -> ProducerRegistry {
        ProducerRegistry {
            producers: self.producers,
        }
    }
}

/// Default producer id for each slot, matching the router's tiers.
pub fn default_producer_for(slot: EvidenceSlot) -> ProducerId {
    let id = match slot {
        EvidenceSlot::HeaderAuth => ProducerId::HEADER_AUTH,
        EvidenceSlot::QuickFeatures => ProducerId::QUICK_FEATURES,
        EvidenceSlot::UrlChain => ProducerId::URL_CHAIN,
        EvidenceSlot::DomainRisk => ProducerId::DOMAIN_RISK,
        EvidenceSlot::ContentIntent => ProducerId::SEMANTIC,
        EvidenceSlot::AttachmentScan => ProducerId::ATTACHMENT_SCAN,
    };
    ProducerId::from(id)
}

/// Replays a pre-computed fragment, e.g. fetch results computed upstream.
pub struct StaticProducer {
    id: ProducerId,
    fragment: EvidenceFragment,
}

impl StaticProducer {
    /// Registered under the default id of the fragment's slot.
    pub fn new(fragment: EvidenceFragment) -> Self {
        Self {
            id: default_producer_for(fragment.slot()),
            fragment,
        }
    }

    pub fn with_id(id: impl Into<ProducerId>, fragment: EvidenceFragment) -> Self {
        Self {
            id: id.into(),
            fragment,
        }
    }
}

#[async_trait]
impl SignalProducer for StaticProducer {
    fn id(&self) -> ProducerId {
        self.id.clone()
    }

    fn slot(&self) -> EvidenceSlot {
        self.fragment.slot()
    }

    async fn produce(&self, _input: &NormalizedInput) -> Result<EvidenceFragment, ProducerError> {
        Ok(self.fragment.clone())
    }
}

/// Registry of static producers, one per fragment.
pub fn static_registry(fragments: Vec<EvidenceFragment>) -> Result<ProducerRegistry, RegistryError> {
    fragments
        .into_iter()
        .try_fold(ProducerRegistry::builder(), |builder, fragment| {
            builder.register(Arc::new(StaticProducer::new(fragment)))
        })
        .map(ProducerRegistryBuilder::build)
}
