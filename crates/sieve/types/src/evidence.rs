//! Per-request evidence bundle.
//!
//! The bundle owns one write-once slot per signal category. Producers never
//! touch the bundle directly: they return owned [`EvidenceFragment`]s and the
//! orchestrator applies them after each tier barrier. Once every tier has
//! run, the bundle is frozen into an `Arc`-backed [`FrozenBundle`] that the
//! deciders read.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{BundleError, BundleResult};
use crate::fragment::{
    AttachmentFindings, AuthResult, ContentIntent, DomainFindings, EvidenceFragment,
    QuickFeatures, TextArtifact, UrlFindings,
};
use crate::ids::EvidenceId;

/// Signal category owned by exactly one producer per request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSlot {
    HeaderAuth,
    QuickFeatures,
    UrlChain,
    DomainRisk,
    ContentIntent,
    AttachmentScan,
}

impl EvidenceSlot {
    pub const ALL: [EvidenceSlot; 6] = [
        EvidenceSlot::HeaderAuth,
        EvidenceSlot::QuickFeatures,
        EvidenceSlot::UrlChain,
        EvidenceSlot::DomainRisk,
        EvidenceSlot::ContentIntent,
        EvidenceSlot::AttachmentScan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceSlot::HeaderAuth => "header_auth",
            EvidenceSlot::QuickFeatures => "quick_features",
            EvidenceSlot::UrlChain => "url_chain",
            EvidenceSlot::DomainRisk => "domain_risk",
            EvidenceSlot::ContentIntent => "content_intent",
            EvidenceSlot::AttachmentScan => "attachment_scan",
        }
    }
}

impl fmt::Display for EvidenceSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable, write-once evidence container for one request.
///
/// `None` means "not collected". It never means zero risk, although fusion
/// scores an absent slot as 0.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceBundle {
    header_auth: Option<AuthResult>,
    quick_features: Option<QuickFeatures>,
    url_chain: Option<UrlFindings>,
    domain_risk: Option<DomainFindings>,
    content_intent: Option<ContentIntent>,
    attachment_scan: Option<AttachmentFindings>,
}

fn write_once<T>(slot: &mut Option<T>, name: EvidenceSlot, value: T) -> BundleResult<()> {
    if slot.is_some() {
        return Err(BundleError::SlotAlreadyWritten(name));
    }
    *slot = Some(value);
    Ok(())
}

impl EvidenceBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a fragment into its slot. Fails if the slot is already filled.
    pub fn insert(&mut self, fragment: EvidenceFragment) -> BundleResult<()> {
        let slot = fragment.slot();
        match fragment {
            EvidenceFragment::HeaderAuth(v) => write_once(&mut self.header_auth, slot, v),
            EvidenceFragment::QuickFeatures(v) => write_once(&mut self.quick_features, slot, v),
            EvidenceFragment::UrlChain(v) => write_once(&mut self.url_chain, slot, v),
            EvidenceFragment::DomainRisk(v) => write_once(&mut self.domain_risk, slot, v),
            EvidenceFragment::ContentIntent(v) => write_once(&mut self.content_intent, slot, v),
            EvidenceFragment::AttachmentScan(v) => write_once(&mut self.attachment_scan, slot, v),
        }
    }

    /// Write a fragment on behalf of a producer that declared `expected`.
    pub fn insert_for(&mut self, expected: EvidenceSlot, fragment: EvidenceFragment) -> BundleResult<()> {
        let actual = fragment.slot();
        if actual != expected {
            return Err(BundleError::SlotMismatch { expected, actual });
        }
        self.insert(fragment)
    }

    pub fn is_filled(&self, slot: EvidenceSlot) -> bool {
        match slot {
            EvidenceSlot::HeaderAuth => self.header_auth.is_some(),
            EvidenceSlot::QuickFeatures => self.quick_features.is_some(),
            EvidenceSlot::UrlChain => self.url_chain.is_some(),
            EvidenceSlot::DomainRisk => self.domain_risk.is_some(),
            EvidenceSlot::ContentIntent => self.content_intent.is_some(),
            EvidenceSlot::AttachmentScan => self.attachment_scan.is_some(),
        }
    }

    pub fn is_empty(&self) -> bool {
        EvidenceSlot::ALL.iter().all(|slot| !self.is_filled(*slot))
    }

    pub fn filled_slots(&self) -> Vec<EvidenceSlot> {
        EvidenceSlot::ALL
            .into_iter()
            .filter(|slot| self.is_filled(*slot))
            .collect()
    }

    pub fn header_auth(&self) -> Option<&AuthResult> {
        self.header_auth.as_ref()
    }

    pub fn quick_features(&self) -> Option<&QuickFeatures> {
        self.quick_features.as_ref()
    }

    pub fn url_chain(&self) -> Option<&UrlFindings> {
        self.url_chain.as_ref()
    }

    pub fn domain_risk(&self) -> Option<&DomainFindings> {
        self.domain_risk.as_ref()
    }

    pub fn content_intent(&self) -> Option<&ContentIntent> {
        self.content_intent.as_ref()
    }

    pub fn attachment_scan(&self) -> Option<&AttachmentFindings> {
        self.attachment_scan.as_ref()
    }

    pub fn sender_domain(&self) -> Option<&str> {
        self.quick_features
            .as_ref()
            .and_then(|q| q.sender_domain.as_deref())
            .filter(|d| !d.trim().is_empty())
    }

    /// All text artifacts in slot order: body, attachments, fetched pages.
    pub fn artifacts(&self) -> Vec<&TextArtifact> {
        let mut out = Vec::new();
        if let Some(content) = &self.content_intent {
            out.extend(content.artifacts.iter());
        }
        if let Some(attachments) = &self.attachment_scan {
            out.extend(attachments.artifacts.iter());
        }
        if let Some(urls) = &self.url_chain {
            out.extend(urls.artifacts.iter());
        }
        out
    }

    /// Every evidence identifier the bundle currently exposes, in stable order.
    pub fn evidence_ids(&self) -> Vec<EvidenceId> {
        self.describe().into_iter().map(|(id, _)| id).collect()
    }

    pub fn contains_evidence(&self, id: &EvidenceId) -> bool {
        self.evidence_ids().iter().any(|known| known == id)
    }

    /// One-line summaries keyed by evidence identifier, in stable order.
    ///
    /// Summaries are unredacted; the compactor redacts them before they
    /// leave the deterministic core.
    pub fn describe(&self) -> Vec<(EvidenceId, String)> {
        let mut out = Vec::new();

        if let Some(auth) = &self.header_auth {
            let slot = EvidenceSlot::HeaderAuth;
            out.push((
                EvidenceId::slot(slot),
                format!(
                    "spf={} dkim={} dmarc={} aligned={}",
                    auth.spf.as_str(),
                    auth.dkim.as_str(),
                    auth.dmarc.as_str(),
                    auth.aligned
                ),
            ));
            out.push((EvidenceId::field(slot, "spf"), format!("spf={}", auth.spf.as_str())));
            out.push((EvidenceId::field(slot, "dkim"), format!("dkim={}", auth.dkim.as_str())));
            out.push((EvidenceId::field(slot, "dmarc"), format!("dmarc={}", auth.dmarc.as_str())));
        }

        if let Some(quick) = &self.quick_features {
            let slot = EvidenceSlot::QuickFeatures;
            let flags = quick.set_flags();
            out.push((
                EvidenceId::slot(slot),
                format!("flags=[{}] subject_hits={}", flags.join(","), quick.subject_hits()),
            ));
            for flag in flags {
                out.push((EvidenceId::field(slot, flag), format!("{flag}=true")));
            }
        }

        if let Some(urls) = &self.url_chain {
            for (i, item) in urls.items.iter().enumerate() {
                out.push((
                    EvidenceId::item(EvidenceSlot::UrlChain, i),
                    format!(
                        "url={} final_domain={} ip_host={} shortener={} suspicious_tld={} login_keywords={}",
                        item.url,
                        item.final_domain,
                        item.has_ip,
                        item.shortener,
                        item.suspicious_tld,
                        item.contains_login_keywords
                    ),
                ));
            }
        }

        if let Some(domains) = &self.domain_risk {
            for (i, item) in domains.items.iter().enumerate() {
                let age = item
                    .age_days
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                out.push((
                    EvidenceId::item(EvidenceSlot::DomainRisk, i),
                    format!(
                        "domain={} brand_distance={} homoglyph={} age_days={} flags=[{}]",
                        item.domain,
                        item.edit_distance_to_brand,
                        item.homoglyph_suspected,
                        age,
                        item.risk_flags.join(",")
                    ),
                ));
            }
        }

        if let Some(content) = &self.content_intent {
            out.push((
                EvidenceId::slot(EvidenceSlot::ContentIntent),
                format!(
                    "intent={} urgency={} brands=[{}] actions=[{}]",
                    content.intent,
                    content.urgency,
                    content.brand_entities.join(","),
                    content.requested_actions.join(",")
                ),
            ));
        }

        if let Some(attachments) = &self.attachment_scan {
            for (i, item) in attachments.items.iter().enumerate() {
                out.push((
                    EvidenceId::item(EvidenceSlot::AttachmentScan, i),
                    format!(
                        "file={} macro={} executable={} flags=[{}]",
                        item.filename,
                        tri_state(item.has_macro),
                        tri_state(item.is_executable),
                        item.flags.join(",")
                    ),
                ));
            }
        }

        for artifact in self.artifacts() {
            out.push((
                EvidenceId::artifact(&artifact.id),
                format!(
                    "artifact kind={} chars={}",
                    artifact.kind.as_str(),
                    artifact.text.chars().count()
                ),
            ));
        }

        out
    }

    pub fn freeze(self) -> FrozenBundle {
        FrozenBundle(Arc::new(self))
    }
}

fn tri_state(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "true",
        Some(false) => "false",
        None => "unknown",
    }
}

/// Read-only, cheaply clonable view of a completed bundle.
#[derive(Clone, Debug, PartialEq)]
pub struct FrozenBundle(Arc<EvidenceBundle>);

impl FrozenBundle {
    /// Hex blake3 digest of the canonical JSON form.
    pub fn content_hash(&self) -> String {
        let bytes = serde_json::to_vec(self.0.as_ref()).unwrap_or_default();
        blake3::hash(&bytes).to_hex().to_string()
    }

    pub fn into_inner(self) -> Arc<EvidenceBundle> {
        self.0
    }
}

impl Deref for FrozenBundle {
    type Target = EvidenceBundle;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Serialize for FrozenBundle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FrozenBundle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        EvidenceBundle::deserialize(deserializer).map(EvidenceBundle::freeze)
    }
}
