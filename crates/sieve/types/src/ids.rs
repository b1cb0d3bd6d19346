//! Identifier newtypes shared across the pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::evidence::EvidenceSlot;

/// Stable identifier of one assessment request.
///
/// Advisory sampling hashes this value, so it must not change between
/// replays of the same message.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive a request id from message content when the caller has no
    /// message id of its own.
    pub fn derive(parts: &[&str]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"sieve-request-v1:");
        for part in parts {
            hasher.update(part.as_bytes());
            hasher.update(&[0x1f]);
        }
        let hex = hasher.finalize().to_hex();
        Self(format!("req-{}", &hex[..16]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a registered signal producer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProducerId(pub String);

impl ProducerId {
    pub const QUICK_FEATURES: &'static str = "quick_features";
    pub const HEADER_AUTH: &'static str = "header_auth_check";
    pub const SEMANTIC: &'static str = "semantic_extract";
    pub const URL_CHAIN: &'static str = "url_chain_resolve";
    pub const DOMAIN_RISK: &'static str = "domain_risk_assess";
    pub const ATTACHMENT_SCAN: &'static str = "attachment_static_scan";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProducerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProducerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier of a text artifact (message body, attachment text, fetched page).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(pub String);

impl ArtifactId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Addressable piece of evidence inside a bundle.
///
/// Formats:
/// - `<slot>` for a whole slot (`header_auth`)
/// - `<slot>.<field>` for a field (`header_auth.dmarc`)
/// - `<slot>/<index>` for a list item (`url_chain/0`)
/// - `artifact/<artifact_id>` for a text artifact
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceId(pub String);

impl EvidenceId {
    pub fn slot(slot: EvidenceSlot) -> Self {
        Self(slot.as_str().to_string())
    }

    pub fn field(slot: EvidenceSlot, field: &str) -> Self {
        Self(format!("{}.{}", slot.as_str(), field))
    }

    pub fn item(slot: EvidenceSlot, index: usize) -> Self {
        Self(format!("{}/{}", slot.as_str(), index))
    }

    pub fn artifact(id: &ArtifactId) -> Self {
        Self(format!("artifact/{}", id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EvidenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable reference to a compacted chunk: `<artifact_id>@<char offset>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkRef(pub String);

impl ChunkRef {
    pub fn new(artifact: &ArtifactId, offset: usize) -> Self {
        Self(format!("{}@{}", artifact, offset))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChunkRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
