//! Typed evidence fragments written by signal producers.
//!
//! Every fragment belongs to exactly one [`EvidenceSlot`]. Producers return
//! owned fragments; the orchestrator applies them to the bundle after the
//! tier barrier.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::evidence::EvidenceSlot;
use crate::ids::ArtifactId;

// ── Authentication ──────────────────────────────────────────────────────

/// Result of one header authentication mechanism (SPF, DKIM, DMARC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthStatus {
    Pass,
    Fail,
    SoftFail,
    Neutral,
    #[default]
    None,
    TempError,
    PermError,
}

impl AuthStatus {
    pub fn is_fail(&self) -> bool {
        matches!(self, AuthStatus::Fail)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthStatus::Pass => "pass",
            AuthStatus::Fail => "fail",
            AuthStatus::SoftFail => "softfail",
            AuthStatus::Neutral => "neutral",
            AuthStatus::None => "none",
            AuthStatus::TempError => "temperror",
            AuthStatus::PermError => "permerror",
        }
    }
}

/// Parsed header authentication results.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct AuthResult {
    pub spf: AuthStatus,
    pub dkim: AuthStatus,
    pub dmarc: AuthStatus,
    #[serde(default)]
    pub aligned: bool,
    #[serde(default)]
    pub anomalies: Vec<String>,
}

impl AuthResult {
    pub fn all_pass() -> Self {
        Self {
            spf: AuthStatus::Pass,
            dkim: AuthStatus::Pass,
            dmarc: AuthStatus::Pass,
            aligned: true,
            anomalies: Vec::new(),
        }
    }
}

// ── Quick features ──────────────────────────────────────────────────────

/// Cheap deterministic features used by the router.
///
/// Every field defaults to its least-risky value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct QuickFeatures {
    pub from_domain_mismatch: bool,
    pub reply_to_mismatch: bool,
    pub has_urls: bool,
    pub suspicious_subject: bool,
    pub subject_keyword_hits: u32,
    pub sender_domain: Option<String>,
}

impl QuickFeatures {
    /// Subject keyword hits, counting a suspicious subject as at least one.
    pub fn subject_hits(&self) -> u32 {
        if self.suspicious_subject {
            self.subject_keyword_hits.max(1)
        } else {
            self.subject_keyword_hits
        }
    }

    /// Names of the flags that are set, in declaration order.
    pub fn set_flags(&self) -> Vec<&'static str> {
        let mut flags = Vec::new();
        if self.from_domain_mismatch {
            flags.push("from_domain_mismatch");
        }
        if self.reply_to_mismatch {
            flags.push("reply_to_mismatch");
        }
        if self.has_urls {
            flags.push("has_urls");
        }
        if self.subject_hits() > 0 {
            flags.push("suspicious_subject");
        }
        flags
    }
}

// ── URLs and domains ────────────────────────────────────────────────────

/// Lexical and resolution findings for one URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UrlFinding {
    pub url: String,
    pub final_domain: String,
    pub has_ip: bool,
    pub suspicious_tld: bool,
    pub shortener: bool,
    pub contains_login_keywords: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UrlFindings {
    pub items: Vec<UrlFinding>,
    pub errors: Vec<String>,
    /// Pre-fetched page text for resolved URLs.
    pub artifacts: Vec<TextArtifact>,
}

impl UrlFindings {
    pub fn any(&self, predicate: impl Fn(&UrlFinding) -> bool) -> bool {
        self.items.iter().any(predicate)
    }

    pub fn first_index(&self, predicate: impl Fn(&UrlFinding) -> bool) -> Option<usize> {
        self.items.iter().position(predicate)
    }
}

/// Similarity and reputation findings for one domain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DomainRisk {
    pub domain: String,
    pub edit_distance_to_brand: u32,
    pub homoglyph_suspected: bool,
    pub age_days: Option<u32>,
    pub risk_flags: Vec<String>,
}

impl DomainRisk {
    pub fn is_lookalike(&self) -> bool {
        self.homoglyph_suspected || self.risk_flags.iter().any(|f| f == "brand_similarity")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DomainFindings {
    pub items: Vec<DomainRisk>,
}

impl DomainFindings {
    pub fn lookalike_index(&self) -> Option<usize> {
        self.items.iter().position(DomainRisk::is_lookalike)
    }
}

// ── Content intent ──────────────────────────────────────────────────────

/// Intent attributed to the message content by the semantic producer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum Intent {
    CredentialTheft,
    MalwareDelivery,
    PaymentFraud,
    DelegatedAccess,
    PermissionChange,
    AccessReview,
    OauthConsent,
    Benign,
    #[default]
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::CredentialTheft => "credential_theft",
            Intent::MalwareDelivery => "malware_delivery",
            Intent::PaymentFraud => "payment_fraud",
            Intent::DelegatedAccess => "delegated_access",
            Intent::PermissionChange => "permission_change",
            Intent::AccessReview => "access_review",
            Intent::OauthConsent => "oauth_consent",
            Intent::Benign => "benign",
            Intent::Unknown => "unknown",
        }
    }

    /// Collaboration / consent-style intents that ask the recipient to
    /// grant access rather than hand over a password.
    pub fn collaboration_defaults() -> Vec<Intent> {
        vec![
            Intent::DelegatedAccess,
            Intent::PermissionChange,
            Intent::AccessReview,
            Intent::OauthConsent,
        ]
    }
}

impl From<String> for Intent {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "credential_theft" => Intent::CredentialTheft,
            "malware_delivery" => Intent::MalwareDelivery,
            "payment_fraud" => Intent::PaymentFraud,
            "delegated_access" => Intent::DelegatedAccess,
            "permission_change" => Intent::PermissionChange,
            "access_review" => Intent::AccessReview,
            "oauth_consent" => Intent::OauthConsent,
            "benign" => Intent::Benign,
            _ => Intent::Unknown,
        }
    }
}

impl From<Intent> for String {
    fn from(value: Intent) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic signals extracted from the message body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ContentIntent {
    pub intent: Intent,
    /// Ordinal urgency level, normalized by the configured divisor during fusion.
    pub urgency: u32,
    pub brand_entities: Vec<String>,
    pub requested_actions: Vec<String>,
    pub confidence: f64,
    /// Body text artifacts.
    pub artifacts: Vec<TextArtifact>,
}

// ── Attachments ─────────────────────────────────────────────────────────

/// Static metadata scan of one attachment. Contents are never executed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AttachmentFinding {
    pub filename: String,
    pub sha256: String,
    pub has_macro: Option<bool>,
    pub is_executable: Option<bool>,
    pub flags: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AttachmentFindings {
    pub items: Vec<AttachmentFinding>,
    /// Text extracted from attachments.
    pub artifacts: Vec<TextArtifact>,
}

impl AttachmentFindings {
    pub fn executable_index(&self) -> Option<usize> {
        self.items.iter().position(|a| a.is_executable == Some(true))
    }

    pub fn macro_index(&self) -> Option<usize> {
        self.items.iter().position(|a| a.has_macro == Some(true))
    }
}

// ── Text artifacts ──────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Body,
    Attachment,
    FetchedPage,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Body => "body",
            ArtifactKind::Attachment => "attachment",
            ArtifactKind::FetchedPage => "fetched_page",
        }
    }
}

/// Raw text attached to a fragment, consumed only by the compactor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextArtifact {
    pub id: ArtifactId,
    pub kind: ArtifactKind,
    pub text: String,
    /// Whether `text` carries HTML markup to strip.
    #[serde(default)]
    pub markup: bool,
    /// Producer risk hint in `[0, 1]`, used to rank artifacts.
    #[serde(default)]
    pub risk: f64,
}

impl TextArtifact {
    pub fn new(id: impl Into<String>, kind: ArtifactKind, text: impl Into<String>) -> Self {
        Self {
            id: ArtifactId::new(id),
            kind,
            text: text.into(),
            markup: matches!(kind, ArtifactKind::FetchedPage),
            risk: 0.0,
        }
    }

    pub fn with_risk(mut self, risk: f64) -> Self {
        self.risk = if risk.is_finite() { risk.clamp(0.0, 1.0) } else { 0.0 };
        self
    }

    pub fn with_markup(mut self, markup: bool) -> Self {
        self.markup = markup;
        self
    }
}

// ── Fragment envelope ───────────────────────────────────────────────────

/// One producer output, tagged with its slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "slot", content = "data", rename_all = "snake_case")]
pub enum EvidenceFragment {
    HeaderAuth(AuthResult),
    QuickFeatures(QuickFeatures),
    UrlChain(UrlFindings),
    DomainRisk(DomainFindings),
    ContentIntent(ContentIntent),
    AttachmentScan(AttachmentFindings),
}

impl EvidenceFragment {
    pub fn slot(&self) -> EvidenceSlot {
        match self {
            EvidenceFragment::HeaderAuth(_) => EvidenceSlot::HeaderAuth,
            EvidenceFragment::QuickFeatures(_) => EvidenceSlot::QuickFeatures,
            EvidenceFragment::UrlChain(_) => EvidenceSlot::UrlChain,
            EvidenceFragment::DomainRisk(_) => EvidenceSlot::DomainRisk,
            EvidenceFragment::ContentIntent(_) => EvidenceSlot::ContentIntent,
            EvidenceFragment::AttachmentScan(_) => EvidenceSlot::AttachmentScan,
        }
    }
}
