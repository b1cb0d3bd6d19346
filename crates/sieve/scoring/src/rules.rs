//! Hard override rules.
//!
//! Each rule is a conjunction over named evidence fields. All rules are
//! evaluated independently and every match is returned. A match is an
//! override, not an additive contribution: it forces the malicious verdict
//! and floors the score at the block threshold.

use sieve_types::{EvidenceBundle, EvidenceId, EvidenceSlot, FrozenBundle, HardRuleMatch, Intent};
use tracing::debug;

pub const SPF_FAIL_LOOKALIKE_CREDENTIAL: &str = "spf_fail_lookalike_credential_intent";
pub const DMARC_FAIL_REPLY_TO_LOGIN_URL: &str = "dmarc_fail_reply_to_login_url";
pub const MALWARE_INTENT_EXECUTABLE: &str = "malware_intent_executable_attachment";

/// Factors and evidence a rule matched on.
type Matched = (Vec<&'static str>, Vec<EvidenceId>);

pub struct HardRule {
    pub code: &'static str,
    predicate: fn(&EvidenceBundle) -> Option<Matched>,
}

impl HardRule {
    pub fn evaluate(&self, bundle: &EvidenceBundle) -> Option<HardRuleMatch> {
        (self.predicate)(bundle).map(|(factors, evidence)| HardRuleMatch {
            code: self.code.to_string(),
            matched_factors: factors.into_iter().map(String::from).collect(),
            evidence,
        })
    }
}

fn spf_fail_lookalike_credential(bundle: &EvidenceBundle) -> Option<Matched> {
    bundle.header_auth().filter(|a| a.spf.is_fail())?;
    let lookalike = bundle.domain_risk()?.lookalike_index()?;
    bundle
        .content_intent()
        .filter(|c| c.intent == Intent::CredentialTheft)?;
    Some((
        vec!["spf_fail", "lookalike_domain", "semantic_credential_intent"],
        vec![
            EvidenceId::field(EvidenceSlot::HeaderAuth, "spf"),
            EvidenceId::item(EvidenceSlot::DomainRisk, lookalike),
            EvidenceId::slot(EvidenceSlot::ContentIntent),
        ],
    ))
}

fn dmarc_fail_reply_to_login_url(bundle: &EvidenceBundle) -> Option<Matched> {
    bundle.header_auth().filter(|a| a.dmarc.is_fail())?;
    bundle.quick_features().filter(|q| q.reply_to_mismatch)?;
    let login = bundle
        .url_chain()?
        .first_index(|u| u.contains_login_keywords)?;
    Some((
        vec!["dmarc_fail", "reply_to_mismatch", "url_login_keywords"],
        vec![
            EvidenceId::field(EvidenceSlot::HeaderAuth, "dmarc"),
            EvidenceId::field(EvidenceSlot::QuickFeatures, "reply_to_mismatch"),
            EvidenceId::item(EvidenceSlot::UrlChain, login),
        ],
    ))
}

fn malware_intent_executable(bundle: &EvidenceBundle) -> Option<Matched> {
    bundle
        .content_intent()
        .filter(|c| c.intent == Intent::MalwareDelivery)?;
    let executable = bundle.attachment_scan()?.executable_index()?;
    Some((
        vec!["malware_delivery_intent", "attachment_executable"],
        vec![
            EvidenceId::slot(EvidenceSlot::ContentIntent),
            EvidenceId::item(EvidenceSlot::AttachmentScan, executable),
        ],
    ))
}

/// The fixed rule table.
pub const RULES: [HardRule; 3] = [
    HardRule {
        code: SPF_FAIL_LOOKALIKE_CREDENTIAL,
        predicate: spf_fail_lookalike_credential,
    },
    HardRule {
        code: DMARC_FAIL_REPLY_TO_LOGIN_URL,
        predicate: dmarc_fail_reply_to_login_url,
    },
    HardRule {
        code: MALWARE_INTENT_EXECUTABLE,
        predicate: malware_intent_executable,
    },
];

/// Evaluate every rule against the frozen bundle.
pub fn apply_rules(bundle: &FrozenBundle) -> Vec<HardRuleMatch> {
    let matches: Vec<HardRuleMatch> = RULES.iter().filter_map(|rule| rule.evaluate(bundle)).collect();
    if !matches.is_empty() {
        debug!(
            codes = ?matches.iter().map(|m| m.code.as_str()).collect::<Vec<_>>(),
            "hard rules matched"
        );
    }
    matches
}
