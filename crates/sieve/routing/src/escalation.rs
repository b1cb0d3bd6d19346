//! Contextual escalation.
//!
//! A minimal-depth plan can miss consent-phishing: the preliminary score
//! stays low because nothing in the headers looks wrong. When the content
//! already collected shows a collaboration-style intent or a brand lure from
//! a sender outside the allow-list, the plan widens to the standard tier.
//! Escalation only unlocks producers. It never touches the score.

use sieve_policy::{EscalationConfig, RouterConfig};
use sieve_types::{
    ArtifactKind, Degradation, DegradationCode, EvidenceBundle, Plan, RouteDepth,
};
use tracing::{debug, info};

/// What matched when escalation fires.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EscalationTrigger {
    CollaborationIntent(String),
    BrandKeyword(String),
}

impl EscalationTrigger {
    fn describe(&self) -> String {
        match self {
            EscalationTrigger::CollaborationIntent(intent) => format!("intent={intent}"),
            EscalationTrigger::BrandKeyword(keyword) => format!("brand_keyword={keyword}"),
        }
    }
}

/// Find the first escalation trigger in the evidence collected so far.
pub fn find_trigger(evidence: &EvidenceBundle, config: &EscalationConfig) -> Option<EscalationTrigger> {
    let content = evidence.content_intent()?;

    if config.collaboration_intents.contains(&content.intent) {
        return Some(EscalationTrigger::CollaborationIntent(
            content.intent.as_str().to_string(),
        ));
    }

    let entities: Vec<String> = content
        .brand_entities
        .iter()
        .map(|e| e.to_lowercase())
        .collect();
    let bodies: Vec<String> = content
        .artifacts
        .iter()
        .filter(|a| a.kind == ArtifactKind::Body)
        .map(|a| a.text.to_lowercase())
        .collect();

    config
        .brand_keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .find(|keyword| {
            entities.iter().any(|e| e.contains(keyword.as_str()))
                || bodies.iter().any(|b| b.contains(keyword.as_str()))
        })
        .map(EscalationTrigger::BrandKeyword)
}

/// Widen a minimal plan to the standard tier when context calls for it.
///
/// Fires at most once per plan: an already-escalated plan is returned
/// unchanged.
pub fn maybe_escalate(
    mut plan: Plan,
    evidence: &EvidenceBundle,
    config: &EscalationConfig,
    router: &RouterConfig,
) -> Plan {
    if !config.enabled || plan.escalated || plan.depth != RouteDepth::Minimal {
        return plan;
    }

    if let Some(domain) = evidence.sender_domain() {
        if config.is_allow_listed(domain) {
            debug!(domain, "sender allow-listed, no contextual escalation");
            return plan;
        }
    }

    let Some(trigger) = find_trigger(evidence, config) else {
        return plan;
    };

    let detail = trigger.describe();
    plan.depth = RouteDepth::Standard;
    plan.union_producers(router.tools_for(RouteDepth::Standard).iter());
    plan.escalated = true;
    plan.rationale
        .push(format!("contextual escalation to standard: {detail}"));
    plan.degradations.push(
        Degradation::new(DegradationCode::EscalatedContextualSignal, detail.clone())
            .with_source("escalator"),
    );
    info!(trigger = %detail, "plan escalated to standard");
    plan
}
