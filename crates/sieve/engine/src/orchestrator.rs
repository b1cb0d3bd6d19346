//! Request orchestration.
//!
//! One assessment runs these stages in order:
//!
//! 1. quick pass: header authentication and quick features, concurrently
//! 2. route, then contextual escalation
//! 3. remaining planned producers, concurrently, each under a timeout
//! 4. freeze the bundle
//! 5. fusion, hard rules, verdict
//! 6. advisory (optional), validation and merge
//! 7. explanation and response
//!
//! Stages 5 to 7 are pure and shared with trace replay.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use sieve_advisory::{settle, skip_reason, Advisor, CallOutcome, Settlement, SkipReason};
use sieve_compaction::{compact, CompactedContext};
use sieve_policy::{ConfigHandle, EngineConfig};
use sieve_routing::{maybe_escalate, route, AuthObservation};
use sieve_scoring::{apply_rules, decide, fuse, Decision, FusionOutcome};
use sieve_types::{
    BundleError, Degradation, DegradationCode, EvidenceBundle, EvidenceFragment, EvidenceSlot, FallbackReason,
    FrozenBundle, HardRuleMatch, Plan, ProducerId, RequestId,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::ProducerError;
use crate::explanation;
use crate::producer::{NormalizedInput, ProducerRegistry};
use crate::response::AssessmentResponse;
use crate::trace::{AdvisoryRecord, DecisionTrace, StepLog};

/// Result of one assessment together with its replayable trace.
#[derive(Clone, Debug)]
pub struct Assessment {
    pub response: AssessmentResponse,
    pub trace: DecisionTrace,
}

/// The triage engine. Cheap to share behind an `Arc`.
pub struct Engine {
    registry: Arc<ProducerRegistry>,
    config: Arc<ConfigHandle>,
    advisor: Option<Arc<dyn Advisor>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry)
            .field("advisor", &self.advisor.as_ref().map(|a| a.name().to_string()))
            .finish()
    }
}

enum RunOutcome {
    Produced(EvidenceFragment),
    Failed(ProducerError),
    TimedOut,
    Cancelled,
    Panicked,
    NotRegistered,
}

struct ProducerRun {
    id: ProducerId,
    slot: Option<EvidenceSlot>,
    outcome: RunOutcome,
}

impl Engine {
    pub fn new(registry: ProducerRegistry, config: Arc<ConfigHandle>) -> Self {
        Self {
            registry: Arc::new(registry),
            config,
            advisor: None,
        }
    }

    pub fn with_advisor(mut self, advisor: Arc<dyn Advisor>) -> Self {
        self.advisor = Some(advisor);
        self
    }

    pub fn config(&self) -> &Arc<ConfigHandle> {
        &self.config
    }

    fn advisor_available(&self) -> bool {
        self.advisor.as_ref().is_some_and(|a| a.is_available())
    }

    /// Assess one input. Never fails: producer and advisor problems end up
    /// as degradations or a fallback reason on the response.
    ///
    /// Dropping the returned future cancels producers still in flight.
    #[instrument(skip(self, input, cancel), fields(request_id = %input.request_id()))]
    pub async fn assess(&self, input: NormalizedInput, cancel: CancellationToken) -> Assessment {
        let cancel = cancel.child_token();
        let _abort_on_drop = cancel.clone().drop_guard();
        let config = self.config.snapshot();
        let request_id = input.request_id();
        let started = Instant::now();
        let mut steps = StepLog::default();
        let empty_input = input.is_empty();
        let input = Arc::new(input);
        let mut bundle = EvidenceBundle::new();
        let mut producer_degradations = Vec::new();

        info!(fingerprint = %config.fingerprint(), empty_input, "assessment started");

        let quick_ids = if empty_input {
            Vec::new()
        } else {
            config.router.quick_pass_tools()
        };
        let quick_timeout = Duration::from_millis(config.router.producer_timeout_ms);
        let runs = self.run_tier(&quick_ids, &input, quick_timeout, &cancel).await;
        let auth_failure = absorb(&mut bundle, runs, &mut producer_degradations);
        steps.record("quick_pass", &quick_ids, format!("filled={:?}", bundle.filled_slots()));

        let auth = match (bundle.header_auth(), auth_failure) {
            (Some(result), _) => AuthObservation::Parsed(result.clone()),
            (None, Some(reason)) => AuthObservation::Unparseable(reason),
            (None, None) => AuthObservation::Missing,
        };
        let plan = route(bundle.quick_features(), &auth, &config.router);
        steps.record(
            "route",
            &auth,
            format!("depth={} preliminary_score={}", plan.depth, plan.preliminary_score),
        );
        let plan = maybe_escalate(plan, &bundle, &config.escalation, &config.router);
        steps.record("escalation", &plan.producers, format!("escalated={}", plan.escalated));

        let remaining: Vec<ProducerId> = if empty_input {
            Vec::new()
        } else {
            plan.producers
                .iter()
                .filter(|p| !quick_ids.contains(p))
                .cloned()
                .collect()
        };
        let budget_left = Duration::from_millis(plan.budget_ms).saturating_sub(started.elapsed());
        let timeout = Duration::from_millis(plan.producer_timeout_ms).min(budget_left);
        let runs = self.run_tier(&remaining, &input, timeout, &cancel).await;
        absorb(&mut bundle, runs, &mut producer_degradations);
        steps.record(
            "producers",
            &remaining,
            format!("degradations={}", producer_degradations.len()),
        );

        let cancelled = cancel.is_cancelled();
        let bundle = bundle.freeze();
        steps.record(
            "freeze",
            &bundle.filled_slots(),
            format!("content_hash={}", bundle.content_hash()),
        );

        let deterministic = Deterministic::compute(&bundle, &config, &mut steps);

        let skip = if cancelled {
            Some(SkipReason::Cancelled)
        } else {
            skip_reason(plan.depth, self.advisor_available(), &request_id, &config.advisory)
        };
        let (advisory, context) = match skip {
            Some(reason) => {
                debug!(reason = reason.as_str(), "advisory skipped");
                (AdvisoryRecord::Skipped { reason }, None)
            }
            None => {
                let context = advisory_context(&bundle, &deterministic, &config);
                let timeout = Duration::from_millis(config.advisory.timeout_ms);
                let outcome = self.call_advisor(&context, timeout, &cancel).await;
                (AdvisoryRecord::Called { outcome }, Some(context))
            }
        };

        let recorded = Recorded {
            request_id: &request_id,
            plan: &plan,
            producer_degradations: &producer_degradations,
            cancelled,
            empty_input,
        };
        let response = conclude(
            &recorded,
            &bundle,
            &deterministic,
            &advisory,
            context.as_ref(),
            &config,
            &mut steps,
        );

        info!(
            verdict = response.verdict.as_str(),
            score = response.score,
            depth = %response.route_depth,
            degradations = response.degradations.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "assessment complete"
        );

        let trace = DecisionTrace {
            trace_id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            request_id,
            config_fingerprint: config.fingerprint(),
            steps: steps.into_steps(),
            bundle,
            plan,
            producer_degradations,
            cancelled,
            empty_input,
            advisory,
            response: response.clone(),
        };
        Assessment { response, trace }
    }

    /// Run producers concurrently. Results come back in `ids` order.
    async fn run_tier(
        &self,
        ids: &[ProducerId],
        input: &Arc<NormalizedInput>,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Vec<ProducerRun> {
        let runs = ids.iter().map(|id| {
            let producer = self.registry.get(id).cloned();
            let input = Arc::clone(input);
            let cancel = cancel.clone();
            let id = id.clone();
            async move {
                let Some(producer) = producer else {
                    return ProducerRun {
                        id,
                        slot: None,
                        outcome: RunOutcome::NotRegistered,
                    };
                };
                let slot = producer.slot();
                let handle = tokio::spawn(async move {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => RunOutcome::Cancelled,
                        result = tokio::time::timeout(timeout, producer.produce(&input)) => match result {
                            Ok(Ok(fragment)) => RunOutcome::Produced(fragment),
                            Ok(Err(error)) => RunOutcome::Failed(error),
                            Err(_) => RunOutcome::TimedOut,
                        },
                    }
                });
                let outcome = match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) if e.is_panic() => RunOutcome::Panicked,
                    Err(e) => RunOutcome::Failed(ProducerError::Failed(e.to_string())),
                };
                ProducerRun {
                    id,
                    slot: Some(slot),
                    outcome,
                }
            }
        });
        join_all(runs).await
    }

    async fn call_advisor(
        &self,
        context: &CompactedContext,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> CallOutcome {
        let Some(advisor) = &self.advisor else {
            return CallOutcome::Unavailable;
        };
        debug!(advisor = advisor.name(), chunks = context.chunk_count(), "advisor invoked");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => CallOutcome::Cancelled,
            result = tokio::time::timeout(timeout, advisor.advise(context)) => match result {
                Ok(result) => CallOutcome::from_result(result),
                Err(_) => CallOutcome::TimedOut,
            },
        }
    }
}

/// Fold producer results into the bundle in plan order.
///
/// Returns the reason header authentication could not be parsed, if the
/// header producer said so.
fn absorb(bundle: &mut EvidenceBundle, runs: Vec<ProducerRun>, degradations: &mut Vec<Degradation>) -> Option<String> {
    let mut auth_failure = None;
    for run in runs {
        let degradation = match run.outcome {
            RunOutcome::Produced(fragment) => {
                let written = match run.slot {
                    Some(slot) => bundle.insert_for(slot, fragment),
                    None => bundle.insert(fragment),
                };
                match written {
                    Ok(()) => None,
                    Err(e @ BundleError::SlotMismatch { .. }) => {
                        Some(Degradation::new(DegradationCode::ProducerSlotMismatch, e.to_string()))
                    }
                    Err(e) => Some(Degradation::new(DegradationCode::ProducerFailed, e.to_string())),
                }
            }
            RunOutcome::Failed(ProducerError::Unparseable(reason)) if run.slot == Some(EvidenceSlot::HeaderAuth) => {
                auth_failure = Some(reason);
                None
            }
            RunOutcome::Failed(error) => Some(Degradation::new(DegradationCode::ProducerFailed, error.to_string())),
            RunOutcome::TimedOut => Some(Degradation::new(DegradationCode::ProducerTimeout, "no result before deadline")),
            RunOutcome::Cancelled => Some(Degradation::new(DegradationCode::ProducerCancelled, "request cancelled")),
            RunOutcome::Panicked => Some(Degradation::new(DegradationCode::ProducerFailed, "producer panicked")),
            RunOutcome::NotRegistered => {
                Some(Degradation::new(DegradationCode::ProducerFailed, "producer not registered"))
            }
        };
        if let Some(degradation) = degradation {
            warn!(
                producer = %run.id,
                code = degradation.code.as_str(),
                detail = %degradation.detail,
                "producer degraded"
            );
            degradations.push(degradation.with_source(run.id.as_str()));
        }
    }
    auth_failure
}

/// Deterministic scoring of a frozen bundle.
pub(crate) struct Deterministic {
    pub fusion: FusionOutcome,
    pub hard: Vec<HardRuleMatch>,
    pub decision: Decision,
}

impl Deterministic {
    pub(crate) fn compute(bundle: &FrozenBundle, config: &EngineConfig, steps: &mut StepLog) -> Self {
        let input_hash = bundle.content_hash();

        let fusion = fuse(bundle, &config.scoring, &config.escalation.collaboration_intents);
        steps.record(
            "fusion",
            &input_hash,
            format!("score={} factors={}", fusion.score, fusion.breakdown.len()),
        );

        let hard = apply_rules(bundle);
        let codes: Vec<&str> = hard.iter().map(|m| m.code.as_str()).collect();
        steps.record("hard_rules", &input_hash, format!("matched={codes:?}"));

        let decision = decide(fusion.score, &hard, &config.thresholds);
        steps.record(
            "verdict",
            &decision,
            format!("{} score={}", decision.verdict, decision.score),
        );
        debug!(
            fused = fusion.score,
            score = decision.score,
            verdict = decision.verdict.as_str(),
            hard_rules = hard.len(),
            "deterministic decision"
        );

        Self { fusion, hard, decision }
    }
}

fn advisory_context(bundle: &FrozenBundle, deterministic: &Deterministic, config: &EngineConfig) -> CompactedContext {
    compact(
        bundle,
        &deterministic.fusion.breakdown,
        deterministic.decision.verdict,
        &config.compaction,
    )
}

/// Non-computed facts about a request, shared by live runs and replay.
pub(crate) struct Recorded<'a> {
    pub request_id: &'a RequestId,
    pub plan: &'a Plan,
    pub producer_degradations: &'a [Degradation],
    pub cancelled: bool,
    pub empty_input: bool,
}

/// Settle the advisory stage and build the response.
///
/// `context` is the compacted context the advisor saw; it is recomputed
/// when absent.
pub(crate) fn conclude(
    recorded: &Recorded<'_>,
    bundle: &FrozenBundle,
    deterministic: &Deterministic,
    advisory: &AdvisoryRecord,
    context: Option<&CompactedContext>,
    config: &EngineConfig,
    steps: &mut StepLog,
) -> AssessmentResponse {
    let mut context_insufficient = false;
    let settlement = match advisory {
        AdvisoryRecord::Skipped { reason } => Settlement::skipped(*reason, &deterministic.decision),
        AdvisoryRecord::Called { outcome } => {
            let recomputed;
            let context = match context {
                Some(context) => context,
                None => {
                    recomputed = advisory_context(bundle, deterministic, config);
                    &recomputed
                }
            };
            context_insufficient = context.evidence_insufficient;
            steps.record(
                "compaction",
                &deterministic.fusion.breakdown,
                format!(
                    "artifacts={} chunks={} chars={}",
                    context.artifacts.len(),
                    context.chunk_count(),
                    context.total_chars
                ),
            );
            settle(
                outcome,
                &deterministic.decision,
                bundle,
                context,
                &config.advisory,
                &config.thresholds,
            )
            .unwrap_or_else(|e| {
                warn!(error = %e, "advisory settlement failed, keeping deterministic result");
                Settlement::rejected(e.to_string(), FallbackReason::AdvisoryError, &deterministic.decision)
            })
        }
    };
    steps.record(
        "advisory",
        advisory,
        format!(
            "state={} verdict={} score={}",
            settlement.state.name(),
            settlement.decision.verdict,
            settlement.decision.score
        ),
    );

    let mut degradations: Vec<Degradation> = recorded
        .plan
        .degradations
        .iter()
        .chain(recorded.producer_degradations)
        .cloned()
        .collect();
    if recorded.empty_input {
        degradations.push(Degradation::new(DegradationCode::EmptyInput, "no headers, body, links or attachments"));
    }
    if settlement.fallback == Some(FallbackReason::AdvisoryUnavailable) {
        degradations.push(
            Degradation::new(DegradationCode::AdvisoryUnavailable, "advisor unavailable").with_source("advisory"),
        );
    }

    let fallback_reason = if recorded.cancelled {
        Some(FallbackReason::Cancelled)
    } else if recorded.empty_input {
        Some(FallbackReason::EmptyInput)
    } else {
        settlement.fallback
    };
    let evidence_insufficient =
        recorded.cancelled || recorded.empty_input || bundle.is_empty() || context_insufficient;

    let Decision { score, verdict } = settlement.decision.clone();
    let explained = explanation::build(
        verdict,
        score,
        &deterministic.fusion,
        &deterministic.hard,
        &settlement,
        &degradations,
        &config.explanation,
    );
    steps.record(
        "explanation",
        &explained.top_signals,
        format!("confidence={}", explained.confidence),
    );

    AssessmentResponse {
        request_id: recorded.request_id.clone(),
        verdict,
        score,
        breakdown: deterministic.fusion.breakdown.clone(),
        hard_rule_matches: deterministic.hard.clone(),
        top_signals: explained.top_signals,
        route_depth: recorded.plan.depth,
        degradations,
        fallback_reason,
        evidence_insufficient,
        advisory: settlement.state,
        recommended_action: explained.recommended_action,
        confidence: explained.confidence,
    }
}
