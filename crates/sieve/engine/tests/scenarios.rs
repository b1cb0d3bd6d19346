//! End-to-end assessments over static and scripted producers.

use std::sync::Arc;
use std::time::Duration;

use sieve_advisory::{AdvisoryOutput, AdvisoryState, Claim, ScriptedAdvisor, SkipReason};
use sieve_engine::mocks::MockProducer;
use sieve_engine::*;
use sieve_policy::{AdvisoryMode, ConfigHandle, EngineConfig};
use sieve_types::*;

// ----------------------------------------------------------------------------
// Fixtures
// ----------------------------------------------------------------------------

fn input(sender: &str) -> NormalizedInput {
    NormalizedInput {
        message_id: Some(format!("<{sender}-msg>")),
        sender: sender.into(),
        subject: "Quarterly update".into(),
        body_text: "Please find the notes attached.".into(),
        ..Default::default()
    }
}

fn quick(domain: &str) -> QuickFeatures {
    QuickFeatures {
        sender_domain: Some(domain.into()),
        ..Default::default()
    }
}

fn intent(intent: Intent, body: &str) -> ContentIntent {
    ContentIntent {
        intent,
        confidence: 0.8,
        artifacts: vec![TextArtifact::new("body", ArtifactKind::Body, body)],
        ..Default::default()
    }
}

fn login_urls() -> UrlFindings {
    UrlFindings {
        items: vec![UrlFinding {
            url: "https://login.example-secure.top/verify".into(),
            final_domain: "login.example-secure.top".into(),
            contains_login_keywords: true,
            ..Default::default()
        }],
        errors: vec![],
        artifacts: vec![TextArtifact::new(
            "page",
            ArtifactKind::FetchedPage,
            "<p>Sign in to Microsoft to verify your password</p>",
        )],
    }
}

fn config(edit: impl FnOnce(&mut EngineConfig)) -> Arc<ConfigHandle> {
    let mut config = EngineConfig::default();
    edit(&mut config);
    Arc::new(ConfigHandle::new(config).unwrap())
}

fn engine(fragments: Vec<EvidenceFragment>, config: Arc<ConfigHandle>) -> Engine {
    Engine::new(static_registry(fragments).unwrap(), config)
}

async fn assess(engine: &Engine, input: NormalizedInput) -> Assessment {
    engine.assess(input, CancellationToken::new()).await
}

fn phishing_fragments() -> Vec<EvidenceFragment> {
    vec![
        EvidenceFragment::HeaderAuth(AuthResult {
            dmarc: AuthStatus::Fail,
            ..AuthResult::all_pass()
        }),
        EvidenceFragment::QuickFeatures(QuickFeatures {
            reply_to_mismatch: true,
            has_urls: true,
            ..quick("example-secure.top")
        }),
        EvidenceFragment::ContentIntent(intent(Intent::CredentialTheft, "Verify your password today")),
        EvidenceFragment::UrlChain(login_urls()),
    ]
}

// ----------------------------------------------------------------------------
// Scenarios
// ----------------------------------------------------------------------------

#[tokio::test]
async fn benign_allow_listed_message() {
    let engine = engine(
        vec![
            EvidenceFragment::HeaderAuth(AuthResult::all_pass()),
            EvidenceFragment::QuickFeatures(quick("partner.example")),
            EvidenceFragment::ContentIntent(intent(Intent::Benign, "Notes from the planning meeting")),
        ],
        config(|c| c.escalation.allow_list = vec!["partner.example".into()]),
    );

    let out = assess(&engine, input("ops@partner.example")).await;
    let response = out.response;

    assert_eq!(response.verdict, Verdict::Benign);
    assert!(response.score < 30);
    assert!(response.hard_rule_matches.is_empty());
    assert_eq!(response.route_depth, RouteDepth::Minimal);
    assert_eq!(response.recommended_action, "deliver");
    assert_eq!(
        response.advisory,
        AdvisoryState::NotInvoked {
            skip_reason: Some(SkipReason::MinimalDepth)
        }
    );
    assert!(response.fallback_reason.is_none());
    assert!(!response.evidence_insufficient);
}

#[tokio::test]
async fn dmarc_fail_with_reply_to_and_login_url_is_malicious() {
    let engine = engine(phishing_fragments(), config(|c| c.advisory.mode = AdvisoryMode::Never));

    let out = assess(&engine, input("billing@example-secure.top")).await;
    let response = out.response;

    assert_eq!(response.verdict, Verdict::Malicious);
    assert!(response.score >= 70);
    assert!(response
        .hard_rule_matches
        .iter()
        .any(|m| m.code == "dmarc_fail_reply_to_login_url"));
    assert!(response.top_signals[0].starts_with("hard_rule:dmarc_fail_reply_to_login_url"));
    assert_eq!(response.recommended_action, "block_and_report");
    assert!(out.trace.plan.contains(&ProducerId::from(ProducerId::URL_CHAIN)));
}

#[tokio::test]
async fn consent_request_escalates_without_changing_score() {
    let fragments = vec![
        EvidenceFragment::HeaderAuth(AuthResult::all_pass()),
        EvidenceFragment::QuickFeatures(quick("collab-share.example")),
        EvidenceFragment::ContentIntent(ContentIntent {
            brand_entities: vec!["Microsoft".into()],
            ..intent(Intent::OauthConsent, "Grant Microsoft 365 access to view the shared file")
        }),
        EvidenceFragment::UrlChain(UrlFindings::default()),
    ];

    let escalating = engine(fragments.clone(), config(|c| c.advisory.mode = AdvisoryMode::Never));
    let escalated = assess(&escalating, input("share@collab-share.example")).await;

    let plain = engine(
        fragments,
        config(|c| {
            c.advisory.mode = AdvisoryMode::Never;
            c.escalation.enabled = false;
        }),
    );
    let baseline = assess(&plain, input("share@collab-share.example")).await;

    assert_eq!(escalated.response.route_depth, RouteDepth::Standard);
    assert!(escalated.trace.plan.escalated);
    assert!(escalated
        .response
        .has_degradation(DegradationCode::EscalatedContextualSignal));
    assert_eq!(baseline.response.route_depth, RouteDepth::Minimal);
    assert_eq!(escalated.response.score, baseline.response.score);
    assert_eq!(escalated.response.verdict, baseline.response.verdict);
}

#[tokio::test]
async fn hanging_advisor_times_out_to_deterministic_result() {
    let fragments = vec![
        EvidenceFragment::HeaderAuth(AuthResult::all_pass()),
        EvidenceFragment::QuickFeatures(QuickFeatures {
            reply_to_mismatch: true,
            has_urls: true,
            ..quick("vendor.example")
        }),
        EvidenceFragment::ContentIntent(intent(Intent::PaymentFraud, "Update the wire details")),
        EvidenceFragment::UrlChain(login_urls()),
    ];

    let deterministic = engine(fragments.clone(), config(|c| c.advisory.mode = AdvisoryMode::Never));
    let expected = assess(&deterministic, input("ap@vendor.example")).await.response;

    let advisor = Arc::new(ScriptedAdvisor::hanging());
    let engine = engine(fragments, config(|c| c.advisory.timeout_ms = 50)).with_advisor(advisor.clone());
    let response = assess(&engine, input("ap@vendor.example")).await.response;

    assert_eq!(advisor.call_count(), 1);
    assert_eq!(response.fallback_reason, Some(FallbackReason::AdvisoryTimeout));
    assert_eq!(response.verdict, expected.verdict);
    assert_eq!(response.score, expected.score);
    assert!(matches!(response.advisory, AdvisoryState::Rejected { .. }));
}

#[tokio::test]
async fn grounded_advisory_claim_promotes() {
    let fragments = vec![
        EvidenceFragment::HeaderAuth(AuthResult::all_pass()),
        EvidenceFragment::QuickFeatures(QuickFeatures {
            has_urls: true,
            reply_to_mismatch: true,
            ..quick("notice.example")
        }),
        EvidenceFragment::UrlChain(login_urls()),
    ];
    let advisor = Arc::new(ScriptedAdvisor::responding(AdvisoryOutput {
        proposed_verdict: Verdict::Malicious,
        proposed_score: 88,
        confidence: 0.9,
        claims: vec![Claim {
            statement: "page imitates a Microsoft sign-in form".into(),
            evidence_ref: "page@0".into(),
        }],
    }));
    let engine = engine(fragments, config(|_| {})).with_advisor(advisor.clone());

    let response = assess(&engine, input("it@notice.example")).await.response;

    assert_eq!(response.verdict, Verdict::Malicious);
    assert!(response.score >= 70);
    assert_eq!(response.advisory, AdvisoryState::Validated { applied: true });
    assert!(response
        .top_signals
        .iter()
        .any(|s| s == "advisory:page imitates a Microsoft sign-in form [page@0]"));

    let seen = advisor.last_context().unwrap();
    assert!(seen.contains_reference("page@0"));
}

#[tokio::test]
async fn missing_advisor_is_reported_as_unavailable() {
    let engine = engine(phishing_fragments(), config(|_| {}));
    let response = assess(&engine, input("billing@example-secure.top")).await.response;

    assert_eq!(response.fallback_reason, Some(FallbackReason::AdvisoryUnavailable));
    assert!(response.has_degradation(DegradationCode::AdvisoryUnavailable));
    assert_eq!(response.verdict, Verdict::Malicious);
}

// ----------------------------------------------------------------------------
// Degraded runs
// ----------------------------------------------------------------------------

#[tokio::test]
async fn empty_input_short_circuits() {
    let engine = engine(phishing_fragments(), config(|_| {}));
    let out = engine
        .assess(NormalizedInput::default(), CancellationToken::new())
        .await;
    let response = out.response;

    assert_eq!(response.verdict, Verdict::Benign);
    assert_eq!(response.score, 0);
    assert_eq!(response.fallback_reason, Some(FallbackReason::EmptyInput));
    assert!(response.has_degradation(DegradationCode::EmptyInput));
    assert!(response.evidence_insufficient);
    assert!(out.trace.bundle.is_empty());
}

#[tokio::test]
async fn slow_producer_times_out() {
    let registry = ProducerRegistry::builder()
        .register(Arc::new(StaticProducer::new(EvidenceFragment::HeaderAuth(
            AuthResult::all_pass(),
        ))))
        .unwrap()
        .register(Arc::new(StaticProducer::new(EvidenceFragment::QuickFeatures(quick(
            "slow.example",
        )))))
        .unwrap()
        .register(Arc::new(MockProducer::delayed(
            Duration::from_secs(5),
            EvidenceFragment::ContentIntent(intent(Intent::Benign, "hello")),
        )))
        .unwrap()
        .build();
    let config = config(|c| c.router.producer_timeout_ms = 50);
    let engine = Engine::new(registry, config);

    let response = assess(&engine, input("a@slow.example")).await.response;

    let timeout = response
        .degradations
        .iter()
        .find(|d| d.code == DegradationCode::ProducerTimeout)
        .unwrap();
    assert_eq!(timeout.source.as_deref(), Some(ProducerId::SEMANTIC));
    assert_eq!(response.verdict, Verdict::Benign);
}

#[tokio::test]
async fn cancellation_returns_evidence_insufficient() {
    let engine = engine(phishing_fragments(), config(|_| {}));
    let token = CancellationToken::new();
    token.cancel();

    let response = engine.assess(input("x@example.com"), token).await.response;

    assert!(response.evidence_insufficient);
    assert_eq!(response.fallback_reason, Some(FallbackReason::Cancelled));
    assert_eq!(
        response.advisory,
        AdvisoryState::NotInvoked {
            skip_reason: Some(SkipReason::Cancelled)
        }
    );
    assert!(response.has_degradation(DegradationCode::ProducerCancelled));
}

#[tokio::test]
async fn cancellation_aborts_in_flight_producers() {
    let registry = ProducerRegistry::builder()
        .register(Arc::new(MockProducer::delayed(
            Duration::from_secs(30),
            EvidenceFragment::HeaderAuth(AuthResult::all_pass()),
        )))
        .unwrap()
        .build();
    let engine = Engine::new(registry, config(|_| {}));
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let response = tokio::time::timeout(Duration::from_secs(5), engine.assess(input("y@example.com"), token))
        .await
        .expect("assessment should stop promptly")
        .response;

    assert_eq!(response.fallback_reason, Some(FallbackReason::Cancelled));
    let cancelled = response
        .degradations
        .iter()
        .find(|d| d.code == DegradationCode::ProducerCancelled)
        .unwrap();
    assert_eq!(cancelled.source.as_deref(), Some(ProducerId::HEADER_AUTH));
}

#[tokio::test]
async fn extra_evidence_never_lifts_a_hard_rule_verdict() {
    let deep = |c: &mut EngineConfig| {
        c.advisory.mode = AdvisoryMode::Never;
        c.router.t_deep = 40;
    };
    let base = engine(phishing_fragments(), config(deep));
    let mut richer_fragments = phishing_fragments();
    richer_fragments.push(EvidenceFragment::DomainRisk(DomainFindings {
        items: vec![DomainRisk {
            domain: "example-secure.top".into(),
            homoglyph_suspected: true,
            ..Default::default()
        }],
    }));
    let richer = engine(richer_fragments, config(deep));

    let a = assess(&base, input("billing@example-secure.top")).await.response;
    let b = assess(&richer, input("billing@example-secure.top")).await.response;

    assert_eq!(a.route_depth, RouteDepth::Deep);
    assert_eq!(a.verdict, Verdict::Malicious);
    assert_eq!(b.verdict, Verdict::Malicious);
    assert!(b.score >= a.score);
    assert!(b.breakdown.iter().any(|f| f.factor == "lookalike_domain"));
}

#[tokio::test]
async fn evidence_insufficiency_does_not_depend_on_the_advisor() {
    // Same verdict-driving signals, but nothing carries text.
    let fragments: Vec<EvidenceFragment> = phishing_fragments()
        .into_iter()
        .map(|fragment| match fragment {
            EvidenceFragment::ContentIntent(content) => EvidenceFragment::ContentIntent(ContentIntent {
                artifacts: vec![],
                ..content
            }),
            EvidenceFragment::UrlChain(urls) => EvidenceFragment::UrlChain(UrlFindings {
                artifacts: vec![],
                ..urls
            }),
            other => other,
        })
        .collect();

    let silent = engine(fragments.clone(), config(|c| c.advisory.mode = AdvisoryMode::Never));
    let without = assess(&silent, input("billing@example-secure.top")).await.response;

    let advisor = Arc::new(ScriptedAdvisor::responding(AdvisoryOutput {
        proposed_verdict: Verdict::Malicious,
        proposed_score: 80,
        confidence: 0.9,
        claims: vec![],
    }));
    let advised = engine(fragments, config(|_| {})).with_advisor(advisor.clone());
    let with = assess(&advised, input("billing@example-secure.top")).await.response;

    assert_eq!(advisor.call_count(), 1);
    let seen = advisor.last_context().unwrap();
    assert!(seen.artifacts.is_empty());
    assert!(!seen.signal_refs.is_empty());

    assert_eq!(without.verdict, Verdict::Malicious);
    assert_eq!(with.verdict, Verdict::Malicious);
    assert!(!without.evidence_insufficient);
    assert_eq!(with.evidence_insufficient, without.evidence_insufficient);
}

#[tokio::test]
async fn dropping_the_assessment_stops_in_flight_producers() {
    let slow = Arc::new(MockProducer::delayed(
        Duration::from_millis(300),
        EvidenceFragment::HeaderAuth(AuthResult::all_pass()),
    ));
    let registry = ProducerRegistry::builder()
        .register(slow.clone())
        .unwrap()
        .build();
    let engine = Arc::new(Engine::new(registry, config(|_| {})));

    let caller = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.assess(input("z@example.com"), CancellationToken::new()).await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    caller.abort();
    assert!(caller.await.unwrap_err().is_cancelled());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(slow.call_count(), 1);
    assert_eq!(slow.completed_count(), 0);
}

#[tokio::test]
async fn configured_collaboration_intents_drive_escalation_and_fusion() {
    let fragments = vec![
        EvidenceFragment::HeaderAuth(AuthResult::all_pass()),
        EvidenceFragment::QuickFeatures(quick("billing-portal.example")),
        EvidenceFragment::ContentIntent(intent(Intent::PaymentFraud, "Approve the updated invoice")),
        EvidenceFragment::UrlChain(UrlFindings::default()),
    ];

    let defaults = engine(fragments.clone(), config(|c| c.advisory.mode = AdvisoryMode::Never));
    let baseline = assess(&defaults, input("ap@billing-portal.example")).await;

    let custom = engine(
        fragments,
        config(|c| {
            c.advisory.mode = AdvisoryMode::Never;
            c.escalation.collaboration_intents = vec![Intent::PaymentFraud];
        }),
    );
    let out = assess(&custom, input("ap@billing-portal.example")).await;

    assert!(!baseline.trace.plan.escalated);
    assert!(baseline
        .response
        .breakdown
        .iter()
        .all(|f| f.factor != "collaboration_oauth_intent"));

    assert!(out.trace.plan.escalated);
    assert!(out
        .response
        .breakdown
        .iter()
        .any(|f| f.factor == "collaboration_oauth_intent"));
}
