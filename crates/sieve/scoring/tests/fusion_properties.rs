//! Property tests: fusion bounds and ordering, hard-rule monotonicity.

use proptest::prelude::*;
use sieve_policy::{ScoringConfig, VerdictThresholds};
use sieve_scoring::*;
use sieve_types::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_status() -> impl Strategy<Value = AuthStatus> {
    prop_oneof![
        Just(AuthStatus::Pass),
        Just(AuthStatus::Fail),
        Just(AuthStatus::SoftFail),
        Just(AuthStatus::None),
        Just(AuthStatus::PermError),
    ]
}

fn arb_auth() -> impl Strategy<Value = AuthResult> {
    (arb_status(), arb_status(), arb_status()).prop_map(|(spf, dkim, dmarc)| AuthResult {
        spf,
        dkim,
        dmarc,
        aligned: false,
        anomalies: vec![],
    })
}

fn arb_quick() -> impl Strategy<Value = QuickFeatures> {
    (any::<bool>(), any::<bool>(), any::<bool>(), 0u32..5).prop_map(|(from, reply, urls, hits)| {
        QuickFeatures {
            from_domain_mismatch: from,
            reply_to_mismatch: reply,
            has_urls: urls,
            suspicious_subject: hits > 0,
            subject_keyword_hits: hits,
            sender_domain: Some("sender.example".into()),
        }
    })
}

fn arb_url() -> impl Strategy<Value = UrlFinding> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(ip, tld, short, login)| UrlFinding {
            url: "https://link.example/path".into(),
            final_domain: "link.example".into(),
            has_ip: ip,
            suspicious_tld: tld,
            shortener: short,
            contains_login_keywords: login,
        },
    )
}

fn arb_intent() -> impl Strategy<Value = Intent> {
    prop_oneof![
        Just(Intent::CredentialTheft),
        Just(Intent::MalwareDelivery),
        Just(Intent::PaymentFraud),
        Just(Intent::OauthConsent),
        Just(Intent::Benign),
        Just(Intent::Unknown),
    ]
}

fn arb_content() -> impl Strategy<Value = ContentIntent> {
    (arb_intent(), 0u32..8).prop_map(|(intent, urgency)| ContentIntent {
        intent,
        urgency,
        ..Default::default()
    })
}

fn arb_attachment() -> impl Strategy<Value = AttachmentFinding> {
    (proptest::option::of(any::<bool>()), proptest::option::of(any::<bool>())).prop_map(
        |(has_macro, is_executable)| AttachmentFinding {
            filename: "file.bin".into(),
            has_macro,
            is_executable,
            ..Default::default()
        },
    )
}

fn arb_bundle() -> impl Strategy<Value = EvidenceBundle> {
    (
        proptest::option::of(arb_auth()),
        proptest::option::of(arb_quick()),
        proptest::option::of(prop::collection::vec(arb_url(), 0..4)),
        proptest::option::of(prop::collection::vec(any::<bool>(), 0..3)),
        proptest::option::of(arb_content()),
        proptest::option::of(prop::collection::vec(arb_attachment(), 0..3)),
    )
        .prop_map(|(auth, quick, urls, domains, content, attachments)| {
            let mut bundle = EvidenceBundle::new();
            let mut put = |fragment| bundle.insert(fragment).expect("fresh slot");
            if let Some(auth) = auth {
                put(EvidenceFragment::HeaderAuth(auth));
            }
            if let Some(quick) = quick {
                put(EvidenceFragment::QuickFeatures(quick));
            }
            if let Some(items) = urls {
                put(EvidenceFragment::UrlChain(UrlFindings { items, ..Default::default() }));
            }
            if let Some(flags) = domains {
                put(EvidenceFragment::DomainRisk(DomainFindings {
                    items: flags
                        .into_iter()
                        .map(|homoglyph| DomainRisk {
                            domain: "d.example".into(),
                            homoglyph_suspected: homoglyph,
                            ..Default::default()
                        })
                        .collect(),
                }));
            }
            if let Some(content) = content {
                put(EvidenceFragment::ContentIntent(content));
            }
            if let Some(items) = attachments {
                put(EvidenceFragment::AttachmentScan(AttachmentFindings {
                    items,
                    ..Default::default()
                }));
            }
            bundle
        })
}

fn arb_weights() -> impl Strategy<Value = ScoringConfig> {
    prop::collection::vec(0.0f64..40.0, sieve_policy::FACTOR_NAMES.len()).prop_map(|weights| {
        ScoringConfig {
            weights: sieve_policy::FACTOR_NAMES
                .iter()
                .zip(weights)
                .map(|(name, w)| (name.to_string(), w))
                .collect(),
            urgency_divisor: 3.0,
        }
    })
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    /// Score stays in [0, 100] and the breakdown is exactly the non-zero factors, sorted.
    #[test]
    fn fusion_bounded_and_sorted(bundle in arb_bundle(), config in arb_weights()) {
        let frozen = bundle.freeze();
        let outcome = fuse(&frozen, &config, &Intent::collaboration_defaults());

        prop_assert!(outcome.score <= 100);
        prop_assert_eq!(outcome.factors.len(), config.weights.len());

        let nonzero = outcome.factors.iter().filter(|f| f.contribution > 0.0).count();
        prop_assert_eq!(outcome.breakdown.len(), nonzero);

        for pair in outcome.breakdown.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(
                a.contribution > b.contribution
                    || (a.contribution == b.contribution && a.factor < b.factor)
            );
        }
        for factor in &outcome.factors {
            prop_assert!((0.0..=1.0).contains(&factor.value));
        }
    }

    /// Fusion is a pure function of bundle and weights.
    #[test]
    fn fusion_is_deterministic(bundle in arb_bundle()) {
        let frozen = bundle.freeze();
        let config = ScoringConfig::default();
        let collaboration = Intent::collaboration_defaults();
        prop_assert_eq!(fuse(&frozen, &config, &collaboration), fuse(&frozen, &config, &collaboration));
    }

    /// Adding the DMARC / reply-to / login-URL combination always yields malicious.
    #[test]
    fn hard_rule_trigger_forces_malicious(
        content in proptest::option::of(arb_content()),
        attachments in prop::collection::vec(arb_attachment(), 0..3),
    ) {
        let mut bundle = EvidenceBundle::new();
        if let Some(content) = content {
            bundle.insert(EvidenceFragment::ContentIntent(content)).unwrap();
        }
        bundle
            .insert(EvidenceFragment::AttachmentScan(AttachmentFindings { items: attachments, ..Default::default() }))
            .unwrap();
        bundle
            .insert(EvidenceFragment::HeaderAuth(AuthResult { dmarc: AuthStatus::Fail, ..AuthResult::all_pass() }))
            .unwrap();
        bundle
            .insert(EvidenceFragment::QuickFeatures(QuickFeatures { reply_to_mismatch: true, ..Default::default() }))
            .unwrap();
        bundle
            .insert(EvidenceFragment::UrlChain(UrlFindings {
                items: vec![UrlFinding { contains_login_keywords: true, ..Default::default() }],
                ..Default::default()
            }))
            .unwrap();

        let frozen = bundle.freeze();
        // zero weights: the override must not depend on the fused score
        let config = ScoringConfig {
            weights: Default::default(),
            urgency_divisor: 3.0,
        };
        let outcome = fuse(&frozen, &config, &Intent::collaboration_defaults());
        let matches = apply_rules(&frozen);
        let thresholds = VerdictThresholds::default();
        let decision = decide(outcome.score, &matches, &thresholds);

        prop_assert!(!matches.is_empty());
        prop_assert_eq!(decision.verdict, Verdict::Malicious);
        prop_assert!(decision.score >= thresholds.block);
    }

    /// Band normalization always lands inside the verdict band.
    #[test]
    fn normalized_score_within_band(score in 0u8..=100, escalate in 1u8..50, gap in 1u8..50) {
        let thresholds = VerdictThresholds { escalate, block: escalate + gap };
        for verdict in [Verdict::Benign, Verdict::Suspicious, Verdict::Malicious] {
            let normalized = normalize_into_band(score, verdict, &thresholds);
            prop_assert_eq!(map_verdict(normalized, &[], &thresholds), verdict);
        }
    }
}
