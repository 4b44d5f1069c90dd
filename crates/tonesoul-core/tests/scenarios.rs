//! # Governance Engine Scenarios
//!
//! End-to-end behaviour of the decision pipeline.
//!
//! | Scenario | Path | Test |
//! |----------|------|------|
//! | A | Clean approval | `test_scenario_a_clean_approval` |
//! | B | Guardian veto | `test_scenario_b_guardian_rejects` |
//! | C | Confirmed betrayal | `test_scenario_c_confirmed_betrayal` |
//! | D | Confirmation timeout | `test_scenario_d_confirmation_timeout` |
//! | - | Abstention | `test_abstention_is_insufficient_consensus` |
//! | - | Output audit | `test_people_pleasing_output_intercepted` |
//! | - | Restart | `test_restart_restores_commitments` |

use std::time::Duration;

use tonesoul_core::{
    ActionState, Decision, GovernanceConfig, GovernanceEngine, GovernanceError, RejectionCause,
};
use tonesoul_council::CouncilConfig;
use tonesoul_ledger::{AuditEventKind, Ledger, Outcome};
use tonesoul_model::{Action, ActionId, OutputBasis, Origin, ProposedOutput, RiskTier, SemanticLayer};

const KEEP_API: &str = "Keep the public API of the parser stable";
const BREAK_API: &str = "Break the public API of the parser";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn engine(config: GovernanceConfig) -> GovernanceEngine {
    init_tracing();
    GovernanceEngine::new(config, Ledger::temporary().unwrap()).unwrap()
}

/// Sequential council so paused-clock tests never wait on the blocking pool.
fn sequential(timeout: Duration) -> GovernanceConfig {
    GovernanceConfig::default()
        .with_council(CouncilConfig::default().with_concurrent(false))
        .with_confirmation_timeout(timeout)
}

fn action(id: &str, description: &str, risk: RiskTier) -> Action {
    Action::new(id, description, risk, Origin::user("alice"))
}

async fn promise_api_stability(engine: &GovernanceEngine) -> tonesoul_model::CommitmentId {
    let decision = engine
        .submit(action("a-1", KEEP_API, RiskTier::Low).as_commitment())
        .await
        .unwrap();
    assert!(decision.is_approved());
    let active = engine.active_commitments();
    assert_eq!(active.len(), 1);
    active[0].id.clone()
}

// =============================================================================
// SCENARIO A: clean approval
// =============================================================================

#[tokio::test]
async fn test_scenario_a_clean_approval() {
    let engine = engine(GovernanceConfig::default());

    let decision = engine
        .submit(action("a-1", "Add a unit test for the tokenizer", RiskTier::Low))
        .await
        .unwrap();

    let Decision::Approved { audit_id, uncertainty } = &decision else {
        panic!("expected approval, got {decision:?}");
    };
    let record = engine.query(&"a-1".into()).unwrap();
    assert_eq!(record.event_labels(), vec!["Approved"]);
    assert_eq!(&record.audit_trail[0].hash, audit_id);
    assert_eq!(record.accountable, "alice");
    assert!(engine.ledger().verify(&"a-1".into()).is_ok());

    let bounds = uncertainty.confidence_bounds();
    assert!(bounds.lower() <= bounds.upper());
    assert!((0.0..=1.0).contains(&uncertainty.uncertainty_level()));
}

#[tokio::test]
async fn test_outcome_recorded_once() {
    let engine = engine(GovernanceConfig::default());
    engine
        .submit(action("a-1", "Add a unit test for the tokenizer", RiskTier::Low))
        .await
        .unwrap();

    engine
        .record_outcome(&"a-1".into(), Outcome::success("test merged"))
        .unwrap();
    assert!(matches!(
        engine.record_outcome(&"a-1".into(), Outcome::failure("again")),
        Err(GovernanceError::Ledger(_))
    ));

    let record = engine.query(&"a-1".into()).unwrap();
    assert_eq!(record.event_labels(), vec!["Approved", "OutcomeRecorded"]);
    assert_eq!(record.outcome.unwrap().summary, "test merged");
}

// =============================================================================
// SCENARIO B: a single veto rejects
// =============================================================================

#[tokio::test]
async fn test_scenario_b_guardian_rejects() {
    let engine = engine(GovernanceConfig::default());

    let decision = engine
        .submit(action("a-1", "Delete all rows in the staging table", RiskTier::Low))
        .await
        .unwrap();

    assert_eq!(decision.cause(), Some(RejectionCause::CouncilRejected));
    assert_eq!(decision.reasons().len(), 1);
    assert!(decision.reasons()[0].starts_with("potential harm"));

    let record = engine.query(&"a-1".into()).unwrap();
    assert_eq!(record.event_labels(), vec!["Rejected"]);
    assert_eq!(
        engine.status(&"a-1".into()).unwrap(),
        ActionState::Rejected {
            cause: RejectionCause::CouncilRejected
        }
    );
    assert!(matches!(
        engine.record_outcome(&"a-1".into(), Outcome::success("ran anyway")),
        Err(GovernanceError::NotApproved(_))
    ));
}

#[tokio::test]
async fn test_abstention_is_insufficient_consensus() {
    let engine = engine(GovernanceConfig::default());

    let decision = engine
        .submit(action("a-1", "Convince the reviewer to merge early", RiskTier::Low))
        .await
        .unwrap();

    assert_eq!(decision.cause(), Some(RejectionCause::InsufficientConsensus));
    assert!(decision.reasons()[0].contains("philosopher abstained"));
    assert!(matches!(
        decision.ensure_approved(),
        Err(GovernanceError::InsufficientConsensus(_))
    ));
}

#[tokio::test]
async fn test_high_risk_without_mitigation_rejected() {
    let engine = engine(GovernanceConfig::default());

    let rejected = engine
        .submit(action("a-1", "Migrate the billing schema", RiskTier::High))
        .await
        .unwrap();
    assert_eq!(rejected.reasons(), ["high risk without mitigation".to_string()]);

    let approved = engine
        .submit(
            action("a-2", "Migrate the billing schema", RiskTier::High)
                .with_mitigation("snapshot first, rehearse on staging"),
        )
        .await
        .unwrap();
    assert!(approved.is_approved());
}

// =============================================================================
// SCENARIO C: confirmed betrayal
// =============================================================================

#[tokio::test]
async fn test_scenario_c_confirmed_betrayal() {
    let engine = engine(GovernanceConfig::default());
    let commitment_id = promise_api_stability(&engine).await;

    let decision = engine
        .submit(action("a-2", BREAK_API, RiskTier::Medium))
        .await
        .unwrap();
    let Decision::PendingConfirmation {
        token,
        commitment_id: conflicting,
        explanation,
    } = decision
    else {
        panic!("expected pending confirmation");
    };
    assert_eq!(conflicting, commitment_id);
    assert!(explanation.contains(KEEP_API));
    assert_eq!(
        engine.status(&"a-2".into()).unwrap(),
        ActionState::PendingBetrayalConfirmation {
            commitment_id: commitment_id.clone()
        }
    );
    assert!(engine.pending(&token).is_some());

    // Not approved without a recorded confirmation.
    assert!(matches!(
        engine.record_outcome(&"a-2".into(), Outcome::success("shipped")),
        Err(GovernanceError::UnconfirmedBetrayal(_))
    ));

    let confirmed = engine.confirm(&token, "alice").unwrap();
    assert!(confirmed.is_approved());
    assert_eq!(engine.wait_for_resolution(&token).await.unwrap(), confirmed);

    let commitment = engine.commitment(&commitment_id).unwrap();
    assert!(!commitment.is_active());
    assert_eq!(commitment.revocation().unwrap().confirmed_by, "alice");
    assert!(engine.active_commitments().is_empty());

    let record = engine.query(&"a-2".into()).unwrap();
    assert_eq!(
        record.event_labels(),
        vec!["PendingConfirmation", "Confirmed", "CommitmentRevoked", "Approved"]
    );
    assert_eq!(record.audit_trail[1].actor.as_deref(), Some("alice"));
    assert!(engine.ledger().verify(&"a-2".into()).is_ok());
    assert_eq!(engine.status(&"a-2".into()).unwrap(), ActionState::Approved);
}

#[tokio::test]
async fn test_unrelated_action_passes_gate() {
    let engine = engine(GovernanceConfig::default());
    promise_api_stability(&engine).await;

    let decision = engine
        .submit(action("a-2", "Document the public API of the parser", RiskTier::Low))
        .await
        .unwrap();
    assert!(decision.is_approved());
    assert_eq!(engine.active_commitments().len(), 1);
}

#[tokio::test]
async fn test_each_broken_commitment_needs_its_own_confirmation() {
    let engine = engine(GovernanceConfig::default());
    let stable = promise_api_stability(&engine).await;
    engine
        .submit(action("a-1b", "Keep the parser API backwards compatible", RiskTier::Low).as_commitment())
        .await
        .unwrap();
    let compatible = engine
        .active_commitments()
        .into_iter()
        .find(|c| c.source_action == ActionId::new("a-1b"))
        .unwrap()
        .id;

    let first = engine
        .submit(action("a-2", "Break the public API of the parser compatibility", RiskTier::Medium))
        .await
        .unwrap();
    assert!(matches!(
        &first,
        Decision::PendingConfirmation { commitment_id, .. } if *commitment_id == stable
    ));
    let first_token = first.token().cloned().unwrap();

    // Confirming one breach does not approve the other.
    let second = engine.confirm(&first_token, "alice").unwrap();
    let Decision::PendingConfirmation {
        token: second_token,
        commitment_id,
        ..
    } = &second
    else {
        panic!("expected a second pause, got {second:?}");
    };
    assert_eq!(commitment_id, &compatible);
    assert_ne!(second_token, &first_token);
    assert_eq!(engine.wait_for_resolution(&first_token).await.unwrap(), second);
    assert!(engine.commitment(&compatible).unwrap().is_active());
    assert!(matches!(
        engine.record_outcome(&"a-2".into(), Outcome::success("shipped")),
        Err(GovernanceError::UnconfirmedBetrayal(_))
    ));

    let approved = engine.confirm(second_token, "bob").unwrap();
    assert!(approved.is_approved());
    assert!(engine.active_commitments().is_empty());
    assert_eq!(
        engine.commitment(&compatible).unwrap().revocation().unwrap().confirmed_by,
        "bob"
    );

    let record = engine.query(&"a-2".into()).unwrap();
    assert_eq!(
        record.event_labels(),
        vec![
            "PendingConfirmation",
            "Confirmed",
            "CommitmentRevoked",
            "PendingConfirmation",
            "Confirmed",
            "CommitmentRevoked",
            "Approved",
        ]
    );
    assert!(engine.ledger().verify(&"a-2".into()).is_ok());
}

#[tokio::test]
async fn test_negated_break_reaffirms_commitment() {
    let engine = engine(GovernanceConfig::default());
    let commitment_id = promise_api_stability(&engine).await;

    let decision = engine
        .submit(action("a-2", "Do not break the public API of the parser", RiskTier::Low))
        .await
        .unwrap();
    assert!(decision.is_approved());
    assert!(engine.commitment(&commitment_id).unwrap().is_active());
    assert_eq!(engine.query(&"a-2".into()).unwrap().event_labels(), vec!["Approved"]);
}

// =============================================================================
// SCENARIO D: confirmation never arrives
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_scenario_d_confirmation_timeout() {
    let engine = engine(sequential(Duration::from_secs(30)));
    let commitment_id = promise_api_stability(&engine).await;

    let decision = engine
        .submit(action("a-2", BREAK_API, RiskTier::Medium))
        .await
        .unwrap();
    let token = decision.token().cloned().unwrap();

    let resolved = engine.wait_for_resolution(&token).await.unwrap();
    assert_eq!(resolved.cause(), Some(RejectionCause::ConfirmationTimeout));
    assert!(matches!(
        resolved.ensure_approved(),
        Err(GovernanceError::UnconfirmedBetrayal(_))
    ));

    // The promise stands.
    assert!(engine.commitment(&commitment_id).unwrap().is_active());

    // Too late.
    assert!(matches!(
        engine.confirm(&token, "alice"),
        Err(GovernanceError::ConfirmationTimeout(id)) if id == ActionId::new("a-2")
    ));
    assert!(matches!(
        engine.record_outcome(&"a-2".into(), Outcome::success("shipped")),
        Err(GovernanceError::UnconfirmedBetrayal(_))
    ));

    let record = engine.query(&"a-2".into()).unwrap();
    assert_eq!(record.event_labels(), vec!["PendingConfirmation", "Rejected"]);
}

// =============================================================================
// OUTPUT AUDIT
// =============================================================================

#[tokio::test]
async fn test_people_pleasing_output_intercepted() {
    let engine = engine(GovernanceConfig::default());

    let decision = engine
        .submit(
            action("a-1", "Reply to the user about the release date", RiskTier::Low).with_output(
                ProposedOutput::new("Absolutely, of course it will definitely ship on Friday"),
            ),
        )
        .await
        .unwrap();

    assert_eq!(decision.cause(), Some(RejectionCause::BenevolenceIntercept));
    assert!(decision.reasons()[0].contains("people-pleasing"));
}

#[tokio::test]
async fn test_ungrounded_output_rejected() {
    let engine = engine(GovernanceConfig::default());

    let decision = engine
        .submit(
            action("a-1", "Summarize the incident", RiskTier::Low).with_output(
                ProposedOutput::new("Cosmic rays flipped a bit in the router")
                    .with_fragment("disk filled up on node three during compaction"),
            ),
        )
        .await
        .unwrap();

    assert_eq!(decision.cause(), Some(RejectionCause::BenevolenceIntercept));
    assert!(decision.reasons()[0].contains("not grounded"));
}

#[tokio::test]
async fn test_flagged_output_still_approved() {
    let engine = engine(GovernanceConfig::default());

    let decision = engine
        .submit(
            action("a-1", "Explain the slowdown", RiskTier::Low).with_output(
                ProposedOutput::new("The cache layer is the cause of the slowdown")
                    .with_basis(OutputBasis::Inference, SemanticLayer::Operational),
            ),
        )
        .await
        .unwrap();

    assert!(decision.is_approved());
    let record = engine.query(&"a-1".into()).unwrap();
    assert_eq!(record.event_labels(), vec!["Approved"]);
    assert!(record.audit_trail[0].detail.contains("benevolence flag"));
}

#[tokio::test]
async fn test_disabled_audit_lets_output_through() {
    let config = GovernanceConfig::default().with_benevolence(
        tonesoul_council::BenevolenceConfig::default().with_enabled(false),
    );
    let engine = engine(config);

    let decision = engine
        .submit(
            action("a-1", "Reply to the user about the release date", RiskTier::Low).with_output(
                ProposedOutput::new("Absolutely, of course it will definitely ship on Friday"),
            ),
        )
        .await
        .unwrap();
    assert!(decision.is_approved());
}

// =============================================================================
// RESPONSIBILITY CHAIN
// =============================================================================

#[tokio::test]
async fn test_follow_up_actions_form_a_chain() {
    let engine = engine(GovernanceConfig::default());
    engine
        .submit(action("req", "Add a unit test for the tokenizer", RiskTier::Low))
        .await
        .unwrap();
    engine
        .submit(
            Action::new("follow", "Tidy the test imports", RiskTier::Low, Origin::ai("assistant"))
                .with_parent("req")
                .with_reason("cleanup after the requested test"),
        )
        .await
        .unwrap();

    let chain = engine.ledger().chain(&"follow".into()).unwrap();
    let ids: Vec<_> = chain.iter().map(|r| r.id().as_str().to_string()).collect();
    assert_eq!(ids, vec!["req", "follow"]);
    assert!(chain[1].genesis.ai_initiated);
    assert_eq!(chain[1].genesis.reason, "cleanup after the requested test");

    // An unknown parent is refused before deliberation.
    let err = engine
        .submit(action("orphan", "Tidy more imports", RiskTier::Low).with_parent("missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, GovernanceError::Ledger(_)));
}

// =============================================================================
// RESTART
// =============================================================================

#[tokio::test]
async fn test_restart_restores_commitments() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger");

    let (api_commitment, push_commitment, stranded) = {
        let engine = GovernanceEngine::new(GovernanceConfig::default(), Ledger::open(&path).unwrap())
            .unwrap();
        let api_commitment = promise_api_stability(&engine).await;

        engine
            .submit(action("a-2", "Never force-push to main", RiskTier::Low).as_commitment())
            .await
            .unwrap();
        let push_commitment = engine
            .active_commitments()
            .into_iter()
            .find(|c| c.source_action == ActionId::new("a-2"))
            .unwrap()
            .id;

        let token = engine
            .submit(action("a-3", BREAK_API, RiskTier::Medium))
            .await
            .unwrap()
            .token()
            .cloned()
            .unwrap();
        engine.confirm(&token, "alice").unwrap();

        let stranded = engine
            .submit(action("a-4", "Force-push to main to fix history", RiskTier::Low))
            .await
            .unwrap();
        assert!(stranded.is_pending());

        engine.ledger().flush().unwrap();
        (api_commitment, push_commitment, ActionId::new("a-4"))
    };

    let engine =
        GovernanceEngine::new(GovernanceConfig::default(), Ledger::open(&path).unwrap()).unwrap();

    let api = engine.commitment(&api_commitment).unwrap();
    assert!(!api.is_active());
    assert_eq!(api.revocation().unwrap().confirmed_by, "alice");

    let active: Vec<_> = engine.active_commitments().into_iter().map(|c| c.id).collect();
    assert_eq!(active, vec![push_commitment]);

    assert_eq!(
        engine.status(&stranded).unwrap(),
        ActionState::Rejected {
            cause: RejectionCause::ConfirmationTimeout
        }
    );
    let record = engine.query(&stranded).unwrap();
    assert!(matches!(
        record.last_event().unwrap().kind,
        AuditEventKind::Rejected {
            cause: RejectionCause::ConfirmationTimeout,
            ..
        }
    ));
    assert!(engine.ledger().verify(&stranded).is_ok());
}
