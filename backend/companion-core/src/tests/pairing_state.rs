use crate::discovery::{SensorCandidate, StaticResolver};
use crate::pairing::{
    AttemptId, PairingAttemptState, PairingOrchestrator, PairingSettings, PairingStep,
};
use crate::store::MemoryCredentialStore;

use common::RedactedSecret;

fn orchestrator() -> PairingOrchestrator<StaticResolver, MemoryCredentialStore> {
    PairingOrchestrator::new(
        StaticResolver::new(),
        MemoryCredentialStore::new(),
        PairingSettings::default(),
    )
}

/// **VALUE**: Verifies results from an abandoned discovery never overwrite a newer one.
///
/// **WHY THIS MATTERS**: Discovery answers arrive asynchronously. A slow browse started
/// before the user hit "retry" must not replace the fresh candidate list.
///
/// **BUG THIS CATCHES**: Would catch state updates being applied without checking the
/// attempt id.
#[test]
fn given_two_discoveries_when_old_one_reports_then_ignored() {
    // GIVEN: Discovery started twice
    let pairing = orchestrator();
    let first = pairing.start_discovery();
    let second = pairing.start_discovery();

    // WHEN: The first attempt reports late
    let applied = pairing.report_candidates(first, vec![SensorCandidate::new("old", "Old")]);

    // THEN: Ignored, the second attempt is still discovering
    assert!(!applied);
    assert_eq!(
        pairing.state(),
        PairingAttemptState::Discovering { attempt: second }
    );
    assert!(second > first);
}

#[test]
fn given_current_discovery_when_reporting_then_found() {
    let pairing = orchestrator();
    let attempt = pairing.start_discovery();
    let candidates = vec![SensorCandidate::new("_sensor._tcp.den", "Den")];

    assert!(pairing.report_candidates(attempt, candidates.clone()));
    assert_eq!(
        pairing.state(),
        PairingAttemptState::Found {
            attempt,
            candidates
        }
    );
}

#[test]
fn given_discovery_when_cancelled_then_idle_and_late_results_dropped() {
    let pairing = orchestrator();
    let attempt = pairing.start_discovery();

    pairing.cancel();

    assert_eq!(pairing.state(), PairingAttemptState::Idle);
    assert!(!pairing.report_candidates(attempt, Vec::new()));
    assert_eq!(pairing.state(), PairingAttemptState::Idle);
}

/// **VALUE**: Verifies a malformed code fails the attempt without a handshake step.
///
/// **WHY THIS MATTERS**: Code validation happens before resolution, so the error carries no
/// step and nothing is written to the store.
#[tokio::test]
async fn given_malformed_code_when_pairing_then_error_state_without_step() {
    // GIVEN
    let pairing = orchestrator();
    let candidate = SensorCandidate::new("_sensor._tcp.den", "Den");

    // WHEN
    let result = pairing.pair(&candidate, &RedactedSecret::new("12ab")).await;

    // THEN
    assert!(result.is_err());
    match pairing.state() {
        PairingAttemptState::Error { failure, .. } => assert_eq!(failure.step, None),
        other => panic!("expected error state, got {other:?}"),
    }
    assert!(pairing.store().is_empty());
}

/// **VALUE**: Verifies an unresolvable sensor fails at the resolve step.
#[tokio::test]
async fn given_unknown_service_when_pairing_then_resolve_step_fails() {
    let pairing = orchestrator();
    let candidate = SensorCandidate::new("_sensor._tcp.missing", "Missing");

    let err = pairing
        .pair(&candidate, &RedactedSecret::new("123456"))
        .await
        .expect_err("cannot resolve");

    assert_eq!(err.step(), Some(PairingStep::Resolve));
    assert!(matches!(
        pairing.state(),
        PairingAttemptState::Error { failure, .. } if failure.step == Some(PairingStep::Resolve)
    ));
}

#[test]
fn given_states_when_checking_terminal_then_only_paired_and_error() {
    let attempt = AttemptId(1);

    assert!(!PairingAttemptState::Idle.is_terminal());
    assert!(!PairingAttemptState::Discovering { attempt }.is_terminal());
    assert!(
        PairingAttemptState::Error {
            attempt,
            failure: crate::pairing::PairingFailure {
                step: None,
                message: String::from("boom"),
            },
        }
        .is_terminal()
    );
    assert_eq!(PairingAttemptState::Idle.attempt(), None);
    assert_eq!(attempt.to_string(), "#1");
}
