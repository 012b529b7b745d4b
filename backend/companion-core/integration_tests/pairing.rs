use crate::helpers::{
    SensorSide, TEST_CODE, TEST_SENSOR_ID, TEST_SENSOR_NAME, TestCa, host_and_port,
    mount_pairing, received_paths, wait_until,
};

use companion_core::crypto::fingerprint_pem;
use companion_core::discovery::{SensorCandidate, StaticResolver};
use companion_core::error::pairing::PairingError;
use companion_core::pairing::{
    PairingAttemptState, PairingOrchestrator, PairingSettings, PairingStep,
};
use companion_core::store::{MemoryCredentialStore, load_trust_bundle, persist_trust_bundle};

use common::RedactedSecret;

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SERVICE_NAME: &str = "_sensor._tcp.den";

fn settings() -> PairingSettings {
    PairingSettings {
        use_tls: false,
        request_timeout: Duration::from_secs(5),
        ..PairingSettings::default()
    }
}

fn orchestrator_for(
    server: &MockServer,
) -> PairingOrchestrator<StaticResolver, Arc<MemoryCredentialStore>> {
    let (host, port) = host_and_port(server);
    PairingOrchestrator::new(
        StaticResolver::new().with_service(SERVICE_NAME, host, port),
        Arc::new(MemoryCredentialStore::new()),
        settings(),
    )
}

fn candidate() -> SensorCandidate {
    SensorCandidate::new(SERVICE_NAME, "Den (advertised)")
}

/// **VALUE**: Verifies the full handshake produces a usable, persisted trust bundle.
///
/// **WHY THIS MATTERS**: This is the only way a companion gets credentials. Every later
/// connection is pinned to the CA and authenticated with the certificate obtained here.
///
/// **BUG THIS CATCHES**: Would catch:
/// - Proof or key derivation drifting from what the sensor computes
/// - The CSR not being encrypted with the shared key
/// - The fingerprint being taken over the wrong certificate
/// - The bundle not being written to the store
#[tokio::test]
async fn given_correct_code_when_pairing_then_bundle_persisted_and_paired() {
    // GIVEN: A sensor that knows the code
    let server = MockServer::start().await;
    let sensor = SensorSide::new(TEST_CODE);
    mount_pairing(&server, &sensor, Duration::ZERO).await;
    let pairing = orchestrator_for(&server);

    // WHEN: Pairing with the right code
    let bundle = pairing
        .pair(&candidate(), &RedactedSecret::new(TEST_CODE))
        .await
        .expect("pairing succeeds");

    // THEN: The bundle carries the sensor's identity and our certificate
    assert_eq!(bundle.sensor_id, TEST_SENSOR_ID);
    assert_eq!(bundle.sensor_name, TEST_SENSOR_NAME);
    assert_eq!(bundle.ca_certificate_pem, sensor.ca.pem());
    assert_eq!(
        bundle.fingerprint,
        fingerprint_pem(&bundle.client_certificate_pem).expect("fingerprint")
    );
    assert!(bundle.address.starts_with("http://"));

    // THEN: State is paired and the store holds the same bundle
    match pairing.state() {
        PairingAttemptState::Paired { sensor, .. } => assert_eq!(sensor, bundle.paired_sensor()),
        other => panic!("expected paired, got {other:?}"),
    }
    let stored = pairing
        .load_paired()
        .expect("load")
        .expect("bundle stored");
    assert_eq!(stored.paired_sensor(), bundle.paired_sensor());
    assert_eq!(stored.client_private_key, bundle.client_private_key);
}

/// **VALUE**: Verifies a wrong code fails at verification and writes nothing.
///
/// **WHY THIS MATTERS**: The user mistyping the code is the most common pairing failure.
/// It must be reported as a rejection (so the UI can say "wrong code") and must not leave
/// partial credentials behind.
#[tokio::test]
async fn given_wrong_code_when_pairing_then_rejected_at_verify_and_nothing_stored() {
    // GIVEN
    let server = MockServer::start().await;
    let sensor = SensorSide::new(TEST_CODE);
    mount_pairing(&server, &sensor, Duration::ZERO).await;
    let pairing = orchestrator_for(&server);

    // WHEN
    let err = pairing
        .pair(&candidate(), &RedactedSecret::new("000000"))
        .await
        .expect_err("wrong code");

    // THEN
    assert!(matches!(
        err,
        PairingError::Rejected {
            step: PairingStep::Verify,
            ..
        }
    ));
    assert!(err.is_rejection());
    assert!(pairing.store().is_empty());
    assert!(
        !received_paths(&server)
            .await
            .iter()
            .any(|line| line.ends_with("/api/pair/complete"))
    );
    match pairing.state() {
        PairingAttemptState::Error { failure, .. } => {
            assert_eq!(failure.step, Some(PairingStep::Verify));
        }
        other => panic!("expected error, got {other:?}"),
    }
}

/// **VALUE**: Verifies a CA payload that fails authentication stops the handshake there.
///
/// **BUG THIS CATCHES**: Would catch a decryption failure being ignored and the handshake
/// continuing to submit a CSR to a sensor whose identity was never confirmed.
#[tokio::test]
async fn given_undecryptable_ca_when_pairing_then_fails_at_certificate_decryption() {
    // GIVEN: A sensor that seals the CA with a foreign key
    let server = MockServer::start().await;
    let sensor = SensorSide::with_corrupt_ca_payload(TEST_CODE);
    mount_pairing(&server, &sensor, Duration::ZERO).await;
    let pairing = orchestrator_for(&server);

    // WHEN
    let err = pairing
        .pair(&candidate(), &RedactedSecret::new(TEST_CODE))
        .await
        .expect_err("CA cannot be decrypted");

    // THEN
    assert_eq!(err.step(), Some(PairingStep::DecryptCaCert));
    assert!(pairing.store().is_empty());
}

/// **VALUE**: Verifies a malformed code never reaches the network.
#[tokio::test]
async fn given_malformed_code_when_pairing_then_no_requests_sent() {
    let server = MockServer::start().await;
    let pairing = orchestrator_for(&server);

    let err = pairing
        .pair(&candidate(), &RedactedSecret::new("12345"))
        .await
        .expect_err("malformed code");

    assert!(matches!(err, PairingError::InvalidCode { .. }));
    assert!(received_paths(&server).await.is_empty());
}

/// **VALUE**: Verifies an attempt superseded mid-handshake neither persists nor reports.
///
/// **WHY THIS MATTERS**: If the user starts over while a slow handshake is in flight, the
/// old handshake finishing later must not silently pair the companion behind their back.
///
/// **BUG THIS CATCHES**: Would catch:
/// - Persisting without re-checking the attempt id
/// - The stale attempt overwriting the new attempt's state with `Paired` or `Error`
#[tokio::test]
async fn given_inflight_pairing_when_new_discovery_starts_then_old_attempt_superseded() {
    // GIVEN: A sensor that is slow to answer the final step
    let server = MockServer::start().await;
    let sensor = SensorSide::new(TEST_CODE);
    mount_pairing(&server, &sensor, Duration::from_millis(500)).await;
    let pairing = Arc::new(orchestrator_for(&server));

    let task = {
        let pairing = pairing.clone();
        tokio::spawn(async move {
            pairing
                .pair(&candidate(), &RedactedSecret::new(TEST_CODE))
                .await
        })
    };

    // WHEN: The user restarts discovery while the CSR is being signed
    let reached_submit = wait_until(Duration::from_secs(5), || {
        matches!(
            pairing.state(),
            PairingAttemptState::Pairing {
                step: PairingStep::SubmitCsr,
                ..
            }
        )
    })
    .await;
    assert!(reached_submit, "handshake should reach CSR submission");
    let new_attempt = pairing.start_discovery();

    // THEN: The old attempt ends superseded, nothing stored, new state untouched
    let result = task.await.expect("pairing task");
    assert!(matches!(result, Err(PairingError::Superseded { .. })));
    assert!(pairing.store().is_empty());
    assert_eq!(
        pairing.state(),
        PairingAttemptState::Discovering {
            attempt: new_attempt
        }
    );
}

/// **VALUE**: Verifies unpair revokes on the sensor with the bearer and clears the store.
#[tokio::test]
async fn given_paired_sensor_when_unpairing_then_remote_revoked_and_store_empty() {
    // GIVEN: A stored bundle for a sensor that accepts the revocation
    let server = MockServer::start().await;
    let bundle = TestCa::new().bundle(&server.uri());
    Mock::given(method("DELETE"))
        .and(path(format!("/api/pair/{TEST_SENSOR_ID}")))
        .and(header(
            "authorization",
            format!("Bearer {}", bundle.fingerprint).as_str(),
        ))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    let pairing = orchestrator_for(&server);
    persist_trust_bundle(pairing.store(), &bundle).expect("persist");

    // WHEN
    let outcome = pairing.unpair(&bundle).await.expect("unpair");

    // THEN
    assert!(outcome.remote_revoked);
    assert!(pairing.store().is_empty());
    assert_eq!(pairing.state(), PairingAttemptState::Idle);
}

/// **VALUE**: Verifies an unreachable sensor does not block local unpairing.
///
/// **WHY THIS MATTERS**: A user unpairing a sensor that was thrown away must still be able
/// to remove its credentials. Revocation is best effort.
#[tokio::test]
async fn given_unreachable_sensor_when_unpairing_then_local_credentials_removed() {
    // GIVEN: A bundle whose sensor returns a server error
    let server = MockServer::start().await;
    let bundle = TestCa::new().bundle(&server.uri());
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let pairing = orchestrator_for(&server);
    persist_trust_bundle(pairing.store(), &bundle).expect("persist");

    // WHEN
    let outcome = pairing.unpair(&bundle).await.expect("unpair");

    // THEN
    assert!(!outcome.remote_revoked);
    assert!(load_trust_bundle(pairing.store()).expect("load").is_none());
}

/// **VALUE**: Verifies a sensor that already refuses the certificate counts as revoked,
/// and that repeating the unpair is harmless.
#[tokio::test]
async fn given_sensor_rejecting_certificate_when_unpairing_twice_then_revoked_and_idempotent() {
    let server = MockServer::start().await;
    let bundle = TestCa::new().bundle(&server.uri());
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let pairing = orchestrator_for(&server);
    persist_trust_bundle(pairing.store(), &bundle).expect("persist");

    let first = pairing.unpair(&bundle).await.expect("first unpair");
    let second = pairing.unpair(&bundle).await.expect("second unpair");

    assert!(first.remote_revoked);
    assert!(second.remote_revoked);
    assert!(pairing.store().is_empty());
}
