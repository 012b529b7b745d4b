use crate::helpers::{TEST_FINGERPRINT, TEST_SENSOR_ID, mount_hydration};

use companion_core::crypto::tls::TlsSettings;
use companion_core::error::sensor_client::SensorClientError;
use companion_core::sensor_client::{SensorClient, normalize_base_url};

use models::SensorAction;

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> SensorClient {
    SensorClient::new(
        &server.uri(),
        &TlsSettings::unpinned(),
        Duration::from_secs(5),
    )
    .expect("client")
    .with_bearer(TEST_FINGERPRINT)
}

/// **VALUE**: Verifies hydration collects all six resources with the bearer attached.
#[tokio::test]
async fn given_sensor_when_hydrating_then_snapshot_built_with_bearer() {
    // GIVEN
    let server = MockServer::start().await;
    mount_hydration(&server).await;

    // WHEN
    let snapshot = client_for(&server).hydrate().await.expect("hydrate");

    // THEN
    assert!(snapshot.health.is_ok());
    assert_eq!(snapshot.status.sensor_id, TEST_SENSOR_ID);
    assert_eq!(snapshot.devices.len(), 1);
    assert_eq!(snapshot.alerts.len(), 1);
    assert!(snapshot.decoys.is_empty());
    assert!(!snapshot.learning.active);

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 6);
    let expected = format!("Bearer {TEST_FINGERPRINT}");
    for request in requests {
        let bearer = request
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok());
        assert_eq!(bearer, Some(expected.as_str()), "{}", request.url.path());
    }
}

/// **VALUE**: Verifies 401 and 403 are both classified as credential rejection.
///
/// **WHY THIS MATTERS**: Rejection means "re-pair", any other failure means "retry later".
/// Mixing them up either locks users out or retries revoked credentials forever.
#[tokio::test]
async fn given_auth_statuses_when_requesting_then_auth_rejected() {
    for status in [401u16, 403] {
        // GIVEN
        let server = MockServer::start().await;
        Mock::given(path("/api/health"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        // WHEN
        let err = client_for(&server).health().await.expect_err("rejected");

        // THEN
        assert!(err.is_auth_rejection(), "{status} should be a rejection");
        assert!(!err.is_retryable());
        assert_eq!(err.status_code(), Some(status));
        assert_eq!(err.error_category(), "auth_rejected");
    }
}

#[tokio::test]
async fn given_server_error_when_requesting_then_retryable_status() {
    let server = MockServer::start().await;
    Mock::given(path("/api/status"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = client_for(&server).status().await.expect_err("server error");

    assert!(matches!(err, SensorClientError::Status { .. }));
    assert!(err.is_retryable());
    assert_eq!(err.error_category(), "server_error");
}

/// **VALUE**: Verifies a body that does not match the schema is a decode error.
///
/// **BUG THIS CATCHES**: Would catch schema mismatches surfacing as generic HTTP failures,
/// hiding that the sensor firmware and companion disagree.
#[tokio::test]
async fn given_malformed_body_when_requesting_then_decode_error() {
    let server = MockServer::start().await;
    Mock::given(path("/api/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"devices": "nope"})))
        .mount(&server)
        .await;

    let err = client_for(&server).devices().await.expect_err("decode");

    assert!(err.is_decode());
    assert_eq!(err.error_category(), "decode");
}

#[tokio::test]
async fn given_unreachable_sensor_when_requesting_then_connection_error() {
    let client = SensorClient::new(
        "http://127.0.0.1:9",
        &TlsSettings::unpinned(),
        Duration::from_secs(2),
    )
    .expect("client");

    let err = client.health().await.expect_err("unreachable");

    assert!(matches!(err, SensorClientError::Http { .. }));
    assert!(err.is_retryable());
}

/// **VALUE**: Verifies each action maps to its route and method.
///
/// **BUG THIS CATCHES**: Would catch a route typo that sends "block" to the trust endpoint,
/// or a decoy id that is not percent-encoded into the path.
#[tokio::test]
async fn given_each_action_when_performing_then_expected_route_hit() {
    // GIVEN
    let server = MockServer::start().await;
    let routes = [
        ("POST", "/api/alerts/4/acknowledge"),
        ("POST", "/api/alerts/4/resolve"),
        ("POST", "/api/devices/aa:bb/trust"),
        ("POST", "/api/devices/aa:bb/block"),
        ("DELETE", "/api/decoys/dc%201"),
        ("POST", "/api/learning/start"),
        ("POST", "/api/learning/stop"),
    ];
    for (verb, route) in routes {
        Mock::given(method(verb))
            .and(path(route))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path("/api/decoys"))
        .and(body_json(json!({"template": "smb"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server);

    // WHEN
    let actions = [
        SensorAction::AcknowledgeAlert { alert_id: 4 },
        SensorAction::ResolveAlert { alert_id: 4 },
        SensorAction::TrustDevice {
            device_id: String::from("aa:bb"),
        },
        SensorAction::BlockDevice {
            device_id: String::from("aa:bb"),
        },
        SensorAction::RemoveDecoy {
            decoy_id: String::from("dc 1"),
        },
        SensorAction::SetLearning { enabled: true },
        SensorAction::SetLearning { enabled: false },
        SensorAction::DeployDecoy {
            template: String::from("smb"),
            port: None,
        },
    ];
    for action in &actions {
        client
            .perform(action)
            .await
            .unwrap_or_else(|e| panic!("{} failed: {e}", action.operation()));
    }

    // THEN: Expectations are verified when the server drops
    server.verify().await;
}

#[test]
fn given_address_without_trailing_slash_when_normalizing_then_slash_added() {
    let url = normalize_base_url("https://10.0.0.2:8443").expect("url");
    let nested = normalize_base_url("https://10.0.0.2:8443/sensor").expect("url");

    assert_eq!(url.as_str(), "https://10.0.0.2:8443/");
    assert_eq!(nested.as_str(), "https://10.0.0.2:8443/sensor/");
    assert!(normalize_base_url("not a url").is_err());
}
