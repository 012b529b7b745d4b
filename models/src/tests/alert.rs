use crate::{Alert, AlertEntry, AlertKey, AlertSeverity, SyntheticAlert, SyntheticAlertId};

fn remote_alert(id: u64) -> Alert {
    Alert {
        id,
        severity: AlertSeverity::Medium,
        title: format!("alert {id}"),
        description: None,
        device_id: None,
        created_at: None,
        acknowledged: false,
    }
}

/// **VALUE**: Verifies a local alert and a remote alert with the same number get different keys.
///
/// **WHY THIS MATTERS**: The offline placeholder alert is mixed into the same list as the
/// sensor's alerts. If keys collided, acknowledging the placeholder would acknowledge a
/// real alert on the sensor (or the other way around).
///
/// **BUG THIS CATCHES**: Would catch `AlertKey` being flattened to a bare integer.
#[test]
fn given_same_numeric_id_when_comparing_remote_and_local_keys_then_distinct() {
    // GIVEN: Remote alert 1 and local alert 1
    let remote = AlertEntry::Remote(remote_alert(1));
    let local = AlertEntry::Local(SyntheticAlert::sensor_offline(SyntheticAlertId(1), "Den"));

    // WHEN: Taking their keys
    let remote_key = remote.key();
    let local_key = local.key();

    // THEN: Keys differ and render with their provenance
    assert_ne!(remote_key, local_key);
    assert_eq!(remote_key, AlertKey::Remote(1));
    assert_eq!(remote_key.to_string(), "remote:1");
    assert_eq!(local_key.to_string(), "local:1");
    assert!(local.is_local());
    assert!(!remote.is_local());
}

/// **VALUE**: Verifies the offline alert names the sensor and is high severity.
#[test]
fn given_sensor_name_when_building_offline_alert_then_title_names_sensor() {
    // GIVEN/WHEN
    let alert = SyntheticAlert::sensor_offline(SyntheticAlertId(7), "Garage");

    // THEN
    assert!(alert.title.contains("Garage"));
    assert_eq!(alert.severity, AlertSeverity::High);
}

/// **VALUE**: Verifies unknown severities from newer firmware decode as `Unknown`.
///
/// **BUG THIS CATCHES**: Would catch a strict enum making the whole alert list fail to
/// decode (and therefore the whole hydration) because of one new severity string.
#[test]
fn given_unknown_severity_when_decoding_alert_then_maps_to_unknown() {
    // GIVEN
    let json = r#"{"id": 3, "severity": "catastrophic", "title": "x"}"#;

    // WHEN
    let alert: Alert = serde_json::from_str(json).expect("should decode");

    // THEN
    assert_eq!(alert.severity, AlertSeverity::Unknown);
    assert!(!alert.acknowledged);
}
