use crate::console_consumer::{ConsoleConsumer, describe_event};

use companion_core::session::StateConsumer;

use models::{
    Alert, AlertKey, AlertSeverity, Health, HydrationSnapshot, LearningStatus, SensorEvent,
    SensorStatus, SyntheticAlert, SyntheticAlertId,
};

use serde_json::json;

fn alert(id: u64, title: &str) -> Alert {
    Alert {
        id,
        severity: AlertSeverity::Medium,
        title: title.to_string(),
        description: None,
        device_id: None,
        created_at: None,
        acknowledged: false,
    }
}

fn snapshot(alerts: Vec<Alert>) -> HydrationSnapshot {
    HydrationSnapshot {
        health: Health {
            status: "ok".to_string(),
            version: None,
            uptime_secs: None,
        },
        status: SensorStatus {
            sensor_id: "sensor-1".to_string(),
            sensor_name: Some("Den Sensor".to_string()),
            monitoring: true,
            interface: None,
            device_count: 0,
            open_alert_count: alerts.len() as u64,
        },
        devices: Vec::new(),
        alerts,
        decoys: Vec::new(),
        learning: LearningStatus {
            active: false,
            progress_percent: None,
            remaining_secs: None,
        },
    }
}

/// **VALUE**: Verifies a local alert and a remote alert with the same number coexist.
///
/// **WHY THIS MATTERS**: Local ids start at 1 just like the sensor's. If both were
/// keyed by the bare number, the offline alert would overwrite a real intrusion alert.
#[test]
fn given_remote_and_local_alert_with_same_number_then_both_tracked() {
    // GIVEN: A snapshot with remote alert 1
    let consumer = ConsoleConsumer::new();
    consumer.apply_snapshot(snapshot(vec![alert(1, "Port scan")]));

    // WHEN: A local alert with id 1 arrives
    consumer.apply_local_alert(SyntheticAlert::sensor_offline(SyntheticAlertId(1), "Den Sensor"));

    // THEN: Both are present under distinct keys
    let keys: Vec<AlertKey> = consumer.alert_entries().iter().map(|e| e.key()).collect();
    assert_eq!(
        keys,
        vec![AlertKey::Remote(1), AlertKey::Local(SyntheticAlertId(1))]
    );
}

/// **VALUE**: Verifies a re-hydration replaces remote alerts but keeps local ones.
///
/// **BUG THIS CATCHES**: Would catch a reconnect dropping the "went offline" alert
/// (the sensor never knew about it), or stale remote alerts surviving a new snapshot.
#[test]
fn given_tracked_alerts_when_new_snapshot_applied_then_remote_replaced_local_kept() {
    // GIVEN
    let consumer = ConsoleConsumer::new();
    consumer.apply_snapshot(snapshot(vec![alert(1, "Port scan"), alert(2, "ARP spoof")]));
    consumer.apply_local_alert(SyntheticAlert::sensor_offline(SyntheticAlertId(1), "Den Sensor"));

    // WHEN
    consumer.apply_snapshot(snapshot(vec![alert(3, "New device")]));

    // THEN
    let keys: Vec<AlertKey> = consumer.alert_entries().iter().map(|e| e.key()).collect();
    assert_eq!(
        keys,
        vec![AlertKey::Remote(3), AlertKey::Local(SyntheticAlertId(1))]
    );
    assert_eq!(consumer.local_alert_count(), 1);
}

#[test]
fn given_known_event_with_id_when_described_then_kind_and_subject_shown() {
    let event = SensorEvent {
        seq: 42,
        kind: "device_added".to_string(),
        payload: json!({"id": "aa:bb:cc"}),
        timestamp: None,
    };

    assert_eq!(describe_event(&event), "#42 device added (aa:bb:cc)");
}

#[test]
fn given_unknown_event_without_subject_when_described_then_raw_kind_shown() {
    let event = SensorEvent {
        seq: 7,
        kind: "firmware_staged".to_string(),
        payload: json!({}),
        timestamp: None,
    };

    assert_eq!(describe_event(&event), "#7 firmware_staged");
}

#[test]
fn given_numeric_subject_when_described_then_rendered_without_quotes() {
    let event = SensorEvent {
        seq: 8,
        kind: "alert_raised".to_string(),
        payload: json!({"alert_id": 12}),
        timestamp: None,
    };

    assert_eq!(describe_event(&event), "#8 alert raised (12)");
}
