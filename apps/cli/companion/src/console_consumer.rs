//! Terminal rendering of the session's state stream.

use companion_core::session::{SessionState, StateConsumer};

use models::{
    AlertEntry, AlertKey, AlertSeverity, EventKind, HydrationSnapshot, SensorEvent, SyntheticAlert,
};

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use log::{debug, trace};

/// Prints what the sensor reports and keeps the current alert list.
///
/// Remote and local alerts share one map keyed by [`AlertKey`], so a local
/// offline alert never replaces a sensor alert with the same number.
#[derive(Debug, Default)]
pub struct ConsoleConsumer {
    alerts: Mutex<BTreeMap<AlertKey, AlertEntry>>,
}

impl ConsoleConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    fn alerts(&self) -> MutexGuard<'_, BTreeMap<AlertKey, AlertEntry>> {
        self.alerts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of the tracked alerts, ordered remote before local.
    pub fn alert_entries(&self) -> Vec<AlertEntry> {
        self.alerts().values().cloned().collect()
    }

    pub fn local_alert_count(&self) -> usize {
        self.alerts().values().filter(|entry| entry.is_local()).count()
    }
}

fn severity_label(severity: AlertSeverity) -> &'static str {
    match severity {
        AlertSeverity::Info => "INFO",
        AlertSeverity::Low => "LOW",
        AlertSeverity::Medium => "MEDIUM",
        AlertSeverity::High => "HIGH",
        AlertSeverity::Critical => "CRITICAL",
        AlertSeverity::Unknown => "?",
    }
}

/// One-line summary of an event for the terminal.
pub fn describe_event(event: &SensorEvent) -> String {
    let subject = event
        .payload
        .get("id")
        .or_else(|| event.payload.get("device_id"))
        .or_else(|| event.payload.get("alert_id"))
        .map(|value| match value.as_str() {
            Some(text) => text.to_string(),
            None => value.to_string(),
        });

    let what = match event.event_kind() {
        EventKind::DeviceAdded => "device added",
        EventKind::DeviceUpdated => "device updated",
        EventKind::DeviceRemoved => "device removed",
        EventKind::AlertRaised => "alert raised",
        EventKind::AlertUpdated => "alert updated",
        EventKind::DecoyHit => "decoy hit",
        EventKind::DecoyUpdated => "decoy updated",
        EventKind::LearningUpdated => "learning updated",
        EventKind::StatusUpdated => "status updated",
        EventKind::Other(_) => event.kind.as_str(),
    };

    match subject {
        Some(subject) => format!("#{} {what} ({subject})", event.seq),
        None => format!("#{} {what}", event.seq),
    }
}

impl StateConsumer for ConsoleConsumer {
    fn apply_snapshot(&self, snapshot: HydrationSnapshot) {
        let name = snapshot
            .status
            .sensor_name
            .as_deref()
            .unwrap_or(&snapshot.status.sensor_id);
        println!(
            "{name}: health {}, {} devices, {} alerts, {} decoys, learning {}",
            snapshot.health.status,
            snapshot.devices.len(),
            snapshot.alerts.len(),
            snapshot.decoys.len(),
            if snapshot.learning.active { "on" } else { "off" },
        );

        let mut alerts = self.alerts();
        // Local alerts survive a re-hydration; the sensor knows nothing of them.
        alerts.retain(|_, entry| entry.is_local());
        for entry in snapshot.alert_entries() {
            alerts.insert(entry.key(), entry);
        }
        debug!("Tracking {} alerts after snapshot", alerts.len());
    }

    fn apply_event(&self, event: &SensorEvent) {
        trace!("Event frame: {event:?}");
        println!("{}", describe_event(event));
    }

    fn apply_local_alert(&self, alert: SyntheticAlert) {
        println!("[{}] {}", severity_label(alert.severity), alert.title);
        let entry = AlertEntry::Local(alert);
        self.alerts().insert(entry.key(), entry);
    }

    fn session_state_changed(&self, state: SessionState) {
        println!("session {state}");
    }
}
