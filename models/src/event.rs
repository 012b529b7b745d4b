use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One sequenced event from the sensor's live stream.
///
/// The payload is opaque to the companion core; consumers interpret it
/// according to [`SensorEvent::kind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorEvent {
    pub seq: u64,
    #[serde(rename = "event")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Event kinds the companion knows how to name. Anything else is `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    DeviceAdded,
    DeviceUpdated,
    DeviceRemoved,
    AlertRaised,
    AlertUpdated,
    DecoyHit,
    DecoyUpdated,
    LearningUpdated,
    StatusUpdated,
    Other(String),
}

impl SensorEvent {
    pub fn event_kind(&self) -> EventKind {
        match self.kind.as_str() {
            "device_added" => EventKind::DeviceAdded,
            "device_updated" => EventKind::DeviceUpdated,
            "device_removed" => EventKind::DeviceRemoved,
            "alert_raised" => EventKind::AlertRaised,
            "alert_updated" => EventKind::AlertUpdated,
            "decoy_hit" => EventKind::DecoyHit,
            "decoy_updated" => EventKind::DecoyUpdated,
            "learning_updated" => EventKind::LearningUpdated,
            "status_updated" => EventKind::StatusUpdated,
            other => EventKind::Other(other.to_string()),
        }
    }
}
