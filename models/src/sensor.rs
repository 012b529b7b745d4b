//! Records returned by the sensor's request/response API during hydration.
//!
//! Fields the companion does not strictly need are optional with serde
//! defaults, so older sensor firmware that omits them still decodes.

use crate::alert::{Alert, AlertEntry};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub uptime_secs: Option<u64>,
}

impl Health {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorStatus {
    pub sensor_id: String,
    #[serde(default)]
    pub sensor_name: Option<String>,
    #[serde(default)]
    pub monitoring: bool,
    #[serde(default)]
    pub interface: Option<String>,
    #[serde(default)]
    pub device_count: u64,
    #[serde(default)]
    pub open_alert_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub trusted: bool,
    #[serde(default)]
    pub blocked: bool,
    #[serde(default)]
    pub first_seen: Option<String>,
    #[serde(default)]
    pub last_seen: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decoy {
    pub id: String,
    pub template: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub hits: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningStatus {
    pub active: bool,
    #[serde(default)]
    pub progress_percent: Option<u8>,
    #[serde(default)]
    pub remaining_secs: Option<u64>,
}

/// The baseline applied before any live event is accepted.
///
/// Built only when all six hydration calls succeed; there is no partially
/// populated snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct HydrationSnapshot {
    pub health: Health,
    pub status: SensorStatus,
    pub devices: Vec<Device>,
    pub alerts: Vec<Alert>,
    pub decoys: Vec<Decoy>,
    pub learning: LearningStatus,
}

impl HydrationSnapshot {
    /// Alerts tagged with their provenance.
    pub fn alert_entries(&self) -> Vec<AlertEntry> {
        self.alerts.iter().cloned().map(AlertEntry::Remote).collect()
    }
}
