//! Alerts, tagged by where they came from.
//!
//! Remote alerts are issued by the sensor and carry its numeric ids. Local
//! alerts are manufactured by the companion (for example when the sensor drops
//! off the network) and live in their own id space. [`AlertKey`] keeps the two
//! apart at the type level, so a local id can never shadow a remote one.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Low,
    Medium,
    High,
    Critical,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: u64,
    pub severity: AlertSeverity,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub acknowledged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SyntheticAlertId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticAlertKind {
    SensorOffline,
}

/// An alert the companion raised on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticAlert {
    pub id: SyntheticAlertId,
    pub kind: SyntheticAlertKind,
    pub severity: AlertSeverity,
    pub title: String,
    pub raised_at: SystemTime,
}

impl SyntheticAlert {
    pub fn sensor_offline(id: SyntheticAlertId, sensor_name: &str) -> Self {
        Self {
            id,
            kind: SyntheticAlertKind::SensorOffline,
            severity: AlertSeverity::High,
            title: format!("Sensor '{sensor_name}' went offline"),
            raised_at: SystemTime::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AlertKey {
    Remote(u64),
    Local(SyntheticAlertId),
}

impl fmt::Display for AlertKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKey::Remote(id) => write!(f, "remote:{id}"),
            AlertKey::Local(SyntheticAlertId(id)) => write!(f, "local:{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlertEntry {
    Remote(Alert),
    Local(SyntheticAlert),
}

impl AlertEntry {
    pub fn key(&self) -> AlertKey {
        match self {
            AlertEntry::Remote(alert) => AlertKey::Remote(alert.id),
            AlertEntry::Local(alert) => AlertKey::Local(alert.id),
        }
    }

    pub fn severity(&self) -> AlertSeverity {
        match self {
            AlertEntry::Remote(alert) => alert.severity,
            AlertEntry::Local(alert) => alert.severity,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            AlertEntry::Remote(alert) => &alert.title,
            AlertEntry::Local(alert) => &alert.title,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, AlertEntry::Local(_))
    }
}
