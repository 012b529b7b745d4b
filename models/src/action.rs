//! Remote mutations the user can trigger from the companion.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// One remote mutation: the operation plus its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SensorAction {
    AcknowledgeAlert { alert_id: u64 },
    ResolveAlert { alert_id: u64 },
    TrustDevice { device_id: String },
    BlockDevice { device_id: String },
    DeployDecoy { template: String, port: Option<u16> },
    RemoveDecoy { decoy_id: String },
    SetLearning { enabled: bool },
}

impl SensorAction {
    /// Stable operation name for logging.
    pub fn operation(&self) -> &'static str {
        match self {
            SensorAction::AcknowledgeAlert { .. } => "acknowledge_alert",
            SensorAction::ResolveAlert { .. } => "resolve_alert",
            SensorAction::TrustDevice { .. } => "trust_device",
            SensorAction::BlockDevice { .. } => "block_device",
            SensorAction::DeployDecoy { .. } => "deploy_decoy",
            SensorAction::RemoveDecoy { .. } => "remove_decoy",
            SensorAction::SetLearning { .. } => "set_learning",
        }
    }
}

/// An action captured while the session was not live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub action: SensorAction,
    pub queued_at: SystemTime,
}

impl PendingAction {
    pub fn new(action: SensorAction) -> Self {
        Self {
            action,
            queued_at: SystemTime::now(),
        }
    }
}

impl From<SensorAction> for PendingAction {
    fn from(action: SensorAction) -> Self {
        PendingAction::new(action)
    }
}
