//! JSON frames exchanged over the event stream, discriminated by `type`.

use crate::error::transport::TransportError;

use models::SensorEvent;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    AuthOk,
    AuthError {
        #[serde(default)]
        reason: String,
    },
    Event(SensorEvent),
    ReplayComplete {
        last_seq: u64,
    },
    Ping,
}

impl InboundFrame {
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            InboundFrame::AuthOk => "auth_ok",
            InboundFrame::AuthError { .. } => "auth_error",
            InboundFrame::Event(_) => "event",
            InboundFrame::ReplayComplete { .. } => "replay_complete",
            InboundFrame::Ping => "ping",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    Auth {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fingerprint: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
    },
    Replay {
        since_seq: u64,
    },
    Pong,
}

impl OutboundFrame {
    pub fn encode(&self) -> Result<String, TransportError> {
        Ok(serde_json::to_string(self)?)
    }
}
