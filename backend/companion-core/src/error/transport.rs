use crate::error::tls::TlsError;

use common::{ErrorLocation, HttpStatusCode};

use std::panic::Location;

use thiserror::Error as ThisError;
use tokio_tungstenite::tungstenite;

#[derive(Debug, ThisError)]
pub enum TransportError {
    #[error("Connect Error: {message} {location}")]
    Connect {
        message: String,
        location: ErrorLocation,
    },

    /// The sensor refused the WebSocket upgrade with 401/403.
    #[error("Auth Rejected Error: event stream upgrade refused with HTTP {status_code} {location}")]
    AuthRejected {
        status_code: HttpStatusCode,
        location: ErrorLocation,
    },

    #[error("Not Connected Error: event transport is not connected {location}")]
    NotConnected { location: ErrorLocation },

    #[error("Send Error: {message} {location}")]
    Send {
        message: String,
        location: ErrorLocation,
    },

    #[error("Encode Error: {message} {location}")]
    Encode {
        message: String,
        location: ErrorLocation,
    },

    #[error("URL Error: {message} {location}")]
    Url {
        message: String,
        location: ErrorLocation,
    },

    #[error(transparent)]
    Tls(#[from] TlsError),
}

impl TransportError {
    #[track_caller]
    pub fn not_connected() -> Self {
        TransportError::NotConnected {
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn url(message: impl Into<String>) -> Self {
        TransportError::Url {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Classify a failed WebSocket handshake.
    #[track_caller]
    pub fn from_handshake(error: &tungstenite::Error) -> Self {
        if let tungstenite::Error::Http(response) = error {
            let status_code = HttpStatusCode(response.status().as_u16());
            if status_code.is_auth_rejection() {
                return TransportError::AuthRejected {
                    status_code,
                    location: ErrorLocation::from(Location::caller()),
                };
            }
        }

        TransportError::Connect {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, TransportError::AuthRejected { .. })
    }
}

impl From<serde_json::Error> for TransportError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        TransportError::Encode {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
