use crate::error::sensor_client::SensorClientError;
use crate::error::transport::TransportError;

use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum SessionError {
    /// The sensor no longer accepts this companion's certificate. Re-pair to recover.
    #[error("Auth Rejected Error: pairing credentials rejected ({message}) {location}")]
    AuthRejected {
        message: String,
        location: ErrorLocation,
    },

    #[error("Hydration Error: {source} {location}")]
    Hydration {
        #[source]
        source: SensorClientError,
        location: ErrorLocation,
    },

    #[error("Transport Error: {source} {location}")]
    Transport {
        #[source]
        source: TransportError,
        location: ErrorLocation,
    },

    #[error("Action Error: '{operation}': {source} {location}")]
    Action {
        operation: &'static str,
        #[source]
        source: SensorClientError,
        location: ErrorLocation,
    },

    #[error("Session Setup Error: {message} {location}")]
    Setup {
        message: String,
        location: ErrorLocation,
    },

    #[error("Session Cancelled Error: connect superseded by disconnect {location}")]
    Cancelled { location: ErrorLocation },
}

impl SessionError {
    #[track_caller]
    pub fn auth_rejected(message: impl Into<String>) -> Self {
        SessionError::AuthRejected {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn setup(message: impl Into<String>) -> Self {
        SessionError::Setup {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn cancelled() -> Self {
        SessionError::Cancelled {
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn action(operation: &'static str, source: SensorClientError) -> Self {
        SessionError::Action {
            operation,
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Hydration failures become `AuthRejected` on 401/403.
    #[track_caller]
    pub fn hydration(source: SensorClientError) -> Self {
        if source.is_auth_rejection() {
            return SessionError::auth_rejected(source.to_string());
        }
        SessionError::Hydration {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn transport(source: TransportError) -> Self {
        if source.is_auth_rejection() {
            return SessionError::auth_rejected(source.to_string());
        }
        SessionError::Transport {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    pub fn is_auth_rejection(&self) -> bool {
        match self {
            SessionError::AuthRejected { .. } => true,
            SessionError::Action { source, .. } => source.is_auth_rejection(),
            _ => false,
        }
    }

    /// Whether calling `connect()` again can succeed without operator action.
    pub fn is_retryable(&self) -> bool {
        match self {
            SessionError::Hydration { .. } => true,
            SessionError::Transport { source, .. } => {
                !matches!(source, TransportError::Tls(_) | TransportError::Url { .. })
            }
            SessionError::Action { source, .. } => source.is_retryable(),
            SessionError::AuthRejected { .. } => false,
            SessionError::Setup { .. } => false,
            SessionError::Cancelled { .. } => false,
        }
    }
}
