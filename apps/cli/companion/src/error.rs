use companion_core::error::config::ConfigError;
use companion_core::error::pairing::PairingError;
use companion_core::error::sensor_client::SensorClientError;
use companion_core::error::session::SessionError;
use companion_core::error::store::StoreError;
use companion_core::error::tls::TlsError;

use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error;

/// Errors surfaced by the `companion` binary.
///
/// Core errors are flattened to their message at the boundary; the
/// location points at the command that hit them.
#[derive(Debug, Error)]
pub enum CompanionError {
    /// Error from this binary itself (filesystem, logger, arguments)
    #[error("Companion Error: {message} {location}")]
    Companion {
        message: String,
        location: ErrorLocation,
    },

    /// Error from companion-core operations
    #[error("Core Error: {message} {location}")]
    Core {
        message: String,
        location: ErrorLocation,
    },

    /// No trust bundle in the credential store
    #[error("Not Paired Error: {message} {location}")]
    NotPaired {
        message: String,
        location: ErrorLocation,
    },

    /// The sensor refused our credentials; the user must pair again
    #[error("Auth Failed Error: {message} {location}")]
    AuthFailed {
        message: String,
        location: ErrorLocation,
    },
}

impl CompanionError {
    #[track_caller]
    pub fn companion(message: impl Into<String>) -> Self {
        CompanionError::Companion {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn not_paired() -> Self {
        CompanionError::NotPaired {
            message: String::from("no sensor is paired, run `companion pair` first"),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn auth_failed(message: impl Into<String>) -> Self {
        CompanionError::AuthFailed {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    fn core(message: impl Into<String>) -> Self {
        CompanionError::Core {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<PairingError> for CompanionError {
    #[track_caller]
    fn from(error: PairingError) -> Self {
        CompanionError::core(error.to_string())
    }
}

impl From<SessionError> for CompanionError {
    #[track_caller]
    fn from(error: SessionError) -> Self {
        if error.is_auth_rejection() {
            return CompanionError::auth_failed(format!(
                "{error}. Run `companion unpair` and pair again"
            ));
        }
        CompanionError::core(error.to_string())
    }
}

impl From<ConfigError> for CompanionError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        CompanionError::core(error.to_string())
    }
}

impl From<StoreError> for CompanionError {
    #[track_caller]
    fn from(error: StoreError) -> Self {
        CompanionError::core(error.to_string())
    }
}

impl From<SensorClientError> for CompanionError {
    #[track_caller]
    fn from(error: SensorClientError) -> Self {
        if error.is_auth_rejection() {
            return CompanionError::auth_failed(format!(
                "{error}. Run `companion unpair` and pair again"
            ));
        }
        CompanionError::core(error.to_string())
    }
}

impl From<TlsError> for CompanionError {
    #[track_caller]
    fn from(error: TlsError) -> Self {
        CompanionError::core(error.to_string())
    }
}
