//! Pairing failures, each tagged with the handshake step that produced it.

use crate::error::crypto::CryptoError;
use crate::error::sensor_client::SensorClientError;
use crate::error::store::StoreError;
use crate::pairing::PairingStep;

use common::{ErrorLocation, HttpStatusCode};

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum PairingError {
    #[error("Invalid Pairing Code Error: {reason} {location}")]
    InvalidCode {
        reason: String,
        location: ErrorLocation,
    },

    #[error("Resolve Error: could not resolve '{service_name}' {location}")]
    Resolve {
        service_name: String,
        location: ErrorLocation,
    },

    #[error("Pairing Rejected Error: sensor refused {step} with HTTP {status_code} {location}")]
    Rejected {
        step: PairingStep,
        status_code: HttpStatusCode,
        location: ErrorLocation,
    },

    #[error("Pairing Request Error: {step} failed: {source} {location}")]
    Request {
        step: PairingStep,
        #[source]
        source: SensorClientError,
        location: ErrorLocation,
    },

    #[error("Pairing Crypto Error: {step} failed: {source} {location}")]
    Crypto {
        step: PairingStep,
        #[source]
        source: CryptoError,
        location: ErrorLocation,
    },

    #[error("Trust Bundle Error: {message} {location}")]
    Bundle {
        message: String,
        location: ErrorLocation,
    },

    #[error("Pairing Store Error: {step} failed: {source} {location}")]
    Store {
        step: PairingStep,
        #[source]
        source: StoreError,
        location: ErrorLocation,
    },

    #[error("Pairing Superseded Error: a newer pairing attempt replaced this one {location}")]
    Superseded { location: ErrorLocation },
}

impl PairingError {
    #[track_caller]
    pub fn invalid_code(reason: impl Into<String>) -> Self {
        PairingError::InvalidCode {
            reason: reason.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn resolve(service_name: impl Into<String>) -> Self {
        PairingError::Resolve {
            service_name: service_name.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Wrap a request failure, promoting 401/403 to [`PairingError::Rejected`].
    #[track_caller]
    pub fn request(step: PairingStep, source: SensorClientError) -> Self {
        if let SensorClientError::AuthRejected { status_code, .. } = &source {
            return PairingError::Rejected {
                step,
                status_code: *status_code,
                location: ErrorLocation::from(Location::caller()),
            };
        }

        PairingError::Request {
            step,
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn crypto(step: PairingStep, source: CryptoError) -> Self {
        PairingError::Crypto {
            step,
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn store(step: PairingStep, source: StoreError) -> Self {
        PairingError::Store {
            step,
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn superseded() -> Self {
        PairingError::Superseded {
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// The handshake step that failed, when the failure happened inside one.
    pub fn step(&self) -> Option<PairingStep> {
        match self {
            PairingError::Resolve { .. } => Some(PairingStep::Resolve),
            PairingError::Rejected { step, .. } => Some(*step),
            PairingError::Request { step, .. } => Some(*step),
            PairingError::Crypto { step, .. } => Some(*step),
            PairingError::Bundle { .. } => Some(PairingStep::Assemble),
            PairingError::Store { step, .. } => Some(*step),
            PairingError::InvalidCode { .. } => None,
            PairingError::Superseded { .. } => None,
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, PairingError::Rejected { .. })
    }
}

impl From<models::ModelError> for PairingError {
    #[track_caller]
    fn from(error: models::ModelError) -> Self {
        PairingError::Bundle {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
