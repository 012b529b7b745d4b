//! Error types for the sensor request/response API.
//!
//! - HTTP status codes are stored as [`HttpStatusCode`], never parsed from text
//! - 401/403 get their own variant so callers can route to re-pairing
//! - Decode failures are distinct from transport failures

use crate::error::tls::TlsError;

use common::{ErrorLocation, HttpStatusCode};

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum SensorClientError {
    #[error("HTTP Error: '{endpoint}': {message} {location}")]
    Http {
        endpoint: String,
        message: String,
        is_timeout: bool,
        is_connection: bool,
        location: ErrorLocation,
    },

    #[error("Auth Rejected Error: '{endpoint}': HTTP {status_code} {location}")]
    AuthRejected {
        endpoint: String,
        status_code: HttpStatusCode,
        location: ErrorLocation,
    },

    #[error("Server Error: '{endpoint}': HTTP {status_code} - {message} {location}")]
    Status {
        endpoint: String,
        status_code: HttpStatusCode,
        message: String,
        location: ErrorLocation,
    },

    #[error("Decode Error: '{endpoint}': {message} {location}")]
    Decode {
        endpoint: String,
        message: String,
        location: ErrorLocation,
    },

    #[error("URL Parse Error: {message} {location}")]
    UrlParse {
        message: String,
        location: ErrorLocation,
    },

    #[error(transparent)]
    Tls(#[from] TlsError),
}

impl SensorClientError {
    /// Categorise a reqwest failure before it is flattened to a string.
    #[track_caller]
    pub fn from_reqwest(endpoint: impl Into<String>, error: &reqwest::Error) -> Self {
        let endpoint = endpoint.into();

        if error.is_decode() {
            return SensorClientError::Decode {
                endpoint,
                message: error.to_string(),
                location: ErrorLocation::from(Location::caller()),
            };
        }

        if let Some(status) = error.status() {
            return SensorClientError::from_http_response(
                endpoint,
                status.as_u16(),
                error.to_string(),
            );
        }

        SensorClientError::Http {
            endpoint,
            message: error.to_string(),
            is_timeout: error.is_timeout(),
            is_connection: error.is_connect(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn from_http_response(
        endpoint: impl Into<String>,
        status_code: u16,
        body: impl Into<String>,
    ) -> Self {
        let status_code = HttpStatusCode(status_code);
        if status_code.is_auth_rejection() {
            return SensorClientError::AuthRejected {
                endpoint: endpoint.into(),
                status_code,
                location: ErrorLocation::from(Location::caller()),
            };
        }

        SensorClientError::Status {
            endpoint: endpoint.into(),
            status_code,
            message: body.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn decode(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        SensorClientError::Decode {
            endpoint: endpoint.into(),
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, SensorClientError::AuthRejected { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, SensorClientError::Decode { .. })
    }

    /// Connectivity-class failures. Decode errors count, auth rejection never does.
    pub fn is_retryable(&self) -> bool {
        match self {
            SensorClientError::Http { .. } => true,
            SensorClientError::Decode { .. } => true,
            SensorClientError::Status { status_code, .. } => {
                status_code.is_retryable() || status_code.is_server_error()
            }
            SensorClientError::AuthRejected { .. } => false,
            SensorClientError::UrlParse { .. } => false,
            SensorClientError::Tls(_) => false,
        }
    }

    pub fn error_category(&self) -> &'static str {
        match self {
            SensorClientError::Http { is_timeout: true, .. } => "timeout",
            SensorClientError::Http { is_connection: true, .. } => "connection",
            SensorClientError::Http { .. } => "network",
            SensorClientError::AuthRejected { .. } => "auth_rejected",
            SensorClientError::Status { status_code, .. } if status_code.is_client_error() => {
                "client_error"
            }
            SensorClientError::Status { status_code, .. } if status_code.is_server_error() => {
                "server_error"
            }
            SensorClientError::Status { .. } => "status",
            SensorClientError::Decode { .. } => "decode",
            SensorClientError::UrlParse { .. } => "url_parse",
            SensorClientError::Tls(_) => "tls",
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            SensorClientError::AuthRejected { status_code, .. } => Some(status_code.0),
            SensorClientError::Status { status_code, .. } => Some(status_code.0),
            _ => None,
        }
    }
}

impl From<url::ParseError> for SensorClientError {
    #[track_caller]
    fn from(error: url::ParseError) -> Self {
        SensorClientError::UrlParse {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
