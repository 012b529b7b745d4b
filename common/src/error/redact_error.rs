use crate::ErrorLocation;

use thiserror::Error as ThisError;

/// Raised when secret material is asked to leave its wrapper implicitly.
#[derive(Debug, ThisError)]
pub enum RedactError {
    /// A `RedactedSecret` reached a serializer (config, log record, wire body)
    #[error("Redacted Secret Error: {message} {location}")]
    Serialization {
        message: String,
        location: ErrorLocation,
    },
}
