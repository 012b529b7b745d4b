use common::ErrorLocation;

use thiserror::Error as ThisError;

/// Construction-time failures for model records.
///
/// Only the trust bundle builder raises these today; a bundle that fails
/// validation is never handed to the store or the TLS layer.
#[derive(Debug, ThisError)]
pub enum ModelError {
    #[error("Trust Bundle Validation Error: {message} {location}")]
    Validation {
        message: String,
        location: ErrorLocation,
    },
}
