use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum TlsError {
    #[error("TLS Certificate Error: {message} {location}")]
    Certificate {
        message: String,
        location: ErrorLocation,
    },

    #[error("TLS Private Key Error: {message} {location}")]
    PrivateKey {
        message: String,
        location: ErrorLocation,
    },

    #[error("TLS Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },
}
