use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum CryptoError {
    #[error("Hex Decode Error: {message} {location}")]
    HexDecode {
        message: String,
        location: ErrorLocation,
    },

    #[error("Key Derivation Error: {message} {location}")]
    KeyDerivation {
        message: String,
        location: ErrorLocation,
    },

    #[error("Cipher Error: {message} {location}")]
    Cipher {
        message: String,
        location: ErrorLocation,
    },

    /// Tag mismatch, truncated input, or wrong key. AES-GCM does not say which.
    #[error("Decryption Error: {message} {location}")]
    Decryption {
        message: String,
        location: ErrorLocation,
    },

    #[error("Key Generation Error: {message} {location}")]
    KeyGeneration {
        message: String,
        location: ErrorLocation,
    },

    #[error("Certificate Error: {message} {location}")]
    Certificate {
        message: String,
        location: ErrorLocation,
    },
}

impl CryptoError {
    #[track_caller]
    pub fn decryption(message: impl Into<String>) -> Self {
        CryptoError::Decryption {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn certificate(message: impl Into<String>) -> Self {
        CryptoError::Certificate {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<hex::FromHexError> for CryptoError {
    #[track_caller]
    fn from(error: hex::FromHexError) -> Self {
        CryptoError::HexDecode {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<rcgen::Error> for CryptoError {
    #[track_caller]
    fn from(error: rcgen::Error) -> Self {
        CryptoError::KeyGeneration {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
