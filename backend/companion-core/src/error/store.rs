use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

/// Failures reported by the secure credential store.
///
/// Deleting an absent label is not an error; stores must treat it as success.
#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("Store Locked Error: credential store is locked {location}")]
    Locked { location: ErrorLocation },

    #[error("Store Read Error: '{label}': {message} {location}")]
    Read {
        label: String,
        message: String,
        location: ErrorLocation,
    },

    #[error("Store Write Error: '{label}': {message} {location}")]
    Write {
        label: String,
        message: String,
        location: ErrorLocation,
    },

    #[error("Store Delete Error: '{label}': {message} {location}")]
    Delete {
        label: String,
        message: String,
        location: ErrorLocation,
    },

    #[error("Store Corrupt Error: '{label}': {message} {location}")]
    Corrupt {
        label: String,
        message: String,
        location: ErrorLocation,
    },
}

impl StoreError {
    #[track_caller]
    pub fn locked() -> Self {
        StoreError::Locked {
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn read(label: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Read {
            label: label.into(),
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn write(label: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Write {
            label: label.into(),
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn delete(label: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Delete {
            label: label.into(),
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn corrupt(label: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Corrupt {
            label: label.into(),
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
