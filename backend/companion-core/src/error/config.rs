use common::ErrorLocation;

use std::panic::Location;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config Read Error: {path}: {source} {location}")]
    Read {
        location: ErrorLocation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config Parse Error: {path}: {reason} {location}")]
    Parse {
        location: ErrorLocation,
        path: PathBuf,
        reason: String,
    },

    #[error("Config Write Error: {path}: {source} {location}")]
    Write {
        location: ErrorLocation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config Serialization Error: {reason} {location}")]
    Serialize {
        location: ErrorLocation,
        reason: String,
    },

    #[error("Config Validation Error: {reason} {location}")]
    Validation {
        location: ErrorLocation,
        reason: String,
    },
}

impl ConfigError {
    #[track_caller]
    pub fn read(path: &Path, source: std::io::Error) -> Self {
        ConfigError::Read {
            location: ErrorLocation::from(Location::caller()),
            path: path.to_path_buf(),
            source,
        }
    }

    #[track_caller]
    pub fn parse(path: &Path, reason: impl Into<String>) -> Self {
        ConfigError::Parse {
            location: ErrorLocation::from(Location::caller()),
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    #[track_caller]
    pub fn write(path: &Path, source: std::io::Error) -> Self {
        ConfigError::Write {
            location: ErrorLocation::from(Location::caller()),
            path: path.to_path_buf(),
            source,
        }
    }

    #[track_caller]
    pub fn serialize(reason: impl Into<String>) -> Self {
        ConfigError::Serialize {
            location: ErrorLocation::from(Location::caller()),
            reason: reason.into(),
        }
    }

    #[track_caller]
    pub fn validation(reason: impl Into<String>) -> Self {
        ConfigError::Validation {
            location: ErrorLocation::from(Location::caller()),
            reason: reason.into(),
        }
    }
}
