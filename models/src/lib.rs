//! Domain models for the sensor companion.
//!
//! This crate contains pure data structures representing what the companion
//! knows about a paired sensor. Models have no business logic beyond
//! construction-time validation - they're just data passed between layers.
//!
//! ## Architecture
//!
//! - **models** (this crate): Pure data structures
//! - **companion-core**: Pairing, session, and transport logic operating on models
//! - **companion**: CLI wiring everything together

pub mod action;
pub mod alert;
pub mod error;
pub mod event;
pub mod sensor;
pub mod trust_bundle;

#[cfg(test)]
mod tests;

pub use action::{PendingAction, SensorAction};
pub use alert::{
    Alert, AlertEntry, AlertKey, AlertSeverity, SyntheticAlert, SyntheticAlertId,
    SyntheticAlertKind,
};
pub use error::model_error::ModelError;
pub use event::{EventKind, SensorEvent};
pub use sensor::{Decoy, Device, Health, HydrationSnapshot, LearningStatus, SensorStatus};
pub use trust_bundle::builder::TrustBundleBuilder;
pub use trust_bundle::{PairedSensor, TrustBundle};
