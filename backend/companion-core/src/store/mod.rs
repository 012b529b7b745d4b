//! Secure credential store seam and trust bundle persistence.
//!
//! The store itself is an external capability (an OS keychain, or the CLI's
//! file store). This module decides the label layout and the write order so
//! a reader never sees half a bundle.

pub mod memory;

pub use memory::MemoryCredentialStore;

use crate::error::store::StoreError;

use common::RedactedSecret;
use models::{PairedSensor, TrustBundle, TrustBundleBuilder};

use std::sync::Arc;

use log::{debug, info, warn};

pub const PAIRED_SENSOR_LABEL: &str = "paired-sensor";
const CA_CERT_SUFFIX: &str = "ca-cert";
const CLIENT_CERT_SUFFIX: &str = "client-cert";
const PRIVATE_KEY_SUFFIX: &str = "private-key";

/// Label-addressed secret storage.
///
/// Implementations must treat deleting an absent label as success.
pub trait CredentialStore: Send + Sync {
    fn store(&self, label: &str, bytes: &[u8]) -> Result<(), StoreError>;

    fn load(&self, label: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn delete(&self, label: &str) -> Result<(), StoreError>;
}

impl<T: CredentialStore + ?Sized> CredentialStore for Arc<T> {
    fn store(&self, label: &str, bytes: &[u8]) -> Result<(), StoreError> {
        (**self).store(label, bytes)
    }

    fn load(&self, label: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).load(label)
    }

    fn delete(&self, label: &str) -> Result<(), StoreError> {
        (**self).delete(label)
    }
}

/// The three secret labels for one sensor, scoped by its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleLabels {
    pub ca_cert: String,
    pub client_cert: String,
    pub private_key: String,
}

impl BundleLabels {
    pub fn for_sensor(sensor_id: &str) -> Self {
        Self {
            ca_cert: format!("{sensor_id}.{CA_CERT_SUFFIX}"),
            client_cert: format!("{sensor_id}.{CLIENT_CERT_SUFFIX}"),
            private_key: format!("{sensor_id}.{PRIVATE_KEY_SUFFIX}"),
        }
    }

    fn all(&self) -> [&str; 3] {
        [&self.ca_cert, &self.client_cert, &self.private_key]
    }
}

/// Write the secrets, then the pointer. On failure, everything written so far
/// is removed again.
pub fn persist_trust_bundle<S: CredentialStore + ?Sized>(
    store: &S,
    bundle: &TrustBundle,
) -> Result<(), StoreError> {
    let labels = BundleLabels::for_sensor(&bundle.sensor_id);
    let pointer = serde_json::to_vec(&bundle.paired_sensor())
        .map_err(|e| StoreError::write(PAIRED_SENSOR_LABEL, e.to_string()))?;

    let writes: [(&str, &[u8]); 4] = [
        (&labels.ca_cert, bundle.ca_certificate_pem.as_bytes()),
        (&labels.client_cert, bundle.client_certificate_pem.as_bytes()),
        (&labels.private_key, bundle.client_private_key.as_bytes()),
        (PAIRED_SENSOR_LABEL, &pointer),
    ];

    for (index, (label, bytes)) in writes.iter().enumerate() {
        if let Err(e) = store.store(label, bytes) {
            warn!("Failed to store '{label}', rolling back {index} earlier writes");
            for (written, _) in &writes[..index] {
                if let Err(rollback) = store.delete(written) {
                    warn!("Rollback of '{written}' failed: {rollback}");
                }
            }
            return Err(e);
        }
    }

    info!(
        "Persisted trust bundle for sensor '{}' ({})",
        bundle.sensor_id, bundle.fingerprint
    );
    Ok(())
}

/// The currently paired sensor, if the pointer record exists.
pub fn load_paired_sensor<S: CredentialStore + ?Sized>(
    store: &S,
) -> Result<Option<PairedSensor>, StoreError> {
    let Some(bytes) = store.load(PAIRED_SENSOR_LABEL)? else {
        return Ok(None);
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| StoreError::corrupt(PAIRED_SENSOR_LABEL, e.to_string()))
}

/// Reassemble the bundle of the currently paired sensor.
///
/// A pointer whose secrets are missing is reported as corrupt rather than
/// silently ignored.
pub fn load_trust_bundle<S: CredentialStore + ?Sized>(
    store: &S,
) -> Result<Option<TrustBundle>, StoreError> {
    let Some(paired) = load_paired_sensor(store)? else {
        return Ok(None);
    };

    let labels = BundleLabels::for_sensor(&paired.sensor_id);
    let ca_cert = load_text(store, &labels.ca_cert)?;
    let client_cert = load_text(store, &labels.client_cert)?;
    let private_key = load_required(store, &labels.private_key)?;
    let private_key = RedactedSecret::from_utf8(private_key)
        .ok_or_else(|| StoreError::corrupt(labels.private_key.as_str(), "not valid UTF-8"))?;

    TrustBundleBuilder::default()
        .with_sensor_id(paired.sensor_id)
        .with_sensor_name(paired.sensor_name)
        .with_address(paired.address)
        .with_ca_certificate_pem(ca_cert)
        .with_client_certificate_pem(client_cert)
        .with_client_private_key(private_key)
        .with_fingerprint(paired.fingerprint)
        .build()
        .map(Some)
        .map_err(|e| StoreError::corrupt(PAIRED_SENSOR_LABEL, e.to_string()))
}

/// Delete the sensor's secrets, then clear the pointer if it names this sensor.
///
/// Idempotent: missing labels are not errors.
pub fn delete_trust_bundle<S: CredentialStore + ?Sized>(
    store: &S,
    sensor_id: &str,
) -> Result<(), StoreError> {
    let labels = BundleLabels::for_sensor(sensor_id);
    for label in labels.all() {
        store.delete(label)?;
    }

    match load_paired_sensor(store) {
        Ok(Some(paired)) if paired.sensor_id != sensor_id => {
            debug!(
                "Pointer names sensor '{}', leaving it in place",
                paired.sensor_id
            );
        }
        Ok(_) | Err(StoreError::Corrupt { .. }) => store.delete(PAIRED_SENSOR_LABEL)?,
        Err(e) => return Err(e),
    }

    info!("Deleted trust bundle for sensor '{sensor_id}'");
    Ok(())
}

fn load_required<S: CredentialStore + ?Sized>(
    store: &S,
    label: &str,
) -> Result<Vec<u8>, StoreError> {
    store
        .load(label)?
        .ok_or_else(|| StoreError::corrupt(label, "missing from store"))
}

fn load_text<S: CredentialStore + ?Sized>(store: &S, label: &str) -> Result<String, StoreError> {
    String::from_utf8(load_required(store, label)?)
        .map_err(|_| StoreError::corrupt(label, "not valid UTF-8"))
}
