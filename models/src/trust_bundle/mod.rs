//! The durable output of a successful pairing.

pub mod builder;

use common::RedactedSecret;

use serde::{Deserialize, Serialize};

/// Everything needed to talk to a paired sensor over mutual TLS.
///
/// Construct through [`TrustBundleBuilder`](builder::TrustBundleBuilder) so the
/// fields are validated once, at the point the handshake finishes. The private
/// key is a [`RedactedSecret`], so `{:?}` on a bundle is safe to log.
#[derive(Debug, Clone)]
pub struct TrustBundle {
    pub sensor_id: String,
    pub sensor_name: String,
    /// Base address of the sensor's request/response API (`https://host:port`).
    pub address: String,
    pub ca_certificate_pem: String,
    pub client_certificate_pem: String,
    pub client_private_key: RedactedSecret,
    /// `sha256:<hex>` over the client certificate's DER encoding.
    pub fingerprint: String,
}

impl TrustBundle {
    /// The non-secret part of the bundle.
    pub fn paired_sensor(&self) -> PairedSensor {
        PairedSensor {
            sensor_id: self.sensor_id.clone(),
            sensor_name: self.sensor_name.clone(),
            address: self.address.clone(),
            fingerprint: self.fingerprint.clone(),
        }
    }
}

/// Pointer record naming the currently paired sensor.
///
/// Stored next to the secrets so the bundle can be reassembled after restart.
/// Contains nothing that grants access on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairedSensor {
    pub sensor_id: String,
    pub sensor_name: String,
    pub address: String,
    pub fingerprint: String,
}
