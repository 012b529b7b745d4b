use crate::error::model_error::ModelError;
use crate::TrustBundle;

use common::{ErrorLocation, RedactedSecret};

use std::panic::Location;

const CERTIFICATE_PEM_MARKER: &str = "-----BEGIN CERTIFICATE-----";
const FINGERPRINT_PREFIX: &str = "sha256:";
const FINGERPRINT_HEX_LEN: usize = 64;

/// Builder for creating validated TrustBundle instances.
#[derive(Debug, Default)]
pub struct TrustBundleBuilder {
    sensor_id: Option<String>,
    sensor_name: Option<String>,
    address: Option<String>,
    ca_certificate_pem: Option<String>,
    client_certificate_pem: Option<String>,
    client_private_key: Option<RedactedSecret>,
    fingerprint: Option<String>,
}

impl TrustBundleBuilder {
    pub fn with_sensor_id(mut self, sensor_id: impl Into<String>) -> Self {
        self.sensor_id = Some(sensor_id.into());
        self
    }

    pub fn with_sensor_name(mut self, sensor_name: impl Into<String>) -> Self {
        self.sensor_name = Some(sensor_name.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_ca_certificate_pem(mut self, pem: impl Into<String>) -> Self {
        self.ca_certificate_pem = Some(pem.into());
        self
    }

    pub fn with_client_certificate_pem(mut self, pem: impl Into<String>) -> Self {
        self.client_certificate_pem = Some(pem.into());
        self
    }

    pub fn with_client_private_key(mut self, key: RedactedSecret) -> Self {
        self.client_private_key = Some(key);
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    /// Build the TrustBundle with validation.
    #[track_caller]
    pub fn build(self) -> Result<TrustBundle, ModelError> {
        let sensor_id = required(self.sensor_id, "Sensor ID")?;
        let sensor_name = required(self.sensor_name, "Sensor name")?;
        let address = required(self.address, "Address")?;

        if !address.starts_with("http://") && !address.starts_with("https://") {
            return Err(ModelError::Validation {
                message: format!("Invalid address format: {address}"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let ca_certificate_pem = required(self.ca_certificate_pem, "CA certificate")?;
        if !ca_certificate_pem.contains(CERTIFICATE_PEM_MARKER) {
            return Err(ModelError::Validation {
                message: String::from("CA certificate is not PEM encoded"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let client_certificate_pem =
            required(self.client_certificate_pem, "Client certificate")?;
        if !client_certificate_pem.contains(CERTIFICATE_PEM_MARKER) {
            return Err(ModelError::Validation {
                message: String::from("Client certificate is not PEM encoded"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let client_private_key = self.client_private_key.ok_or_else(|| ModelError::Validation {
            message: String::from("Client private key is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if client_private_key.is_empty() {
            return Err(ModelError::Validation {
                message: String::from("Client private key cannot be empty"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let fingerprint = required(self.fingerprint, "Fingerprint")?;
        let well_formed = fingerprint
            .strip_prefix(FINGERPRINT_PREFIX)
            .is_some_and(|hex| {
                hex.len() == FINGERPRINT_HEX_LEN && hex.chars().all(|c| c.is_ascii_hexdigit())
            });

        if !well_formed {
            return Err(ModelError::Validation {
                message: format!("Invalid fingerprint format: {fingerprint}"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(TrustBundle {
            sensor_id,
            sensor_name,
            address,
            ca_certificate_pem,
            client_certificate_pem,
            client_private_key,
            fingerprint,
        })
    }
}

#[track_caller]
fn required(value: Option<String>, field: &str) -> Result<String, ModelError> {
    let value = value.ok_or_else(|| ModelError::Validation {
        message: format!("{field} is required"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    if value.is_empty() {
        return Err(ModelError::Validation {
            message: format!("{field} cannot be empty"),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    Ok(value)
}
