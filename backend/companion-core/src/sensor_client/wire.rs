//! JSON bodies of the pairing endpoints. Binary values travel as lowercase hex.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeResponse {
    pub challenge: String,
    pub sensor_id: String,
    pub sensor_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub proof: String,
    pub client_nonce: String,
    pub client_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub encrypted_ca_cert: String,
    /// Sent by the sensor but not part of the key derivation.
    #[serde(default)]
    pub server_nonce: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteRequest {
    pub sensor_id: String,
    pub encrypted_csr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteResponse {
    pub encrypted_client_cert: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct DeployDecoyRequest<'a> {
    pub template: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}
