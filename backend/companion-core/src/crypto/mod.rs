//! Pairing cryptography.
//!
//! Both sides of the handshake must agree on every constant in here. The
//! proof is HMAC-SHA256 keyed with the pairing code, the shared key is
//! HKDF-SHA256 over the code with `challenge || client_nonce` as salt, and
//! the AEAD is AES-256-GCM with a 12-byte random nonce prefixed to the output.

pub mod tls;

use crate::error::crypto::CryptoError;

use common::{ErrorLocation, RedactedSecret};

use std::fmt;
use std::panic::Location;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand::RngCore;
use rand::rngs::OsRng;
use rcgen::{CertificateParams, DnType, KeyPair};
use rustls::pki_types::CertificateDer;
use rustls::pki_types::pem::PemObject;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

pub const PROOF_LEN: usize = 32;
pub const SHARED_KEY_LEN: usize = 32;
pub const CLIENT_NONCE_LEN: usize = 32;
pub const AEAD_NONCE_LEN: usize = 12;
pub const AEAD_TAG_LEN: usize = 16;
pub const FINGERPRINT_PREFIX: &str = "sha256:";
pub const KEY_DERIVATION_INFO_PREFIX: &[u8] = b"sensor-pairing-v1|";

type HmacSha256 = Hmac<Sha256>;

/// Symmetric key shared with the sensor for the duration of one handshake.
///
/// Wiped on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedKey([u8; SHARED_KEY_LEN]);

impl SharedKey {
    pub fn from_bytes(bytes: [u8; SHARED_KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SHARED_KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedKey([REDACTED])")
    }
}

impl Drop for SharedKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// A freshly generated keypair and the signing request naming it.
#[derive(Debug)]
pub struct CertificateRequest {
    pub csr_pem: String,
    pub private_key_pem: RedactedSecret,
}

/// HMAC-SHA256 over `challenge`, keyed with the pairing code.
pub fn compute_proof(challenge: &[u8], code: &str) -> Result<[u8; PROOF_LEN], CryptoError> {
    // `KeyInit` from aes-gcm also provides `new_from_slice` for HMAC.
    let mut mac = <HmacSha256 as Mac>::new_from_slice(code.as_bytes()).map_err(|e| {
        CryptoError::KeyDerivation {
            message: format!("Failed to key proof MAC: {e}"),
            location: ErrorLocation::from(Location::caller()),
        }
    })?;
    mac.update(challenge);
    Ok(mac.finalize().into_bytes().into())
}

/// 32 random bytes from the OS RNG.
pub fn generate_client_nonce() -> [u8; CLIENT_NONCE_LEN] {
    let mut nonce = [0u8; CLIENT_NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

pub fn derive_shared_key(
    code: &str,
    challenge: &[u8],
    client_nonce: &[u8],
    sensor_id: &str,
) -> Result<SharedKey, CryptoError> {
    let mut salt = Vec::with_capacity(challenge.len() + client_nonce.len());
    salt.extend_from_slice(challenge);
    salt.extend_from_slice(client_nonce);

    let mut info = Vec::with_capacity(KEY_DERIVATION_INFO_PREFIX.len() + sensor_id.len());
    info.extend_from_slice(KEY_DERIVATION_INFO_PREFIX);
    info.extend_from_slice(sensor_id.as_bytes());

    let hkdf = Hkdf::<Sha256>::new(Some(&salt), code.as_bytes());
    let mut okm = [0u8; SHARED_KEY_LEN];
    hkdf.expand(&info, &mut okm)
        .map_err(|e| CryptoError::KeyDerivation {
            message: format!("HKDF expand failed: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

    Ok(SharedKey(okm))
}

/// Output layout: `nonce(12) || ciphertext || tag(16)`.
pub fn encrypt(plaintext: &[u8], key: &SharedKey) -> Result<Vec<u8>, CryptoError> {
    let cipher = cipher_for(key)?;

    let mut nonce_bytes = [0u8; AEAD_NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::Cipher {
            message: format!("Encryption failed: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let mut output = Vec::with_capacity(AEAD_NONCE_LEN + ciphertext.len());
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

pub fn decrypt(ciphertext: &[u8], key: &SharedKey) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() < AEAD_NONCE_LEN + AEAD_TAG_LEN {
        return Err(CryptoError::decryption(format!(
            "Ciphertext too short: {} bytes",
            ciphertext.len()
        )));
    }

    let cipher = cipher_for(key)?;
    let (nonce_bytes, sealed) = ciphertext.split_at(AEAD_NONCE_LEN);

    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), sealed)
        .map_err(|_| CryptoError::decryption("Authentication tag mismatch"))
}

fn cipher_for(key: &SharedKey) -> Result<Aes256Gcm, CryptoError> {
    Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|e| CryptoError::Cipher {
        message: format!("Failed to create cipher: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })
}

/// Generate an ECDSA P-256 keypair and a PEM signing request for `common_name`.
pub fn generate_certificate_request(common_name: &str) -> Result<CertificateRequest, CryptoError> {
    let key_pair = KeyPair::generate()?;

    let mut params = CertificateParams::new(Vec::<String>::new())?;
    params
        .distinguished_name
        .push(DnType::CommonName, common_name);

    let csr_pem = params.serialize_request(&key_pair)?.pem()?;

    Ok(CertificateRequest {
        csr_pem,
        private_key_pem: RedactedSecret::new(key_pair.serialize_pem()),
    })
}

/// `sha256:<hex>` over a certificate's DER encoding.
pub fn fingerprint(certificate_der: &[u8]) -> String {
    format!(
        "{FINGERPRINT_PREFIX}{}",
        hex::encode(Sha256::digest(certificate_der))
    )
}

/// Fingerprint of the first certificate in a PEM document.
pub fn fingerprint_pem(certificate_pem: &str) -> Result<String, CryptoError> {
    let der = certificate_der_from_pem(certificate_pem)?;
    Ok(fingerprint(der.as_ref()))
}

pub fn certificate_der_from_pem(
    certificate_pem: &str,
) -> Result<CertificateDer<'static>, CryptoError> {
    CertificateDer::from_pem_slice(certificate_pem.as_bytes())
        .map_err(|e| CryptoError::certificate(format!("Failed to parse certificate PEM: {e}")))
}

pub fn hex_encode(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Fails on odd length or non-hex characters.
pub fn hex_decode(encoded: &str) -> Result<Vec<u8>, CryptoError> {
    Ok(hex::decode(encoded)?)
}
