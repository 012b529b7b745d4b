//! rustls client configuration for talking to a sensor.
//!
//! Before pairing there is no CA to trust, so the pairing calls run
//! [`PinningMode::Unpinned`]. Once a [`TrustBundle`] exists every connection
//! is [`PinningMode::PinnedTo`] the stored CA and presents the client
//! certificate. The same [`ClientConfig`] backs the HTTP client and the
//! event stream.

use crate::error::tls::TlsError;

use common::{ErrorLocation, RedactedSecret};
use models::TrustBundle;

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};

/// The sensor CA, kept in both encodings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaCertificate {
    pem: String,
    der: CertificateDer<'static>,
}

impl CaCertificate {
    #[track_caller]
    pub fn from_pem(pem: &str) -> Result<Self, TlsError> {
        let der = CertificateDer::from_pem_slice(pem.as_bytes()).map_err(|e| {
            TlsError::Certificate {
                message: format!("Failed to parse CA certificate: {e}"),
                location: ErrorLocation::from(Location::caller()),
            }
        })?;
        Ok(Self {
            pem: pem.to_string(),
            der,
        })
    }

    pub fn pem(&self) -> &str {
        &self.pem
    }

    pub fn der(&self) -> &CertificateDer<'static> {
        &self.der
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinningMode {
    /// Accept any server identity. Only for the pairing handshake.
    Unpinned,
    PinnedTo(CaCertificate),
}

/// Client certificate chain and key presented for mutual TLS.
pub struct ClientIdentity {
    certificate_chain: Vec<CertificateDer<'static>>,
    private_key: PrivateKeyDer<'static>,
}

impl ClientIdentity {
    #[track_caller]
    pub fn from_pem(certificate_pem: &str, private_key_pem: &RedactedSecret) -> Result<Self, TlsError> {
        let certificate_chain = CertificateDer::pem_slice_iter(certificate_pem.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TlsError::Certificate {
                message: format!("Failed to parse client certificate: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?;
        if certificate_chain.is_empty() {
            return Err(TlsError::Certificate {
                message: "No client certificate found in PEM".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let private_key =
            PrivateKeyDer::from_pem_slice(private_key_pem.as_bytes()).map_err(|e| {
                TlsError::PrivateKey {
                    message: format!("Failed to parse client private key: {e}"),
                    location: ErrorLocation::from(Location::caller()),
                }
            })?;

        Ok(Self {
            certificate_chain,
            private_key,
        })
    }
}

impl Clone for ClientIdentity {
    fn clone(&self) -> Self {
        Self {
            certificate_chain: self.certificate_chain.clone(),
            private_key: self.private_key.clone_key(),
        }
    }
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("certificates", &self.certificate_chain.len())
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct TlsSettings {
    pub pinning: PinningMode,
    pub identity: Option<ClientIdentity>,
}

impl TlsSettings {
    pub fn unpinned() -> Self {
        Self {
            pinning: PinningMode::Unpinned,
            identity: None,
        }
    }

    /// Pinned to the bundle's CA, presenting its client certificate.
    pub fn from_bundle(bundle: &TrustBundle) -> Result<Self, TlsError> {
        Ok(Self {
            pinning: PinningMode::PinnedTo(CaCertificate::from_pem(&bundle.ca_certificate_pem)?),
            identity: Some(ClientIdentity::from_pem(
                &bundle.client_certificate_pem,
                &bundle.client_private_key,
            )?),
        })
    }

    pub fn is_pinned(&self) -> bool {
        matches!(self.pinning, PinningMode::PinnedTo(_))
    }

    pub fn client_config(&self) -> Result<Arc<ClientConfig>, TlsError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());

        let builder = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()
            .map_err(|e| TlsError::Config {
                message: format!("Unsupported protocol versions: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let builder = match &self.pinning {
            PinningMode::Unpinned => builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert { provider })),
            PinningMode::PinnedTo(ca) => {
                let mut roots = RootCertStore::empty();
                roots.add(ca.der.clone()).map_err(|e| TlsError::Certificate {
                    message: format!("Failed to add CA certificate: {e}"),
                    location: ErrorLocation::from(Location::caller()),
                })?;
                builder.with_root_certificates(roots)
            }
        };

        let config = match &self.identity {
            Some(identity) => builder
                .with_client_auth_cert(
                    identity.certificate_chain.clone(),
                    identity.private_key.clone_key(),
                )
                .map_err(|e| TlsError::Config {
                    message: format!("Client certificate rejected: {e}"),
                    location: ErrorLocation::from(Location::caller()),
                })?,
            None => builder.with_no_client_auth(),
        };

        Ok(Arc::new(config))
    }
}

/// Trust-on-first-use verifier. Signatures are still checked so the peer
/// must hold the key for the certificate it presents.
#[derive(Debug)]
struct AcceptAnyServerCert {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
