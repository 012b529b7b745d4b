use crate::helpers::{TestCa, self_signed_localhost_server};

use companion_core::crypto::tls::{CaCertificate, PinningMode, TlsSettings};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rustls::RootCertStore;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use rustls::server::{ServerConfig, WebPkiClientVerifier};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::{TlsAcceptor, TlsConnector};

const GREETING: &[u8] = b"sensor-ok";

fn provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

/// Server that demands a client certificate issued by `ca`.
fn mutual_tls_server(
    ca: &TestCa,
    chain: CertificateDer<'static>,
    key: PrivateKeyDer<'static>,
) -> ServerConfig {
    let mut roots = RootCertStore::empty();
    roots
        .add(ca.certificate.der().clone())
        .expect("trust test CA");
    let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider())
        .build()
        .expect("client verifier");
    ServerConfig::builder_with_provider(provider())
        .with_safe_default_protocol_versions()
        .expect("protocol versions")
        .with_client_cert_verifier(verifier)
        .with_single_cert(vec![chain], key)
        .expect("server certificate")
}

fn anonymous_server(chain: CertificateDer<'static>, key: PrivateKeyDer<'static>) -> ServerConfig {
    ServerConfig::builder_with_provider(provider())
        .with_safe_default_protocol_versions()
        .expect("protocol versions")
        .with_no_client_auth()
        .with_single_cert(vec![chain], key)
        .expect("server certificate")
}

/// Accept TLS connections and greet every one that completes the handshake.
async fn serve(config: ServerConfig) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address = listener.local_addr().expect("local addr");
    let acceptor = TlsAcceptor::from(Arc::new(config));
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                if let Ok(mut tls) = acceptor.accept(stream).await {
                    let _ = tls.write_all(GREETING).await;
                    let _ = tls.shutdown().await;
                }
            });
        }
    });
    address
}

/// Handshake with the companion's client config and read whatever the server sends.
async fn exchange(settings: &TlsSettings, address: SocketAddr) -> Result<Vec<u8>, String> {
    let connector = TlsConnector::from(settings.client_config().map_err(|e| e.to_string())?);
    let server_name = ServerName::try_from("127.0.0.1").expect("ip server name");
    let tcp = TcpStream::connect(address).await.map_err(|e| e.to_string())?;

    let attempt = async {
        let mut tls = connector
            .connect(server_name, tcp)
            .await
            .map_err(|e| e.to_string())?;
        let mut received = Vec::new();
        tls.read_to_end(&mut received)
            .await
            .map_err(|e| e.to_string())?;
        Ok(received)
    };
    tokio::time::timeout(Duration::from_secs(5), attempt)
        .await
        .map_err(|_| String::from("handshake timed out"))?
}

/// **VALUE**: Verifies a paired companion completes mutual TLS with its own sensor.
///
/// **WHY THIS MATTERS**: This is the connection every hydration call and the event stream
/// ride on. A config that builds but never handshakes leaves the user paired and offline.
///
/// **BUG THIS CATCHES**: Would catch:
/// - The client certificate not being presented
/// - The pinned root store missing the sensor CA
/// - IP-address server names failing verification
#[tokio::test]
async fn given_bundle_for_sensor_ca_when_handshaking_with_mutual_tls_then_succeeds() {
    // GIVEN: A sensor whose certificate and our client certificate share one CA
    let ca = TestCa::new();
    let (chain, key) = ca.issue_localhost_server();
    let address = serve(mutual_tls_server(&ca, chain, key)).await;
    let bundle = ca.bundle(&address.to_string());
    let settings = TlsSettings::from_bundle(&bundle).expect("settings from bundle");
    assert!(settings.is_pinned());

    // WHEN
    let result = exchange(&settings, address).await;

    // THEN
    assert_eq!(result.expect("handshake"), GREETING);
}

/// **VALUE**: Verifies pinning refuses a server signed by any other CA.
///
/// **WHY THIS MATTERS**: After pairing, a device on the LAN impersonating the sensor must
/// not receive the bearer certificate or feed the companion forged events.
///
/// **BUG THIS CATCHES**: Would catch the pinned config falling back to accepting any
/// certificate, or to system roots.
#[tokio::test]
async fn given_pinned_to_foreign_ca_when_handshaking_then_rejected() {
    // GIVEN: A server signed by the real CA, and a client pinned to a different one
    let ca = TestCa::new();
    let (chain, key) = ca.issue_localhost_server();
    let address = serve(anonymous_server(chain, key)).await;
    let foreign = TestCa::new();
    let settings = TlsSettings {
        pinning: PinningMode::PinnedTo(CaCertificate::from_pem(&foreign.pem()).expect("CA")),
        identity: None,
    };

    // WHEN
    let result = exchange(&settings, address).await;

    // THEN
    assert!(result.is_err(), "foreign CA accepted: {result:?}");
}

/// **VALUE**: Verifies the pairing-time config talks to a sensor with a self-signed cert.
///
/// **WHY THIS MATTERS**: Before pairing there is no CA to pin, and the sensor serves a
/// certificate the companion has never seen. Pairing cannot start if this fails.
#[tokio::test]
async fn given_unpinned_settings_when_handshaking_with_self_signed_server_then_succeeds() {
    // GIVEN
    let (chain, key) = self_signed_localhost_server();
    let address = serve(anonymous_server(chain, key)).await;

    // WHEN
    let result = exchange(&TlsSettings::unpinned(), address).await;

    // THEN
    assert_eq!(result.expect("handshake"), GREETING);
}

/// **VALUE**: Verifies a sensor requiring client certificates refuses a companion without one.
#[tokio::test]
async fn given_pinned_without_identity_when_sensor_requires_client_cert_then_no_session() {
    // GIVEN
    let ca = TestCa::new();
    let (chain, key) = ca.issue_localhost_server();
    let address = serve(mutual_tls_server(&ca, chain, key)).await;
    let settings = TlsSettings {
        pinning: PinningMode::PinnedTo(CaCertificate::from_pem(&ca.pem()).expect("CA")),
        identity: None,
    };

    // WHEN
    let result = exchange(&settings, address).await;

    // THEN: Either the handshake or the first read fails; the greeting never arrives
    assert_ne!(result.as_deref().ok(), Some(GREETING));
}
