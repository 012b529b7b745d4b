//! Shared fixtures: a scripted event stream server, a fake pairing sensor on
//! wiremock, certificate minting, and a consumer that records every call.

use companion_core::crypto::{
    SharedKey, compute_proof, decrypt, derive_shared_key, encrypt, hex_decode, hex_encode,
};
use companion_core::sensor_client::wire::{
    ChallengeResponse, CompleteRequest, CompleteResponse, VerifyRequest, VerifyResponse,
};
use companion_core::session::{SessionState, StateConsumer};

use common::RedactedSecret;
use models::{HydrationSnapshot, SensorEvent, SyntheticAlert, TrustBundle, TrustBundleBuilder};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, CertificateSigningRequestParams, DnType,
    ExtendedKeyUsagePurpose, IsCa, KeyPair,
};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const TEST_CODE: &str = "482913";
pub const TEST_SENSOR_ID: &str = "sensor-test-1";
pub const TEST_SENSOR_NAME: &str = "Den Sensor";
pub const TEST_CHALLENGE: &[u8] = b"fixed-challenge-bytes-for-tests!";
pub const TEST_FINGERPRINT: &str =
    "sha256:abababababababababababababababababababababababababababababababab";

// ============================================
// POLLING
// ============================================

/// Poll `condition` every 10ms until it holds or `timeout` passes.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Paths of every request wiremock has seen, in arrival order.
pub async fn received_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| format!("{} {}", request.method, request.url.path()))
        .collect()
}

/// Wait until wiremock has seen `count` requests whose path starts with `prefix`.
pub async fn wait_for_requests(server: &MockServer, prefix: &str, count: usize) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let seen = received_paths(server)
            .await
            .iter()
            .filter(|line| line.contains(prefix))
            .count();
        if seen >= count {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

// ============================================
// CERTIFICATES
// ============================================

pub struct TestCa {
    pub certificate: Certificate,
    pub key_pair: KeyPair,
}

impl TestCa {
    pub fn new() -> Self {
        let key_pair = KeyPair::generate().expect("CA key generation");
        let mut params = CertificateParams::new(Vec::<String>::new()).expect("CA params");
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params
            .distinguished_name
            .push(DnType::CommonName, "Sensor Test CA");
        let certificate = params.self_signed(&key_pair).expect("self-signed CA");
        Self {
            certificate,
            key_pair,
        }
    }

    pub fn pem(&self) -> String {
        self.certificate.pem()
    }

    /// Sign a companion CSR the way the sensor would.
    pub fn sign_csr(&self, csr_pem: &str) -> String {
        CertificateSigningRequestParams::from_pem(csr_pem)
            .expect("parse CSR")
            .signed_by(&self.certificate, &self.key_pair)
            .expect("sign CSR")
            .pem()
    }

    /// Mint a client certificate and matching key without going through pairing.
    pub fn issue_client(&self, common_name: &str) -> (String, RedactedSecret) {
        let key_pair = KeyPair::generate().expect("client key generation");
        let mut params = CertificateParams::new(Vec::<String>::new()).expect("client params");
        params
            .distinguished_name
            .push(DnType::CommonName, common_name);
        let certificate = params
            .signed_by(&key_pair, &self.certificate, &self.key_pair)
            .expect("sign client certificate");
        (certificate.pem(), RedactedSecret::new(key_pair.serialize_pem()))
    }

    /// Server leaf for `127.0.0.1`, in the DER form a rustls acceptor wants.
    pub fn issue_localhost_server(&self) -> (CertificateDer<'static>, PrivateKeyDer<'static>) {
        let key_pair = KeyPair::generate().expect("server key generation");
        let certificate = localhost_server_params()
            .signed_by(&key_pair, &self.certificate, &self.key_pair)
            .expect("sign server certificate");
        (certificate.der().clone(), private_key_der(&key_pair))
    }

    /// A complete, internally consistent bundle pointing at `address`.
    pub fn bundle(&self, address: &str) -> TrustBundle {
        let (client_pem, private_key) = self.issue_client("sensor-companion-test");
        let fingerprint =
            companion_core::crypto::fingerprint_pem(&client_pem).expect("fingerprint");
        TrustBundleBuilder::default()
            .with_sensor_id(TEST_SENSOR_ID)
            .with_sensor_name(TEST_SENSOR_NAME)
            .with_address(address)
            .with_ca_certificate_pem(self.pem())
            .with_client_certificate_pem(client_pem)
            .with_client_private_key(private_key)
            .with_fingerprint(fingerprint)
            .build()
            .expect("valid bundle")
    }
}

fn localhost_server_params() -> CertificateParams {
    let mut params =
        CertificateParams::new(vec![String::from("127.0.0.1")]).expect("server params");
    params
        .distinguished_name
        .push(DnType::CommonName, "sensor.local");
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
    params
}

fn private_key_der(key_pair: &KeyPair) -> PrivateKeyDer<'static> {
    PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()))
}

/// A `127.0.0.1` server certificate signed by nobody but itself.
pub fn self_signed_localhost_server() -> (CertificateDer<'static>, PrivateKeyDer<'static>) {
    let key_pair = KeyPair::generate().expect("server key generation");
    let certificate = localhost_server_params()
        .self_signed(&key_pair)
        .expect("self-signed server certificate");
    (certificate.der().clone(), private_key_der(&key_pair))
}

// ============================================
// FAKE PAIRING SENSOR
// ============================================

/// Pairing secrets as the sensor sees them.
pub struct SensorSide {
    pub ca: TestCa,
    pub code: String,
    pub key: Mutex<Option<SharedKey>>,
    /// When set, the CA certificate is sealed with a key the companion cannot derive.
    pub corrupt_ca_payload: bool,
}

impl SensorSide {
    pub fn new(code: &str) -> Arc<Self> {
        Arc::new(Self {
            ca: TestCa::new(),
            code: code.to_string(),
            key: Mutex::new(None),
            corrupt_ca_payload: false,
        })
    }

    pub fn with_corrupt_ca_payload(code: &str) -> Arc<Self> {
        Arc::new(Self {
            ca: TestCa::new(),
            code: code.to_string(),
            key: Mutex::new(None),
            corrupt_ca_payload: true,
        })
    }
}

struct VerifyResponder(Arc<SensorSide>);

impl Respond for VerifyResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let Ok(body) = request.body_json::<VerifyRequest>() else {
            return ResponseTemplate::new(400);
        };

        let expected = compute_proof(TEST_CHALLENGE, &self.0.code).expect("proof");
        if body.proof != hex_encode(&expected) {
            return ResponseTemplate::new(401).set_body_string("invalid proof");
        }

        let client_nonce = hex_decode(&body.client_nonce).expect("client nonce hex");
        let key = derive_shared_key(&self.0.code, TEST_CHALLENGE, &client_nonce, TEST_SENSOR_ID)
            .expect("derive key");

        let sealing_key = if self.0.corrupt_ca_payload {
            SharedKey::from_bytes([0x55; 32])
        } else {
            key.clone()
        };
        let encrypted_ca_cert =
            encrypt(self.0.ca.pem().as_bytes(), &sealing_key).expect("encrypt CA");
        *self.0.key.lock().expect("key lock") = Some(key);

        ResponseTemplate::new(200).set_body_json(VerifyResponse {
            encrypted_ca_cert: hex_encode(&encrypted_ca_cert),
            server_nonce: Some(hex_encode(&[9u8; 32])),
        })
    }
}

struct CompleteResponder(Arc<SensorSide>);

impl Respond for CompleteResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let Ok(body) = request.body_json::<CompleteRequest>() else {
            return ResponseTemplate::new(400);
        };
        let Some(key) = self.0.key.lock().expect("key lock").clone() else {
            return ResponseTemplate::new(409);
        };

        let csr = decrypt(&hex_decode(&body.encrypted_csr).expect("csr hex"), &key)
            .expect("decrypt CSR");
        let csr_pem = String::from_utf8(csr).expect("CSR is UTF-8");
        let client_pem = self.0.ca.sign_csr(&csr_pem);
        let encrypted = encrypt(client_pem.as_bytes(), &key).expect("encrypt client cert");

        ResponseTemplate::new(200).set_body_json(CompleteResponse {
            encrypted_client_cert: hex_encode(&encrypted),
        })
    }
}

/// Mount the three pairing endpoints. `complete_delay` holds the final response back.
pub async fn mount_pairing(server: &MockServer, sensor: &Arc<SensorSide>, complete_delay: Duration) {
    Mock::given(method("GET"))
        .and(path("/api/pair/challenge"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ChallengeResponse {
            challenge: hex_encode(TEST_CHALLENGE),
            sensor_id: TEST_SENSOR_ID.to_string(),
            sensor_name: TEST_SENSOR_NAME.to_string(),
        }))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/pair/verify"))
        .respond_with(VerifyResponder(sensor.clone()))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/pair/complete"))
        .respond_with(DelayedResponder {
            inner: CompleteResponder(sensor.clone()),
            delay: complete_delay,
        })
        .mount(server)
        .await;
}

struct DelayedResponder<R> {
    inner: R,
    delay: Duration,
}

impl<R: Respond> Respond for DelayedResponder<R> {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        self.inner.respond(request).set_delay(self.delay)
    }
}

/// `host:port` of a wiremock server, split for the resolver.
pub fn host_and_port(server: &MockServer) -> (String, u16) {
    let address = server.address();
    (address.ip().to_string(), address.port())
}

// ============================================
// HYDRATION
// ============================================

/// Mount the six hydration endpoints with a small, valid baseline.
pub async fn mount_hydration(server: &MockServer) {
    let responses = [
        ("/api/health", json!({"status": "ok", "version": "1.4.0"})),
        (
            "/api/status",
            json!({"sensor_id": TEST_SENSOR_ID, "sensor_name": TEST_SENSOR_NAME, "monitoring": true}),
        ),
        ("/api/devices", json!([{"id": "d-1", "ip": "10.0.0.12"}])),
        (
            "/api/alerts",
            json!([{"id": 1, "severity": "medium", "title": "New device"}]),
        ),
        ("/api/decoys", json!([])),
        ("/api/learning/status", json!({"active": false})),
    ];

    for (route, body) in responses {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }
}

// ============================================
// EVENT STREAM SERVER
// ============================================

/// What the scripted server does once its frames are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterScript {
    Hold,
    Close,
}

/// WebSocket server that waits for the client's `replay` frame, sends a fixed
/// script, and records every text frame it receives.
pub struct EventServer {
    pub url: Url,
    pub received: Arc<Mutex<Vec<Value>>>,
    pub connections: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl EventServer {
    pub async fn start(script: Vec<Value>, after: AfterScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind event server");
        let port = listener.local_addr().expect("local addr").port();
        let url = Url::parse(&format!("ws://127.0.0.1:{port}/ws/events")).expect("ws url");

        let received = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));

        let handle = {
            let received = received.clone();
            let connections = connections.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    connections.fetch_add(1, Ordering::SeqCst);
                    let script = script.clone();
                    let received = received.clone();
                    tokio::spawn(serve_connection(stream, script, after, received));
                }
            })
        };

        Self {
            url,
            received,
            connections,
            handle,
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Received frames whose `type` is `frame_type`.
    pub fn received_of_type(&self, frame_type: &str) -> Vec<Value> {
        self.received
            .lock()
            .expect("received lock")
            .iter()
            .filter(|frame| frame["type"] == frame_type)
            .cloned()
            .collect()
    }
}

impl Drop for EventServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve_connection(
    stream: tokio::net::TcpStream,
    script: Vec<Value>,
    after: AfterScript,
    received: Arc<Mutex<Vec<Value>>>,
) {
    let Ok(socket) = accept_async(stream).await else {
        return;
    };
    let (mut sink, mut source) = socket.split();

    while let Some(Ok(message)) = source.next().await {
        if let Message::Text(text) = message {
            let frame: Value = serde_json::from_str(text.as_str()).unwrap_or(Value::Null);
            let is_replay = frame["type"] == "replay";
            received.lock().expect("received lock").push(frame);
            if is_replay {
                break;
            }
        }
    }

    let recorder = tokio::spawn(async move {
        while let Some(Ok(message)) = source.next().await {
            if let Message::Text(text) = message {
                let frame: Value = serde_json::from_str(text.as_str()).unwrap_or(Value::Null);
                received.lock().expect("received lock").push(frame);
            }
        }
    });

    for frame in script {
        if sink.send(Message::text(frame.to_string())).await.is_err() {
            return;
        }
    }

    match after {
        AfterScript::Close => {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let _ = sink.send(Message::Close(None)).await;
            let _ = sink.close().await;
        }
        AfterScript::Hold => {
            let _ = recorder.await;
        }
    }
}

pub fn event_frame(seq: u64, kind: &str) -> Value {
    json!({"type": "event", "seq": seq, "event": kind, "payload": {"seq": seq}})
}

// ============================================
// CONSUMER
// ============================================

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Snapshot(usize),
    Event(u64),
    LocalAlert(String),
    State(SessionState),
}

/// Consumer that appends every call to a list, in call order.
#[derive(Debug, Default)]
pub struct RecordingConsumer {
    records: Mutex<Vec<Record>>,
}

impl RecordingConsumer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().expect("records lock").clone()
    }

    pub fn snapshot_count(&self) -> usize {
        self.records()
            .iter()
            .filter(|record| matches!(record, Record::Snapshot(_)))
            .count()
    }

    pub fn event_seqs(&self) -> Vec<u64> {
        self.records()
            .iter()
            .filter_map(|record| match record {
                Record::Event(seq) => Some(*seq),
                _ => None,
            })
            .collect()
    }

    pub fn local_alerts(&self) -> Vec<String> {
        self.records()
            .iter()
            .filter_map(|record| match record {
                Record::LocalAlert(title) => Some(title.clone()),
                _ => None,
            })
            .collect()
    }

    fn push(&self, record: Record) {
        self.records.lock().expect("records lock").push(record);
    }
}

impl StateConsumer for RecordingConsumer {
    fn apply_snapshot(&self, snapshot: HydrationSnapshot) {
        self.push(Record::Snapshot(snapshot.devices.len()));
    }

    fn apply_event(&self, event: &SensorEvent) {
        self.push(Record::Event(event.seq));
    }

    fn apply_local_alert(&self, alert: SyntheticAlert) {
        self.push(Record::LocalAlert(alert.title));
    }

    fn session_state_changed(&self, state: SessionState) {
        self.push(Record::State(state));
    }
}
