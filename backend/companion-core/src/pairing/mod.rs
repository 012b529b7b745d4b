//! Pairing handshake and attempt tracking.
//!
//! [`PairingOrchestrator::pair`] runs the ten handshake steps strictly in
//! order. Nothing is written to the credential store until every step has
//! succeeded, and an attempt that was superseded by a newer one while it was
//! in flight never persists.

pub mod code;
pub mod state;

pub use code::validate_pairing_code;
pub use state::{AttemptId, PairingAttemptState, PairingFailure, PairingStep};

use crate::config::AppConfig;
use crate::crypto::tls::TlsSettings;
use crate::crypto::{
    SharedKey, certificate_der_from_pem, compute_proof, decrypt, derive_shared_key, encrypt,
    fingerprint_pem, generate_certificate_request, generate_client_nonce, hex_decode, hex_encode,
};
use crate::discovery::{SensorCandidate, ServiceResolver, resolve_with_timeout};
use crate::error::crypto::CryptoError;
use crate::error::pairing::PairingError;
use crate::error::sensor_client::SensorClientError;
use crate::sensor_client::SensorClient;
use crate::sensor_client::wire::{CompleteRequest, VerifyRequest};
use crate::store::{CredentialStore, delete_trust_bundle, load_trust_bundle, persist_trust_bundle};

use common::RedactedSecret;
use models::{TrustBundle, TrustBundleBuilder};

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::watch;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingSettings {
    pub client_name: String,
    pub resolve_timeout: Duration,
    pub request_timeout: Duration,
    pub use_tls: bool,
}

impl Default for PairingSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl PairingSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            client_name: config.pairing.client_name.clone(),
            resolve_timeout: config.pairing.resolve_timeout(),
            request_timeout: config.session.request_timeout(),
            use_tls: config.pairing.use_tls,
        }
    }
}

/// Result of [`PairingOrchestrator::unpair`]. Local deletion always happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnpairOutcome {
    /// The sensor confirmed the revocation, or already refused this certificate.
    pub remote_revoked: bool,
}

pub struct PairingOrchestrator<R, S> {
    resolver: R,
    store: S,
    settings: PairingSettings,
    current_attempt: AtomicU64,
    state: watch::Sender<PairingAttemptState>,
}

impl<R: ServiceResolver, S: CredentialStore> PairingOrchestrator<R, S> {
    pub fn new(resolver: R, store: S, settings: PairingSettings) -> Self {
        let (state, _) = watch::channel(PairingAttemptState::Idle);
        Self {
            resolver,
            store,
            settings,
            current_attempt: AtomicU64::new(0),
            state,
        }
    }

    pub fn settings(&self) -> &PairingSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn state(&self) -> PairingAttemptState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PairingAttemptState> {
        self.state.subscribe()
    }

    pub fn current_attempt(&self) -> AttemptId {
        AttemptId(self.current_attempt.load(Ordering::Acquire))
    }

    // ============================================
    // ATTEMPT TRACKING
    // ============================================

    /// Allocate a new attempt and make it current, abandoning any other.
    fn begin_attempt(
        &self,
        initial: impl FnOnce(AttemptId) -> PairingAttemptState,
    ) -> AttemptId {
        let mut attempt = AttemptId(0);
        self.state.send_modify(|state| {
            attempt = AttemptId(self.current_attempt.fetch_add(1, Ordering::AcqRel) + 1);
            *state = initial(attempt);
        });
        debug!("Pairing attempt {attempt} started");
        attempt
    }

    /// Apply `next` only if `attempt` is still current.
    fn transition(&self, attempt: AttemptId, next: PairingAttemptState) -> bool {
        let applied = self.state.send_if_modified(|state| {
            if self.current_attempt.load(Ordering::Acquire) != attempt.0 {
                return false;
            }
            *state = next;
            true
        });
        if !applied {
            debug!("Dropped state update from superseded attempt {attempt}");
        }
        applied
    }

    fn is_current(&self, attempt: AttemptId) -> bool {
        self.current_attempt.load(Ordering::Acquire) == attempt.0
    }

    fn enter_step(&self, attempt: AttemptId, candidate: &SensorCandidate, step: PairingStep) {
        debug!("Pairing attempt {attempt}: {step}");
        self.transition(
            attempt,
            PairingAttemptState::Pairing {
                attempt,
                candidate: candidate.clone(),
                step,
            },
        );
    }

    /// Start browsing for sensors. Cancels whatever attempt was live.
    pub fn start_discovery(&self) -> AttemptId {
        self.begin_attempt(|attempt| PairingAttemptState::Discovering { attempt })
    }

    /// Deliver discovery results for `attempt`. Ignored if it is no longer current.
    pub fn report_candidates(&self, attempt: AttemptId, candidates: Vec<SensorCandidate>) -> bool {
        info!("Discovery found {} sensor(s)", candidates.len());
        self.transition(
            attempt,
            PairingAttemptState::Found {
                attempt,
                candidates,
            },
        )
    }

    /// Abandon the live attempt and return to idle.
    pub fn cancel(&self) {
        self.state.send_modify(|state| {
            self.current_attempt.fetch_add(1, Ordering::AcqRel);
            *state = PairingAttemptState::Idle;
        });
    }

    // ============================================
    // PAIR
    // ============================================

    /// Run the full handshake against `candidate` and persist the resulting bundle.
    ///
    /// # Errors
    ///
    /// Returns [`PairingError`] naming the step that failed. Nothing is
    /// persisted on failure.
    pub async fn pair(
        &self,
        candidate: &SensorCandidate,
        code: &RedactedSecret,
    ) -> Result<TrustBundle, PairingError> {
        let attempt = self.begin_attempt(|attempt| PairingAttemptState::Pairing {
            attempt,
            candidate: candidate.clone(),
            step: PairingStep::Resolve,
        });

        match self.run_handshake(attempt, candidate, code).await {
            Ok(bundle) => {
                info!(
                    "Paired with sensor '{}' ({}) as {}",
                    bundle.sensor_name, bundle.sensor_id, bundle.fingerprint
                );
                self.transition(
                    attempt,
                    PairingAttemptState::Paired {
                        attempt,
                        sensor: bundle.paired_sensor(),
                    },
                );
                Ok(bundle)
            }
            Err(e) => {
                warn!("Pairing attempt {attempt} failed: {e}");
                self.transition(
                    attempt,
                    PairingAttemptState::Error {
                        attempt,
                        failure: PairingFailure {
                            step: e.step(),
                            message: e.to_string(),
                        },
                    },
                );
                Err(e)
            }
        }
    }

    async fn run_handshake(
        &self,
        attempt: AttemptId,
        candidate: &SensorCandidate,
        code: &RedactedSecret,
    ) -> Result<TrustBundle, PairingError> {
        validate_pairing_code(code.as_str())?;

        // 1. Resolve
        let service = resolve_with_timeout(
            &self.resolver,
            &candidate.service_name,
            self.settings.resolve_timeout,
        )
        .await
        .ok_or_else(|| PairingError::resolve(&candidate.service_name))?;
        let address = service.base_url(self.settings.use_tls);

        let client = SensorClient::new(
            &address,
            &TlsSettings::unpinned(),
            self.settings.request_timeout,
        )
        .map_err(|e| PairingError::request(PairingStep::FetchChallenge, e))?;

        // 2. Challenge
        self.enter_step(attempt, candidate, PairingStep::FetchChallenge);
        let challenge = client
            .fetch_challenge()
            .await
            .map_err(|e| PairingError::request(PairingStep::FetchChallenge, e))?;
        let challenge_bytes = hex_decode(&challenge.challenge)
            .map_err(|e| PairingError::crypto(PairingStep::FetchChallenge, e))?;

        // 3-4. Proof and verify
        self.enter_step(attempt, candidate, PairingStep::Verify);
        let proof = compute_proof(&challenge_bytes, code.as_str())
            .map_err(|e| PairingError::crypto(PairingStep::Verify, e))?;
        let client_nonce = generate_client_nonce();
        let verified = client
            .verify(&VerifyRequest {
                proof: hex_encode(&proof),
                client_nonce: hex_encode(&client_nonce),
                client_name: self.settings.client_name.clone(),
            })
            .await
            .map_err(|e| PairingError::request(PairingStep::Verify, e))?;

        // 5. Shared key
        self.enter_step(attempt, candidate, PairingStep::DeriveKey);
        let key = derive_shared_key(
            code.as_str(),
            &challenge_bytes,
            &client_nonce,
            &challenge.sensor_id,
        )
        .map_err(|e| PairingError::crypto(PairingStep::DeriveKey, e))?;

        // 6. CA certificate
        self.enter_step(attempt, candidate, PairingStep::DecryptCaCert);
        let ca_certificate_pem = decrypt_certificate(&verified.encrypted_ca_cert, &key)
            .map_err(|e| PairingError::crypto(PairingStep::DecryptCaCert, e))?;

        // 7. Keypair and CSR
        self.enter_step(attempt, candidate, PairingStep::GenerateCsr);
        let common_name = format!("{}-{}", self.settings.client_name, Uuid::new_v4());
        let request = generate_certificate_request(&common_name)
            .map_err(|e| PairingError::crypto(PairingStep::GenerateCsr, e))?;

        self.enter_step(attempt, candidate, PairingStep::SubmitCsr);
        let encrypted_csr = encrypt(request.csr_pem.as_bytes(), &key)
            .map_err(|e| PairingError::crypto(PairingStep::SubmitCsr, e))?;
        let completed = client
            .complete(&CompleteRequest {
                sensor_id: challenge.sensor_id.clone(),
                encrypted_csr: hex_encode(&encrypted_csr),
            })
            .await
            .map_err(|e| PairingError::request(PairingStep::SubmitCsr, e))?;

        // 8. Client certificate
        self.enter_step(attempt, candidate, PairingStep::DecryptClientCert);
        let client_certificate_pem = decrypt_certificate(&completed.encrypted_client_cert, &key)
            .map_err(|e| PairingError::crypto(PairingStep::DecryptClientCert, e))?;

        // 9. Fingerprint
        self.enter_step(attempt, candidate, PairingStep::Fingerprint);
        let fingerprint = fingerprint_pem(&client_certificate_pem)
            .map_err(|e| PairingError::crypto(PairingStep::Fingerprint, e))?;

        // 10. Assemble and persist
        self.enter_step(attempt, candidate, PairingStep::Assemble);
        let sensor_name = if challenge.sensor_name.trim().is_empty() {
            candidate.display_name.clone()
        } else {
            challenge.sensor_name.clone()
        };
        let bundle = TrustBundleBuilder::default()
            .with_sensor_id(challenge.sensor_id)
            .with_sensor_name(sensor_name)
            .with_address(address)
            .with_ca_certificate_pem(ca_certificate_pem)
            .with_client_certificate_pem(client_certificate_pem)
            .with_client_private_key(request.private_key_pem)
            .with_fingerprint(fingerprint)
            .build()?;

        if !self.is_current(attempt) {
            return Err(PairingError::superseded());
        }

        self.enter_step(attempt, candidate, PairingStep::Persist);
        persist_trust_bundle(&self.store, &bundle)
            .map_err(|e| PairingError::store(PairingStep::Persist, e))?;

        Ok(bundle)
    }

    // ============================================
    // UNPAIR / LOAD
    // ============================================

    /// Revoke on the sensor (best effort), then delete the stored bundle.
    ///
    /// # Errors
    ///
    /// Only store failures are errors. An unreachable sensor is logged and
    /// reported through [`UnpairOutcome::remote_revoked`].
    pub async fn unpair(&self, bundle: &TrustBundle) -> Result<UnpairOutcome, PairingError> {
        let remote_revoked = match self.revoke_remote(bundle).await {
            Ok(()) => {
                info!("Sensor '{}' revoked this companion", bundle.sensor_id);
                true
            }
            Err(e) if e.is_auth_rejection() => {
                info!(
                    "Sensor '{}' already refuses this certificate, treating as revoked",
                    bundle.sensor_id
                );
                true
            }
            Err(e) => {
                warn!(
                    "Remote revocation for '{}' failed, removing local credentials anyway: {e}",
                    bundle.sensor_id
                );
                false
            }
        };

        delete_trust_bundle(&self.store, &bundle.sensor_id)
            .map_err(|e| PairingError::store(PairingStep::Unpair, e))?;
        self.cancel();

        Ok(UnpairOutcome { remote_revoked })
    }

    async fn revoke_remote(
        &self,
        bundle: &TrustBundle,
    ) -> Result<(), SensorClientError> {
        let tls = TlsSettings::from_bundle(bundle)?;
        SensorClient::new(&bundle.address, &tls, self.settings.request_timeout)?
            .with_bearer(bundle.fingerprint.as_str())
            .unpair(&bundle.sensor_id)
            .await
    }

    /// The stored bundle of the currently paired sensor, if any.
    pub fn load_paired(&self) -> Result<Option<TrustBundle>, PairingError> {
        load_trust_bundle(&self.store).map_err(|e| PairingError::store(PairingStep::Load, e))
    }
}

/// Decrypt a hex-encoded certificate and check it parses as PEM.
fn decrypt_certificate(encrypted_hex: &str, key: &SharedKey) -> Result<String, CryptoError> {
    let plaintext = decrypt(&hex_decode(encrypted_hex)?, key)?;
    let pem = String::from_utf8(plaintext)
        .map_err(|_| CryptoError::certificate("Decrypted certificate is not UTF-8"))?;
    certificate_der_from_pem(&pem)?;
    Ok(pem)
}
