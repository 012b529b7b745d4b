use crate::discovery::SensorCandidate;

use models::PairedSensor;

use std::fmt;

/// Identifies one pairing attempt. Larger ids are newer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttemptId(pub u64);

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The handshake steps, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PairingStep {
    Resolve,
    FetchChallenge,
    Verify,
    DeriveKey,
    DecryptCaCert,
    GenerateCsr,
    SubmitCsr,
    DecryptClientCert,
    Fingerprint,
    Assemble,
    Persist,
    Load,
    Unpair,
}

impl fmt::Display for PairingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PairingStep::Resolve => "sensor resolution",
            PairingStep::FetchChallenge => "challenge fetch",
            PairingStep::Verify => "pairing code verification",
            PairingStep::DeriveKey => "key derivation",
            PairingStep::DecryptCaCert => "certificate decryption",
            PairingStep::GenerateCsr => "signing request generation",
            PairingStep::SubmitCsr => "signing request submission",
            PairingStep::DecryptClientCert => "client certificate decryption",
            PairingStep::Fingerprint => "certificate fingerprinting",
            PairingStep::Assemble => "trust bundle assembly",
            PairingStep::Persist => "credential storage",
            PairingStep::Load => "credential loading",
            PairingStep::Unpair => "credential removal",
        };
        f.write_str(name)
    }
}

/// Why an attempt ended in [`PairingAttemptState::Error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingFailure {
    pub step: Option<PairingStep>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PairingAttemptState {
    #[default]
    Idle,
    Discovering {
        attempt: AttemptId,
    },
    Found {
        attempt: AttemptId,
        candidates: Vec<SensorCandidate>,
    },
    Pairing {
        attempt: AttemptId,
        candidate: SensorCandidate,
        step: PairingStep,
    },
    /// Only the non-secret summary. The bundle itself lives in the store.
    Paired {
        attempt: AttemptId,
        sensor: PairedSensor,
    },
    Error {
        attempt: AttemptId,
        failure: PairingFailure,
    },
}

impl PairingAttemptState {
    pub fn attempt(&self) -> Option<AttemptId> {
        match self {
            PairingAttemptState::Idle => None,
            PairingAttemptState::Discovering { attempt }
            | PairingAttemptState::Found { attempt, .. }
            | PairingAttemptState::Pairing { attempt, .. }
            | PairingAttemptState::Paired { attempt, .. }
            | PairingAttemptState::Error { attempt, .. } => Some(*attempt),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PairingAttemptState::Paired { .. } | PairingAttemptState::Error { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            PairingAttemptState::Idle => "idle",
            PairingAttemptState::Discovering { .. } => "discovering",
            PairingAttemptState::Found { .. } => "found",
            PairingAttemptState::Pairing { .. } => "pairing",
            PairingAttemptState::Paired { .. } => "paired",
            PairingAttemptState::Error { .. } => "error",
        }
    }
}
