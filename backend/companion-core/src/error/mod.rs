pub mod config;
pub mod crypto;
pub mod pairing;
pub mod sensor_client;
pub mod session;
pub mod store;
pub mod tls;
pub mod transport;

pub use crypto::CryptoError;
pub use pairing::PairingError;
pub use sensor_client::SensorClientError;
pub use session::SessionError;
pub use store::StoreError;
pub use tls::TlsError;
pub use transport::TransportError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    SensorClient(#[from] SensorClientError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Pairing(#[from] PairingError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}
