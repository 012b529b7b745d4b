pub mod action_queue;
pub mod config;
pub mod crypto;
pub mod discovery;
pub mod error;
pub mod pairing;
pub mod sensor_client;
pub mod session;
pub mod store;
pub mod transport;

#[cfg(test)]
mod tests;

pub const API_PREFIX: &str = "api/";
pub const HEALTH_ENDPOINT: &str = const_format::concatcp!(API_PREFIX, "health");
pub const STATUS_ENDPOINT: &str = const_format::concatcp!(API_PREFIX, "status");
pub const DEVICES_ENDPOINT: &str = const_format::concatcp!(API_PREFIX, "devices");
pub const ALERTS_ENDPOINT: &str = const_format::concatcp!(API_PREFIX, "alerts");
pub const DECOYS_ENDPOINT: &str = const_format::concatcp!(API_PREFIX, "decoys");
pub const LEARNING_ENDPOINT: &str = const_format::concatcp!(API_PREFIX, "learning");
pub const LEARNING_STATUS_ENDPOINT: &str = const_format::concatcp!(LEARNING_ENDPOINT, "/status");
pub const PAIR_ENDPOINT: &str = const_format::concatcp!(API_PREFIX, "pair");
pub const PAIR_CHALLENGE_ENDPOINT: &str = const_format::concatcp!(PAIR_ENDPOINT, "/challenge");
pub const PAIR_VERIFY_ENDPOINT: &str = const_format::concatcp!(PAIR_ENDPOINT, "/verify");
pub const PAIR_COMPLETE_ENDPOINT: &str = const_format::concatcp!(PAIR_ENDPOINT, "/complete");
pub const EVENTS_ENDPOINT: &str = "ws/events";
