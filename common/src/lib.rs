//! Shared building blocks for the sensor companion crates.
//!
//! Nothing in here knows about sensors, pairing, or sessions. It holds the
//! pieces every other crate leans on:
//!
//! - [`ErrorLocation`] so every error can say where it was raised
//! - [`HttpStatusCode`] so status classification is done on numbers, not strings
//! - [`RedactedSecret`] so key material and pairing codes never reach a log line

pub mod error;
pub mod http_status;
pub mod redacted_secret;

#[cfg(test)]
mod tests;

pub use error::error_location::ErrorLocation;
pub use error::redact_error::RedactError;
pub use http_status::HttpStatusCode;
pub use redacted_secret::RedactedSecret;
