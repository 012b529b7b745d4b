// Library exports for testing
// The binary (main.rs) imports these as well

pub mod cli;
pub mod commands;
pub mod console_consumer;
pub mod error;
pub mod file_store;
pub mod logger;

#[cfg(test)]
mod tests;
