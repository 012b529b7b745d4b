use crate::error::CompanionError;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub const CONFIG_DIR_ENV: &str = "COMPANION_CONFIG_DIR";
pub const PAIRING_CODE_ENV: &str = "COMPANION_PAIRING_CODE";
const CONFIG_DIR_NAME: &str = "sensor-companion";
const CREDENTIALS_DIR_NAME: &str = "credentials";

#[derive(Debug, Parser)]
#[command(name = "companion")]
#[command(about = "Pair with a network sensor and follow its live event stream", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding config.json, credentials and companion.log
    #[arg(long, global = true, env = CONFIG_DIR_ENV)]
    pub config_dir: Option<PathBuf>,

    /// Log everything, including individual event frames
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Pair with a sensor using the code shown on its display
    Pair(PairArgs),

    /// Revoke this companion on the paired sensor and forget its credentials
    Unpair,

    /// Show the paired sensor
    Status(StatusArgs),

    /// Connect and print the live event stream until Ctrl-C
    Watch,
}

#[derive(Debug, Args)]
pub struct PairArgs {
    /// Advertised service name of the sensor
    #[arg(long)]
    pub service: String,

    /// Host or IP address the service resolves to
    #[arg(long)]
    pub host: String,

    #[arg(long)]
    pub port: u16,

    /// Six-digit pairing code
    #[arg(long, env = PAIRING_CODE_ENV, hide_env_values = true)]
    pub code: String,

    /// Display name for the sensor if it does not report one
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Also call the sensor's health endpoint over mutual TLS
    #[arg(long)]
    pub check: bool,
}

impl Cli {
    /// `--config-dir`, then `COMPANION_CONFIG_DIR`, then the platform config directory.
    pub fn resolve_config_dir(&self) -> Result<PathBuf, CompanionError> {
        if let Some(dir) = &self.config_dir {
            return Ok(dir.clone());
        }

        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME))
            .ok_or_else(|| CompanionError::companion("Could not determine a config directory"))
    }
}

pub fn credentials_dir(config_dir: &std::path::Path) -> PathBuf {
    config_dir.join(CREDENTIALS_DIR_NAME)
}
