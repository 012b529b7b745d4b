//! Subcommand implementations.

pub mod pair;
pub mod status;
pub mod unpair;
pub mod watch;

use crate::cli::{Cli, Command, credentials_dir};
use crate::error::CompanionError;
use crate::file_store::FileCredentialStore;

use companion_core::config::AppConfig;
use companion_core::store::load_trust_bundle;

use models::TrustBundle;

use std::path::PathBuf;
use std::sync::Arc;

/// Everything a command needs, resolved once in `main`.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config_dir: PathBuf,
    pub config: AppConfig,
    pub store: Arc<FileCredentialStore>,
}

impl CommandContext {
    pub fn new(config_dir: PathBuf, config: AppConfig) -> Self {
        let store = Arc::new(FileCredentialStore::new(credentials_dir(&config_dir)));
        Self {
            config_dir,
            config,
            store,
        }
    }

    /// The stored bundle, or [`CompanionError::NotPaired`].
    pub fn paired_bundle(&self) -> Result<TrustBundle, CompanionError> {
        load_trust_bundle(&self.store)?.ok_or_else(CompanionError::not_paired)
    }
}

pub async fn dispatch(cli: Cli, context: CommandContext) -> Result<(), CompanionError> {
    match cli.command {
        Command::Pair(args) => pair::run(&context, args).await,
        Command::Unpair => unpair::run(&context).await,
        Command::Status(args) => status::run(&context, args).await,
        Command::Watch => watch::run(&context).await,
    }
}
