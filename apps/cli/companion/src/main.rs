use companion::cli::Cli;
use companion::commands::{CommandContext, dispatch};
use companion::error::CompanionError;
use companion::logger;

use companion_core::config::AppConfig;

use std::process::ExitCode;

use clap::Parser;
use log::error;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is the normal case.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("{}", user_message(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CompanionError> {
    let config_dir = cli.resolve_config_dir()?;
    std::fs::create_dir_all(&config_dir).map_err(|e| {
        CompanionError::companion(format!(
            "Failed to create config directory {}: {e}",
            config_dir.display()
        ))
    })?;

    logger::initialize(&config_dir, cli.verbose)?;

    let config = AppConfig::load(&config_dir)?;
    let context = CommandContext::new(config_dir, config);

    dispatch(cli, context).await
}

fn user_message(error: &CompanionError) -> String {
    match error {
        CompanionError::Companion { message, .. }
        | CompanionError::Core { message, .. }
        | CompanionError::NotPaired { message, .. }
        | CompanionError::AuthFailed { message, .. } => format!("error: {message}"),
    }
}
