use crate::commands::CommandContext;
use crate::console_consumer::ConsoleConsumer;
use crate::error::CompanionError;

use companion_core::session::{SessionManager, SessionSettings, SessionState};

use std::sync::Arc;

use log::{info, warn};

/// Follow the sensor's event stream until Ctrl-C.
///
/// A dropped stream is reconnected when `session.auto_reconnect` is set. A
/// credential rejection always ends the command.
pub async fn run(context: &CommandContext) -> Result<(), CompanionError> {
    let bundle = context.paired_bundle()?;
    let settings = SessionSettings::for_bundle(&bundle, &context.config)?;
    let auto_reconnect = context.config.session.auto_reconnect;

    let consumer = Arc::new(ConsoleConsumer::new());
    let manager = SessionManager::new(consumer, settings);
    let mut states = manager.subscribe();

    info!("Watching '{}' at {}", bundle.sensor_name, bundle.address);

    tokio::select! {
        result = manager.connect_with_retry(&bundle.address, &bundle.fingerprint) => result?,
        _ = tokio::signal::ctrl_c() => {
            manager.disconnect().await;
            return Ok(());
        }
    }

    let outcome = loop {
        let state = *states.borrow_and_update();
        match state {
            SessionState::AuthFailed => {
                break Err(CompanionError::auth_failed(format!(
                    "'{}' rejected this companion's certificate. Run `companion unpair` and pair again",
                    bundle.sensor_name
                )));
            }
            SessionState::Disconnected if auto_reconnect => {
                warn!("Stream to '{}' lost, reconnecting", bundle.sensor_name);
                tokio::select! {
                    result = manager.connect_with_retry(&bundle.address, &bundle.fingerprint) => {
                        if let Err(e) = result {
                            break Err(e.into());
                        }
                        continue;
                    }
                    _ = tokio::signal::ctrl_c() => break Ok(()),
                }
            }
            SessionState::Disconnected => {
                println!("Stream closed");
                break Ok(());
            }
            SessionState::Connecting | SessionState::Live => {}
        }

        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => break Ok(()),
        }
    };

    manager.disconnect().await;
    info!(
        "Stopped watching, {} actions still queued",
        manager.queued_action_count()
    );
    outcome
}
