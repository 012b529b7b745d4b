use crate::commands::CommandContext;
use crate::error::CompanionError;

use companion_core::discovery::StaticResolver;
use companion_core::pairing::{PairingOrchestrator, PairingSettings};
use companion_core::store::load_trust_bundle;

use log::info;

pub async fn run(context: &CommandContext) -> Result<(), CompanionError> {
    let Some(bundle) = load_trust_bundle(&context.store)? else {
        println!("No sensor is paired");
        return Ok(());
    };

    let orchestrator = PairingOrchestrator::new(
        StaticResolver::new(),
        context.store.clone(),
        PairingSettings::from_config(&context.config),
    );

    info!("Unpairing from '{}'", bundle.sensor_id);
    let outcome = orchestrator.unpair(&bundle).await?;

    if outcome.remote_revoked {
        println!("Unpaired from '{}'", bundle.sensor_name);
    } else {
        println!(
            "Removed local credentials for '{}'. The sensor could not be reached, revoke this companion there as well",
            bundle.sensor_name
        );
    }
    Ok(())
}
