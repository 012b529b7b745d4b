use crate::cli::PairArgs;
use crate::commands::CommandContext;
use crate::error::CompanionError;

use companion_core::discovery::{SensorCandidate, StaticResolver};
use companion_core::pairing::{PairingOrchestrator, PairingSettings};
use companion_core::store::load_paired_sensor;

use common::RedactedSecret;

use log::info;

/// Pair with the sensor advertised as `args.service` at `args.host:args.port`.
///
/// Refuses to run while another sensor is paired; its credentials would be
/// orphaned by the new pointer.
pub async fn run(context: &CommandContext, args: PairArgs) -> Result<(), CompanionError> {
    if let Some(existing) = load_paired_sensor(&context.store)? {
        return Err(CompanionError::companion(format!(
            "Already paired with '{}' ({}). Run `companion unpair` first",
            existing.sensor_name, existing.sensor_id
        )));
    }

    let resolver = StaticResolver::new().with_service(&args.service, &args.host, args.port);
    let orchestrator = PairingOrchestrator::new(
        resolver,
        context.store.clone(),
        PairingSettings::from_config(&context.config),
    );

    let display_name = args.name.clone().unwrap_or_else(|| args.service.clone());
    let candidate = SensorCandidate::new(&args.service, display_name);
    let code = RedactedSecret::new(args.code);

    info!("Pairing with '{}' at {}:{}", args.service, args.host, args.port);
    let bundle = orchestrator.pair(&candidate, &code).await?;

    println!(
        "Paired with '{}' ({})\nfingerprint {}",
        bundle.sensor_name, bundle.sensor_id, bundle.fingerprint
    );
    Ok(())
}
