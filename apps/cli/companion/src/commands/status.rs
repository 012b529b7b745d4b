use crate::cli::StatusArgs;
use crate::commands::CommandContext;
use crate::error::CompanionError;

use companion_core::crypto::tls::TlsSettings;
use companion_core::sensor_client::SensorClient;
use companion_core::store::load_paired_sensor;

pub async fn run(context: &CommandContext, args: StatusArgs) -> Result<(), CompanionError> {
    let Some(sensor) = load_paired_sensor(&context.store)? else {
        println!("Not paired");
        return Ok(());
    };

    println!("Paired with '{}' ({})", sensor.sensor_name, sensor.sensor_id);
    println!("address     {}", sensor.address);
    println!("fingerprint {}", sensor.fingerprint);

    if !args.check {
        return Ok(());
    }

    let bundle = context.paired_bundle()?;
    let tls = TlsSettings::from_bundle(&bundle)?;
    let health = SensorClient::new(
        &bundle.address,
        &tls,
        context.config.session.request_timeout(),
    )?
    .with_bearer(bundle.fingerprint.as_str())
    .health()
    .await?;

    match health.version {
        Some(version) => println!("health      {} (firmware {version})", health.status),
        None => println!("health      {}", health.status),
    }
    Ok(())
}
