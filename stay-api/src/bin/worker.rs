use anyhow::Context;
use stay_api::{shutdown_signal, telemetry, worker::start_booking_worker};
use stay_store::app_config::Config;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init("stay_api=info,stay_store=info,rdkafka=info");

    let config = Config::load().context("Failed to load config")?;
    let (stop_tx, stop_rx) = watch::channel(false);

    let mut worker = tokio::spawn(async move { start_booking_worker(&config, stop_rx).await });

    tokio::select! {
        result = &mut worker => return result?,
        () = shutdown_signal() => {}
    }

    // The consumer finishes the message in hand before returning.
    stop_tx.send(true).ok();
    worker.await??;
    Ok(())
}
