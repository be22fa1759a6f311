use anyhow::Context;
use std::sync::Arc;
use stay_store::app_config::Config;
use stay_store::{DbClient, DivertPolicy, EnvironmentConsumer, MessageRouter, PgBookingRepository};
use tokio::sync::watch;
use tracing::info;

/// Consume booking and cancellation events into the booking store until
/// `shutdown` fires.
pub async fn start_booking_worker(config: &Config, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
    let db = DbClient::new(&config.database)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await.context("Failed to run migrations")?;

    let repo = Arc::new(PgBookingRepository::new(db.pool.clone()));
    let router = MessageRouter::new(
        DivertPolicy::new(&config.divert.environment),
        repo.clone(),
        repo,
    )
    .with_topics(&config.kafka.booking_topic, &config.kafka.cancellation_topic);

    let consumer = EnvironmentConsumer::new(config, router).context("Failed to create Kafka consumer")?;
    info!(
        group_id = consumer.group_id(),
        environment = %config.divert.environment,
        namespace = %config.divert.namespace,
        "Booking worker started"
    );

    consumer.run(shutdown).await.context("Consumer stopped with an error")?;

    db.pool.close().await;
    info!("Booking worker stopped");
    Ok(())
}
