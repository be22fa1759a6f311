use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use stay_api::{app, shutdown_signal, telemetry, AppState};
use stay_booking::{BookingOrchestrator, Topics};
use stay_store::app_config::Config;
use stay_store::{EventProducer, HttpPaymentClient, HttpValidationClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init("stay_api=debug,stay_booking=debug,stay_store=debug,tower_http=debug,axum::rejection=trace");

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting booking API on port {}", config.server.port);

    // Collaborators
    let timeout = Duration::from_secs(config.services.timeout_seconds);
    let validation = HttpValidationClient::new(&config.services.validation_url, timeout)
        .context("Failed to build validation client")?;
    let payment = HttpPaymentClient::new(&config.services.payment_url, timeout)
        .context("Failed to build payment client")?;

    // Kafka Connection
    let producer = EventProducer::new(&config.kafka).context("Failed to create Kafka producer")?;

    let orchestrator = BookingOrchestrator::new(Arc::new(validation), Arc::new(payment), Arc::new(producer))
        .with_topics(Topics {
            bookings: config.kafka.booking_topic.clone(),
            cancellations: config.kafka.cancellation_topic.clone(),
        });

    let app = app(AppState::new(orchestrator));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
