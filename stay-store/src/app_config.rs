use serde::Deserialize;
use std::env;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub kafka: KafkaConfig,
    pub divert: DivertConfig,
    pub services: ServicesConfig,
    pub worker: WorkerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    /// Comma separated `host:port` list.
    pub brokers: String,
    pub booking_topic: String,
    pub cancellation_topic: String,
    pub message_timeout_ms: u64,
}

impl KafkaConfig {
    /// Broker list with stray whitespace and empty entries removed.
    pub fn broker_list(&self) -> String {
        self.brokers
            .split(',')
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DivertConfig {
    /// Environment tag this worker serves. Empty means the baseline environment.
    #[serde(default)]
    pub environment: String,
    /// Namespace the worker is deployed in; scopes the consumer group.
    #[serde(default)]
    pub namespace: String,
}

impl DivertConfig {
    /// `worker-group-<namespace>`. An unset namespace still keeps the dash, so
    /// every baseline worker lands in the same `worker-group-` group.
    pub fn group_id(&self) -> String {
        format!("worker-group-{}", self.namespace.trim())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServicesConfig {
    pub validation_url: String,
    pub payment_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkerConfig {
    pub retry_backoff_ms: u64,
    pub auto_offset_reset: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(Path::new("config"))
    }

    pub fn load_from(dir: &Path) -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let file = |name: &str| dir.join(name).to_string_lossy().into_owned();

        let s = config::Config::builder()
            .add_source(config::File::with_name(&file("default")))
            .add_source(config::File::with_name(&file(&run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name(&file("local")).required(false))
            // Eg.. `STAY_KAFKA__BROKERS=kafka:9092`
            .add_source(config::Environment::with_prefix("STAY").separator("__"))
            // Variables the deployment manifests already set
            .set_override_option("kafka.brokers", env::var("KAFKA_BROKERS").ok())?
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .set_override_option("divert.environment", env::var("OKTETO_DIVERTED_ENVIRONMENT").ok())?
            .set_override_option("divert.namespace", env::var("OKTETO_NAMESPACE").ok())?
            .set_override_option("services.payment_url", env::var("PAYMENT_SERVICE_URL").ok())?
            .set_override_option(
                "services.validation_url",
                env::var("BOOKING_MANAGEMENT_SERVICE_URL").ok(),
            )?
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kafka(brokers: &str) -> KafkaConfig {
        KafkaConfig {
            brokers: brokers.to_string(),
            booking_topic: "booking-events".into(),
            cancellation_topic: "booking-cancellations".into(),
            message_timeout_ms: 5000,
        }
    }

    #[test]
    fn test_broker_list_is_normalized() {
        assert_eq!(kafka(" kafka-0:9092 , kafka-1:9092,").broker_list(), "kafka-0:9092,kafka-1:9092");
    }

    #[test]
    fn test_group_is_scoped_by_namespace() {
        let staging = DivertConfig { environment: "staging".into(), namespace: "alice".into() };
        let prod = DivertConfig { environment: String::new(), namespace: "prod".into() };

        assert_eq!(staging.group_id(), "worker-group-alice");
        assert_ne!(staging.group_id(), prod.group_id());
        assert_eq!(DivertConfig::default().group_id(), "worker-group-");
        let padded = DivertConfig { environment: String::new(), namespace: " prod ".into() };
        assert_eq!(padded.group_id(), "worker-group-prod");
    }

    #[test]
    fn test_checked_in_defaults_load() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../config");
        let config = Config::load_from(&dir).unwrap();

        assert!(config.server.port > 0);
        assert!(!config.kafka.booking_topic.is_empty());
        assert!(config.worker.retry_backoff_ms > 0);
    }
}
