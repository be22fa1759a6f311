pub mod app_config;
pub mod booking_repo;
pub mod clients;
pub mod consumer;
pub mod database;
pub mod events;
pub mod memory_repo;

pub use booking_repo::PgBookingRepository;
pub use clients::{HttpPaymentClient, HttpValidationClient};
pub use consumer::{DivertPolicy, Disposition, EnvironmentConsumer, MessageRouter};
pub use database::DbClient;
pub use events::EventProducer;
pub use memory_repo::MemoryBookingRepository;
