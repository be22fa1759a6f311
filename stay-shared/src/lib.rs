pub mod baggage;
pub mod models;
pub mod pii;

pub use baggage::Baggage;
pub use models::events::{BookingEvent, BookingMessage, CancellationEvent};
pub use pii::CardNumber;
