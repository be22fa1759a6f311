pub mod models;
pub mod orchestrator;

pub use models::{
    BookingError, BookingRequest, BookingResponse, CancellationError, CancellationRequest,
    CancellationResponse, FailureClass,
};
pub use orchestrator::{BookingOrchestrator, Topics};
