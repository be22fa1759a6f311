pub mod booking_id;
pub mod payment;
pub mod publisher;
pub mod repository;
pub mod validation;

/// Failure of a request/response call to one of the collaborating services.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{service} service unreachable: {reason}")]
    Unavailable { service: &'static str, reason: String },
    #[error("{service} service returned status {status}: {body}")]
    UnexpectedStatus {
        service: &'static str,
        status: u16,
        body: String,
    },
    #[error("{service} service sent an unreadable response: {reason}")]
    InvalidResponse { service: &'static str, reason: String },
}

impl CoreError {
    pub fn service(&self) -> &'static str {
        match self {
            CoreError::Unavailable { service, .. }
            | CoreError::UnexpectedStatus { service, .. }
            | CoreError::InvalidResponse { service, .. } => service,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
