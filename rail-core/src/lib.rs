pub mod events;
pub mod model;
pub mod repository;

pub use events::EventPublisher;
pub use model::{Booking, BookingDetails, BookingId, Invariant, InvariantBreach, LedgerStats, Train, TrainId};
pub use repository::LedgerRepository;

/// Failure kinds surfaced by every ledger operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    /// A self-check that cannot fire under correct engine logic did fire.
    #[error("Internal invariant violation: {0}")]
    InternalInvariantViolation(String),
    #[error("Storage failure: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    ResourceExhausted,
    AlreadyExists,
    InternalInvariantViolation,
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::ResourceExhausted => "RESOURCE_EXHAUSTED",
            ErrorKind::AlreadyExists => "ALREADY_EXISTS",
            ErrorKind::InternalInvariantViolation => "INTERNAL_INVARIANT_VIOLATION",
            ErrorKind::Storage => "STORAGE",
        }
    }
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            LedgerError::NotFound(_) => ErrorKind::NotFound,
            LedgerError::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
            LedgerError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            LedgerError::InternalInvariantViolation(_) => ErrorKind::InternalInvariantViolation,
            LedgerError::Storage(_) => ErrorKind::Storage,
        }
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, LedgerError::InternalInvariantViolation(_))
    }

    pub fn train_not_found(train_id: TrainId) -> Self {
        LedgerError::NotFound(format!("train {}", train_id))
    }

    pub fn booking_not_found(booking_id: BookingId) -> Self {
        LedgerError::NotFound(format!("booking {}", booking_id))
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
