use thiserror::Error;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Scheduling conflict: {0}")]
    Conflict(String),

    #[error("Capacity exceeded: {0}")]
    Capacity(String),

    #[error("Illegal status transition: {0}")]
    StateTransition(String),

    #[error("Database error: {0}")]
    Database(#[from] eyre::Report),

    #[error("Internal server error: {0}")]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl BookingError {
    /// Wraps any storage-layer failure as a `Database` error.
    pub fn database(err: impl Into<eyre::Report>) -> Self {
        BookingError::Database(err.into())
    }
}

pub type BookingResult<T> = Result<T, BookingError>;
