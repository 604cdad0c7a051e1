//! Error types for the book. Session-layer parse errors live in [`crate::command`].

use thiserror::Error;

/// Rejections raised before an order reaches the book.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown side: {0}")]
    UnknownSide(String),

    #[error("unknown order kind: {0}")]
    UnknownKind(String),

    #[error("invalid price: {0}")]
    InvalidPrice(String),

    #[error("invalid size: {0}")]
    InvalidSize(String),

    #[error("ticker must not be empty")]
    EmptyTicker,

    #[error("ticker {actual} does not match book ticker {expected}")]
    TickerMismatch { expected: String, actual: String },
}

/// Errors returned by [`crate::Engine`] operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("book is shut down")]
    Closed,

    #[error("book already shut down")]
    AlreadyShutDown,

    #[error("failed to start matching scheduler: {0}")]
    SchedulerStart(String),
}
