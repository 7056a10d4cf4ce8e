//! Error types shared across the backend.

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by persistence, scheduling, and manager operations.
#[derive(Error, Debug)]
pub enum AlmanacError {
    #[error("entry not found: {0}")]
    NotFound(Uuid),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("malformed document at {path}: {cause}")]
    MalformedDocument { path: String, cause: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid entry: {0}")]
    InvalidEntry(String),

    #[error("notification error: {0}")]
    Notify(String),
}

/// Result type alias for backend operations.
pub type AlmanacResult<T> = Result<T, AlmanacError>;
