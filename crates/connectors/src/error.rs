use crate::file::csv::error::FileError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The cursor was not produced by this service.
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    /// File-related error.
    #[error("File error: {0}")]
    File(#[from] FileError),
}
