//! Error types for drivebox.

use thiserror::Error;

/// Common error type for drivebox.
///
/// Every workflow failure maps to exactly one of these kinds. The web layer
/// turns each kind into a single HTTP status.
#[derive(Error, Debug)]
pub enum DriveboxError {
    /// No session, or the session could not be verified.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed input (missing file, missing id, oversized payload).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No record visible to the calling identity.
    #[error("not found: {0}")]
    NotFound(String),

    /// Remote storage provider failure, including credential refresh.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Metadata store failure.
    ///
    /// Errors from sqlx are converted automatically.
    #[error("store error: {0}")]
    Store(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for DriveboxError {
    fn from(e: sqlx::Error) -> Self {
        DriveboxError::Store(e.to_string())
    }
}

impl From<reqwest::Error> for DriveboxError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DriveboxError::Upstream(format!("request timed out: {e}"))
        } else {
            DriveboxError::Upstream(e.to_string())
        }
    }
}

/// Result type alias for drivebox operations.
pub type Result<T> = std::result::Result<T, DriveboxError>;
