//! Error types for Cabinet.

use thiserror::Error;

/// Common error type for Cabinet.
#[derive(Error, Debug)]
pub enum CabinetError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant unless they are
    /// unique-constraint violations, which become [`CabinetError::Integrity`].
    #[error("database error: {0}")]
    Database(String),

    /// A storage-level uniqueness constraint rejected the write.
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Permission denied error.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

// Conversion from sqlx errors
impl From<sqlx::Error> for CabinetError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return CabinetError::Integrity(db_err.message().to_string());
            }
        }
        CabinetError::Database(e.to_string())
    }
}

impl From<crate::auth::PermissionError> for CabinetError {
    fn from(e: crate::auth::PermissionError) -> Self {
        CabinetError::Permission(e.to_string())
    }
}

/// Result type alias for Cabinet operations.
pub type Result<T> = std::result::Result<T, CabinetError>;
