// --- File: crates/bookify_common/src/error.rs ---
use std::fmt;
use thiserror::Error;

/// The base error type shared across the Bookify crates.
///
/// Ledger validation and conflict errors block writes entirely; sync errors
/// never roll back a committed ledger write. Variants map one-to-one onto
/// the HTTP statuses the route layer reports.
#[derive(Error, Debug)]
pub enum BookifyError {
    /// Bad interval or missing required field; rejected before any write.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Proposed interval overlaps an existing booked entry; no write happens.
    #[error("Booking conflict: {0}")]
    Conflict(String),

    /// Booking, provider or external event absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A record does not belong to the caller's provider namespace.
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Store or external API call failed; retryable, no partial state left
    /// behind since each store write is a single atomic path operation.
    #[error("Transient I/O error: {0}")]
    TransientIo(String),

    /// Token refresh or exchange failed; the sync is skipped or aborted while
    /// the ledger mutation stays committed.
    #[error("Credential error: {0}")]
    Credential(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anything that does not fit the taxonomy above.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A trait for converting errors to HTTP status codes.
pub trait HttpStatusCode {
    /// Returns the HTTP status code for this error.
    fn status_code(&self) -> u16;
}

impl HttpStatusCode for BookifyError {
    fn status_code(&self) -> u16 {
        match self {
            BookifyError::Validation(_) => 400,
            BookifyError::Conflict(_) => 409,
            BookifyError::NotFound(_) => 404,
            BookifyError::Authorization(_) => 403,
            BookifyError::TransientIo(_) => 503,
            BookifyError::Credential(_) => 502,
            BookifyError::Config(_) => 500,
            BookifyError::Internal(_) => 500,
        }
    }
}

// Common error conversions
impl From<reqwest::Error> for BookifyError {
    fn from(err: reqwest::Error) -> Self {
        BookifyError::TransientIo(err.to_string())
    }
}

impl From<serde_json::Error> for BookifyError {
    fn from(err: serde_json::Error) -> Self {
        BookifyError::Internal(format!("serialization: {err}"))
    }
}

// Utility constructors for error handling
pub fn validation_error<T: fmt::Display>(message: T) -> BookifyError {
    BookifyError::Validation(message.to_string())
}

pub fn conflict<T: fmt::Display>(message: T) -> BookifyError {
    BookifyError::Conflict(message.to_string())
}

pub fn not_found<T: fmt::Display>(message: T) -> BookifyError {
    BookifyError::NotFound(message.to_string())
}

pub fn transient_io<T: fmt::Display>(message: T) -> BookifyError {
    BookifyError::TransientIo(message.to_string())
}

pub fn credential_error<T: fmt::Display>(message: T) -> BookifyError {
    BookifyError::Credential(message.to_string())
}
