// --- File: crates/bookify_store/src/error.rs ---
use bookify_common::BookifyError;
use thiserror::Error;

/// Errors raised by tree store implementations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Transport failure talking to the store backend.
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success response from the store backend.
    #[error("store API error (status {status}): {body}")]
    Api { status: u16, body: String },

    /// A stored value could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// An invalid path was supplied (empty, or empty segment).
    #[error("invalid store path: {0}")]
    InvalidPath(String),
}

impl From<StoreError> for BookifyError {
    fn from(err: StoreError) -> Self {
        match err {
            // Every store failure is retryable from the caller's perspective:
            // each write is a single atomic path operation, so no partial
            // state is left behind.
            StoreError::Request(e) => BookifyError::TransientIo(e.to_string()),
            StoreError::Api { status, body } => {
                BookifyError::TransientIo(format!("store returned {status}: {body}"))
            }
            StoreError::Serde(e) => BookifyError::Internal(format!("stored value: {e}")),
            StoreError::InvalidPath(p) => BookifyError::Internal(format!("invalid path: {p}")),
        }
    }
}
