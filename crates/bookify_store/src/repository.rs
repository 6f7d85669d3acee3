// --- File: crates/bookify_store/src/repository.rs ---
//! The tree store boundary.
//!
//! The booking ledger and the credential vault only ever see this trait:
//! path-addressed reads, atomic single-path writes, path deletion, and one
//! equality query on an indexed field. Anything richer (transactions,
//! compare-and-swap) is deliberately absent; see the design notes on the
//! conflict-check race.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::StoreError;

/// A path-addressed key-value tree store.
///
/// Paths are slash-separated segments (`bookings/{providerId}/{bookingId}`).
/// Writes to a path are atomic and last-write-wins; there is no optimistic
/// concurrency across a read-then-write sequence.
#[async_trait]
pub trait TreeStore: Send + Sync {
    /// Read the value at `path`, or `None` when the node is absent.
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Replace the node at `path` with `value` in one atomic write.
    async fn set(&self, path: &str, value: &Value) -> Result<(), StoreError>;

    /// Merge `fields` into the object at `path` (shallow, per-field).
    async fn update(&self, path: &str, fields: &Map<String, Value>) -> Result<(), StoreError>;

    /// Delete the node at `path`. Deleting an absent node succeeds.
    async fn remove(&self, path: &str) -> Result<(), StoreError>;

    /// Return the children of `path` whose `field` equals `equals`,
    /// keyed by child id. Requires `field` to be indexed on the backend.
    async fn query_by_field(
        &self,
        path: &str,
        field: &str,
        equals: &Value,
    ) -> Result<Map<String, Value>, StoreError>;
}

/// Validates a path: non-empty, no empty segments, no `.json` suffix games.
pub(crate) fn check_path(path: &str) -> Result<(), StoreError> {
    if path.is_empty() || path.split('/').any(|seg| seg.is_empty()) {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(())
}
