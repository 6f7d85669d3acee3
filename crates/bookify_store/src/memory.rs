// --- File: crates/bookify_store/src/memory.rs ---
//! In-memory tree store for tests and local development.
//!
//! Behaves like the RTDB backend: atomic per-path writes, last-write-wins,
//! absent nodes read as `None`, unindexed equality scans for queries.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::error::StoreError;
use crate::repository::{check_path, TreeStore};

/// A whole-tree store held behind a mutex.
#[derive(Default)]
pub struct MemoryStore {
    tree: Mutex<Value>,
    fail_next_query: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tree: Mutex::new(Value::Null),
            fail_next_query: AtomicBool::new(false),
        }
    }

    /// Makes the next `query_by_field` call fail with a 503, for exercising
    /// the "schedule unavailable" path.
    pub fn fail_next_query(&self) {
        self.fail_next_query.store(true, Ordering::SeqCst);
    }

    fn node<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
        let mut current = tree;
        for seg in path.split('/') {
            current = current.as_object()?.get(seg)?;
        }
        Some(current)
    }

    fn node_mut<'a>(tree: &'a mut Value, path: &str) -> &'a mut Value {
        let mut current = tree;
        for seg in path.split('/') {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            current = current
                .as_object_mut()
                .expect("just coerced to object")
                .entry(seg.to_string())
                .or_insert(Value::Null);
        }
        current
    }

    /// Prune empty parents is intentionally skipped; RTDB prunes nulls on
    /// read, which `get` mimics by treating `Null` as absent.
    fn remove_at(tree: &mut Value, path: &str) {
        let Some((parent, leaf)) = path.rsplit_once('/') else {
            if let Some(map) = tree.as_object_mut() {
                map.remove(path);
            }
            return;
        };
        if let Some(map) = Self::node_mut(tree, parent).as_object_mut() {
            map.remove(leaf);
        }
    }
}

#[async_trait]
impl TreeStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        check_path(path)?;
        let tree = self.tree.lock().expect("store mutex poisoned");
        Ok(Self::node(&tree, path).filter(|v| !v.is_null()).cloned())
    }

    async fn set(&self, path: &str, value: &Value) -> Result<(), StoreError> {
        check_path(path)?;
        let mut tree = self.tree.lock().expect("store mutex poisoned");
        *Self::node_mut(&mut tree, path) = value.clone();
        Ok(())
    }

    async fn update(&self, path: &str, fields: &Map<String, Value>) -> Result<(), StoreError> {
        check_path(path)?;
        let mut tree = self.tree.lock().expect("store mutex poisoned");
        let node = Self::node_mut(&mut tree, path);
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let map = node.as_object_mut().expect("just coerced to object");
        for (key, value) in fields {
            if value.is_null() {
                map.remove(key);
            } else {
                map.insert(key.clone(), value.clone());
            }
        }
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        check_path(path)?;
        let mut tree = self.tree.lock().expect("store mutex poisoned");
        Self::remove_at(&mut tree, path);
        Ok(())
    }

    async fn query_by_field(
        &self,
        path: &str,
        field: &str,
        equals: &Value,
    ) -> Result<Map<String, Value>, StoreError> {
        check_path(path)?;
        if self.fail_next_query.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Api {
                status: 503,
                body: "scripted query failure".to_string(),
            });
        }
        let tree = self.tree.lock().expect("store mutex poisoned");
        let mut result = Map::new();
        if let Some(Value::Object(children)) = Self::node(&tree, path) {
            for (id, child) in children {
                if child.get(field) == Some(equals) {
                    result.insert(id.clone(), child.clone());
                }
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_get_roundtrip_and_absent_reads() {
        let store = MemoryStore::new();
        assert!(store.get("bookings/p1/b1").await.unwrap().is_none());

        store
            .set("bookings/p1/b1", &json!({"date": "2026-03-02"}))
            .await
            .unwrap();
        let value = store.get("bookings/p1/b1").await.unwrap().unwrap();
        assert_eq!(value["date"], "2026-03-02");
    }

    #[tokio::test]
    async fn update_merges_and_null_deletes_fields() {
        let store = MemoryStore::new();
        store
            .set("bookings/p1/b1", &json!({"date": "2026-03-02", "externalEventId": "ev1"}))
            .await
            .unwrap();

        let mut fields = Map::new();
        fields.insert("status".to_string(), json!("Cancelled"));
        fields.insert("externalEventId".to_string(), Value::Null);
        store.update("bookings/p1/b1", &fields).await.unwrap();

        let value = store.get("bookings/p1/b1").await.unwrap().unwrap();
        assert_eq!(value["status"], "Cancelled");
        assert_eq!(value["date"], "2026-03-02");
        assert!(value.get("externalEventId").is_none());
    }

    #[tokio::test]
    async fn query_filters_on_field_equality() {
        let store = MemoryStore::new();
        store
            .set("bookings/p1/b1", &json!({"date": "2026-03-02"}))
            .await
            .unwrap();
        store
            .set("bookings/p1/b2", &json!({"date": "2026-03-03"}))
            .await
            .unwrap();

        let hits = store
            .query_by_field("bookings/p1", "date", &json!("2026-03-02"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits.contains_key("b1"));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let store = MemoryStore::new();
        store.set("calendarIntegration/p1", &json!({"integrated": true})).await.unwrap();
        store.remove("calendarIntegration/p1").await.unwrap();
        store.remove("calendarIntegration/p1").await.unwrap();
        assert!(store.get("calendarIntegration/p1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn scripted_query_failure_surfaces_as_api_error() {
        let store = MemoryStore::new();
        store.fail_next_query();
        let err = store
            .query_by_field("bookings/p1", "date", &json!("2026-03-02"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Api { status: 503, .. }));
        // Next query works again.
        assert!(store
            .query_by_field("bookings/p1", "date", &json!("2026-03-02"))
            .await
            .is_ok());
    }
}
