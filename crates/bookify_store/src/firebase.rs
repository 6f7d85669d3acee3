// --- File: crates/bookify_store/src/firebase.rs ---
//! Firebase Realtime Database REST client.
//!
//! Implements [`TreeStore`] over the RTDB REST surface: `GET/PUT/PATCH/DELETE
//! {base}/{path}.json`, with `orderBy`/`equalTo` for the single-field
//! equality query. The optional `auth` query parameter carries the database
//! secret or an ID token.

use async_trait::async_trait;
use bookify_config::StoreConfig;
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::StoreError;
use crate::repository::{check_path, TreeStore};

/// Client for a Firebase Realtime Database instance.
pub struct FirebaseRtdb {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl FirebaseRtdb {
    /// Creates a new client from the store configuration.
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            client: bookify_common::HTTP_CLIENT.clone(),
            base_url: config.database_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        }
    }

    fn node_url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path)
    }

    fn auth_query(&self) -> Vec<(&'static str, String)> {
        match &self.auth_token {
            Some(token) => vec![("auth", token.clone())],
            None => Vec::new(),
        }
    }

    async fn ok_json(response: reqwest::Response) -> Result<Value, StoreError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl TreeStore for FirebaseRtdb {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        check_path(path)?;
        let response = self
            .client
            .get(self.node_url(path))
            .query(&self.auth_query())
            .send()
            .await?;
        let value = Self::ok_json(response).await?;
        // RTDB reports an absent node as JSON null.
        Ok(if value.is_null() { None } else { Some(value) })
    }

    async fn set(&self, path: &str, value: &Value) -> Result<(), StoreError> {
        check_path(path)?;
        debug!(path, "store set");
        let response = self
            .client
            .put(self.node_url(path))
            .query(&self.auth_query())
            .json(value)
            .send()
            .await?;
        Self::ok_json(response).await?;
        Ok(())
    }

    async fn update(&self, path: &str, fields: &Map<String, Value>) -> Result<(), StoreError> {
        check_path(path)?;
        debug!(path, fields = fields.len(), "store update");
        let response = self
            .client
            .patch(self.node_url(path))
            .query(&self.auth_query())
            .json(fields)
            .send()
            .await?;
        Self::ok_json(response).await?;
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        check_path(path)?;
        debug!(path, "store remove");
        let response = self
            .client
            .delete(self.node_url(path))
            .query(&self.auth_query())
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    async fn query_by_field(
        &self,
        path: &str,
        field: &str,
        equals: &Value,
    ) -> Result<Map<String, Value>, StoreError> {
        check_path(path)?;
        // RTDB expects the orderBy field name itself wrapped in JSON quotes.
        let mut query = self.auth_query();
        query.push(("orderBy", format!("\"{field}\"")));
        query.push(("equalTo", serde_json::to_string(equals)?));

        let response = self
            .client
            .get(self.node_url(path))
            .query(&query)
            .send()
            .await?;
        let value = Self::ok_json(response).await?;
        match value {
            Value::Null => Ok(Map::new()),
            Value::Object(map) => Ok(map),
            other => Err(StoreError::Api {
                status: 200,
                body: format!("expected keyed object from query, got {other}"),
            }),
        }
    }
}
