// --- File: crates/bookify_gcal/src/outbox.rs ---
//! Durable sync outbox.
//!
//! Booking mutations must commit regardless of the external calendar, so the
//! ledger only ever calls the [`SyncNotifier`] seam. This implementation
//! parks each action in the store on the request path, then drains the
//! provider queue in the background. Actions that fail to sync stay parked
//! and are retried by the next drain, including the drain at startup.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use bookify_common::{BookifyError, BoxFuture, SyncActionKind, SyncNotifier};
use bookify_store::{paths, TreeStore};

use crate::sync::{SyncAction, SyncCoordinator};

/// A parked sync action at `syncQueue/{providerId}/{actionId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSyncAction {
    pub action: SyncActionKind,
    pub booking_id: String,
    pub time_zone: String,
    /// Epoch milliseconds; drain order within a provider queue.
    pub enqueued_at_ms: i64,
}

#[derive(Clone)]
pub struct SyncOutbox {
    store: Arc<dyn TreeStore>,
    coordinator: Arc<SyncCoordinator>,
}

impl SyncOutbox {
    pub fn new(store: Arc<dyn TreeStore>, coordinator: Arc<SyncCoordinator>) -> Self {
        Self { store, coordinator }
    }

    /// Parks one action durably. Returns the queue entry id.
    pub async fn enqueue(&self, action: &SyncAction) -> Result<String, BookifyError> {
        let entry_id = Uuid::new_v4().to_string();
        let pending = PendingSyncAction {
            action: action.action,
            booking_id: action.booking_id.clone(),
            time_zone: action.time_zone.clone(),
            enqueued_at_ms: chrono::Utc::now().timestamp_millis(),
        };
        self.store
            .set(
                &paths::sync_action(&action.provider_id, &entry_id),
                &json!(pending),
            )
            .await?;
        Ok(entry_id)
    }

    /// Processes every parked action for one provider, oldest first.
    ///
    /// A successfully synced action is removed. An action whose precondition
    /// can never be met, a vanished booking, a forged provider or a malformed
    /// payload, is dropped. Anything else stays parked for the next drain.
    /// Returns the number of entries cleared.
    pub async fn drain_provider(&self, provider_id: &str) -> Result<usize, BookifyError> {
        let Some(queue) = self.store.get(&paths::sync_queue(provider_id)).await? else {
            return Ok(0);
        };
        let Some(entries) = queue.as_object() else {
            warn!(provider_id, "sync queue is not an object; skipping");
            return Ok(0);
        };

        let mut pending: Vec<(String, PendingSyncAction)> = entries
            .iter()
            .filter_map(|(entry_id, value)| {
                match serde_json::from_value::<PendingSyncAction>(value.clone()) {
                    Ok(action) => Some((entry_id.clone(), action)),
                    Err(err) => {
                        warn!(provider_id, entry_id, %err, "malformed sync queue entry");
                        None
                    }
                }
            })
            .collect();
        pending.sort_by_key(|(_, action)| action.enqueued_at_ms);

        let mut cleared = 0usize;
        for (entry_id, parked) in pending {
            let action = SyncAction {
                action: parked.action,
                booking_id: parked.booking_id,
                provider_id: provider_id.to_string(),
                time_zone: parked.time_zone,
            };
            match self.coordinator.sync(&action).await {
                Ok(outcome) if outcome.success => {
                    self.store
                        .remove(&paths::sync_action(provider_id, &entry_id))
                        .await?;
                    cleared += 1;
                }
                Ok(outcome) => {
                    warn!(
                        provider_id,
                        entry_id,
                        booking_id = %action.booking_id,
                        message = outcome.message.as_deref().unwrap_or(""),
                        "sync action failed; left parked"
                    );
                }
                // Precondition failures no retry can cure: the booking is
                // gone, the action was forged, or its payload is invalid.
                // Retrying forever would only grow the queue.
                Err(
                    err @ (BookifyError::NotFound(_)
                    | BookifyError::Validation(_)
                    | BookifyError::Authorization(_)),
                ) => {
                    warn!(
                        provider_id,
                        entry_id,
                        booking_id = %action.booking_id,
                        %err,
                        "sync action can never succeed; dropping"
                    );
                    self.store
                        .remove(&paths::sync_action(provider_id, &entry_id))
                        .await?;
                    cleared += 1;
                }
                Err(err) => {
                    warn!(
                        provider_id,
                        entry_id,
                        booking_id = %action.booking_id,
                        %err,
                        "sync action errored; left parked"
                    );
                }
            }
        }
        Ok(cleared)
    }

    /// Drains every provider queue once. Run at startup to pick up actions
    /// parked before the last shutdown.
    pub async fn drain_all(&self) -> Result<usize, BookifyError> {
        let Some(root) = self.store.get("syncQueue").await? else {
            return Ok(0);
        };
        let Some(providers) = root.as_object() else {
            return Ok(0);
        };
        let provider_ids: Vec<String> = providers.keys().cloned().collect();

        let mut cleared = 0usize;
        for provider_id in provider_ids {
            cleared += self.drain_provider(&provider_id).await?;
        }
        if cleared > 0 {
            info!(cleared, "drained parked sync actions");
        }
        Ok(cleared)
    }
}

impl SyncNotifier for SyncOutbox {
    /// Parks the action before returning; only the delivery drain runs off
    /// the request path. A crash after this future resolves loses nothing,
    /// the startup drain picks the parked action up.
    fn notify(
        &self,
        action: SyncActionKind,
        provider_id: &str,
        booking_id: &str,
        time_zone: &str,
    ) -> BoxFuture<'_, (), BookifyError> {
        let action = SyncAction {
            action,
            booking_id: booking_id.to_string(),
            provider_id: provider_id.to_string(),
            time_zone: time_zone.to_string(),
        };
        Box::pin(async move {
            self.enqueue(&action).await?;
            let outbox = self.clone();
            tokio::spawn(async move {
                if let Err(err) = outbox.drain_provider(&action.provider_id).await {
                    warn!(provider_id = %action.provider_id, %err, "sync drain failed");
                }
            });
            Ok(())
        })
    }
}
