// --- File: crates/bookify_gcal/src/sync.rs ---
//! Calendar sync coordinator.
//!
//! Translates booking lifecycle events into idempotent external-calendar
//! operations. The caller cannot guarantee single delivery, so every path
//! tolerates replays: create updates in place when an event id already
//! exists, update falls back to create when none does,
//! delete treats a remote 404/410 as already-converged, and any
//! successful delete clears the local event id so a later update re-creates.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};
use std::sync::Arc;
use tracing::{info, warn};

use bookify_booking::models::{Booking, BookingStatus, Client};
use bookify_common::{
    not_found, validation_error, BookifyError, CalendarApi, EventAttendee, EventPayload,
    EventResult, EventTime, SyncActionKind,
};
use bookify_store::{paths, TreeStore};

/// A sync request: transient, except while parked in the outbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncAction {
    pub action: SyncActionKind,
    pub booking_id: String,
    pub provider_id: String,
    pub time_zone: String,
}

/// Result reported to the caller of a sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SyncOutcome {
    fn ok(event_id: Option<String>) -> Self {
        Self {
            success: true,
            event_id,
            message: None,
        }
    }

    fn skipped(message: impl Into<String>) -> Self {
        Self {
            success: true,
            event_id: None,
            message: Some(message.into()),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            event_id: None,
            message: Some(message.into()),
        }
    }
}

/// Reconciles one booking with the external calendar per request.
pub struct SyncCoordinator {
    store: Arc<dyn TreeStore>,
    vault: Arc<crate::oauth::CredentialVault>,
    api: Arc<dyn CalendarApi>,
    calendar_id: String,
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<dyn TreeStore>,
        vault: Arc<crate::oauth::CredentialVault>,
        api: Arc<dyn CalendarApi>,
        calendar_id: String,
    ) -> Self {
        Self {
            store,
            vault,
            api,
            calendar_id,
        }
    }

    /// Runs one sync action to completion.
    ///
    /// Precondition failures (absent booking, forged provider, store I/O)
    /// are `Err`; remote calendar failures come back as a `success = false`
    /// outcome so the caller can warn without treating the ledger write as
    /// failed. "Not connected" is a successful skip.
    pub async fn sync(&self, action: &SyncAction) -> Result<SyncOutcome, BookifyError> {
        if action.time_zone.parse::<Tz>().is_err() {
            return Err(validation_error(format!(
                "unknown IANA time zone: {}",
                action.time_zone
            )));
        }

        let booking = self.load_booking(&action.provider_id, &action.booking_id).await?;

        let Some(access_token) = self.vault.authenticated_access(&action.provider_id).await? else {
            return Ok(SyncOutcome::skipped("calendar not connected; sync skipped"));
        };

        match action.action {
            // A replayed create for a booking that already carries an event
            // id must not insert a second remote event; reconcile in place.
            SyncActionKind::Create => match booking.external_event_id.as_deref() {
                Some(event_id) => self.update(&access_token, action, &booking, event_id).await,
                None => self.create(&access_token, action, &booking).await,
            },
            SyncActionKind::Update => match booking.external_event_id.as_deref() {
                // Self-healing: a booking whose create-sync failed or was
                // skipped must not make later updates a no-op.
                None => self.create(&access_token, action, &booking).await,
                Some(event_id) => self.update(&access_token, action, &booking, event_id).await,
            },
            SyncActionKind::Delete => self.delete(&access_token, action, &booking).await,
        }
    }

    async fn load_booking(
        &self,
        provider_id: &str,
        booking_id: &str,
    ) -> Result<Booking, BookifyError> {
        let value = self
            .store
            .get(&paths::booking(provider_id, booking_id))
            .await?
            .ok_or_else(|| not_found(format!("booking {booking_id}")))?;

        // Legacy records embed their provider id; a mismatch with the
        // namespace the action names means the request was forged or routed
        // to the wrong provider.
        if let Some(owner) = value.get("providerId").and_then(|v| v.as_str()) {
            if owner != provider_id {
                return Err(BookifyError::Authorization(format!(
                    "booking {booking_id} does not belong to provider {provider_id}"
                )));
            }
        }

        let mut booking: Booking = serde_json::from_value(value)?;
        booking.id = booking_id.to_string();
        Ok(booking)
    }

    async fn create(
        &self,
        access_token: &str,
        action: &SyncAction,
        booking: &Booking,
    ) -> Result<SyncOutcome, BookifyError> {
        if booking.status != BookingStatus::Booked {
            // Cancelled (and malformed legacy) bookings never enter the
            // external calendar.
            return Ok(SyncOutcome::skipped("booking is not active; sync skipped"));
        }
        let payload = self.event_payload(action, booking).await?;
        match self.api.insert_event(access_token, &self.calendar_id, payload).await {
            Ok(EventResult { event_id: Some(event_id), .. }) => {
                self.store_event_id(action, Some(&event_id)).await?;
                info!(
                    provider_id = %action.provider_id,
                    booking_id = %action.booking_id,
                    event_id,
                    "calendar event created"
                );
                Ok(SyncOutcome::ok(Some(event_id)))
            }
            Ok(EventResult { event_id: None, status }) => {
                Ok(SyncOutcome::failed(format!(
                    "calendar returned no event id (status {status})"
                )))
            }
            Err(err) => {
                warn!(booking_id = %action.booking_id, %err, "calendar insert failed");
                Ok(SyncOutcome::failed(err.to_string()))
            }
        }
    }

    async fn update(
        &self,
        access_token: &str,
        action: &SyncAction,
        booking: &Booking,
        event_id: &str,
    ) -> Result<SyncOutcome, BookifyError> {
        if booking.status != BookingStatus::Booked {
            return Ok(SyncOutcome::skipped("booking is not active; sync skipped"));
        }
        let payload = self.event_payload(action, booking).await?;
        match self
            .api
            .update_event(access_token, &self.calendar_id, event_id, payload)
            .await
        {
            Ok(result) => {
                info!(
                    provider_id = %action.provider_id,
                    booking_id = %action.booking_id,
                    event_id,
                    "calendar event updated"
                );
                Ok(SyncOutcome::ok(result.event_id.or_else(|| Some(event_id.to_string()))))
            }
            Err(err) => {
                warn!(booking_id = %action.booking_id, %err, "calendar update failed");
                Ok(SyncOutcome::failed(err.to_string()))
            }
        }
    }

    async fn delete(
        &self,
        access_token: &str,
        action: &SyncAction,
        booking: &Booking,
    ) -> Result<SyncOutcome, BookifyError> {
        let Some(event_id) = booking.external_event_id.as_deref() else {
            // Nothing to clean up; a replayed delete lands here.
            return Ok(SyncOutcome::skipped("no mirrored event; nothing to delete"));
        };

        match self.api.delete_event(access_token, &self.calendar_id, event_id).await {
            Ok(()) => {
                self.store_event_id(action, None).await?;
                info!(
                    provider_id = %action.provider_id,
                    booking_id = %action.booking_id,
                    event_id,
                    "calendar event deleted"
                );
                Ok(SyncOutcome::ok(None))
            }
            Err(err) if err.is_already_deleted() => {
                // Convergence, not failure: the mirror already lacks the
                // event. Clear the local id so a later update re-creates.
                self.store_event_id(action, None).await?;
                info!(
                    booking_id = %action.booking_id,
                    event_id,
                    "calendar event was already deleted remotely"
                );
                Ok(SyncOutcome::skipped("event already deleted remotely"))
            }
            Err(err) => {
                warn!(booking_id = %action.booking_id, %err, "calendar delete failed");
                Ok(SyncOutcome::failed(err.to_string()))
            }
        }
    }

    async fn event_payload(
        &self,
        action: &SyncAction,
        booking: &Booking,
    ) -> Result<EventPayload, BookifyError> {
        let client = self.load_client(&action.provider_id, &booking.client_id).await?;
        let date = booking.date.format("%Y-%m-%d");
        let summary = match &client {
            Some(client) => format!("{} - {}", booking.service, client.name),
            None => booking.service.clone(),
        };
        let attendees = client
            .and_then(|c| c.email)
            .map(|email| vec![EventAttendee { email }])
            .unwrap_or_default();

        Ok(EventPayload {
            summary,
            description: Some(booking.service.clone()),
            start: EventTime {
                date_time: format!("{date}T{}:00", booking.start_time),
                time_zone: action.time_zone.clone(),
            },
            end: EventTime {
                date_time: format!("{date}T{}:00", booking.end_time),
                time_zone: action.time_zone.clone(),
            },
            attendees,
            reminders: Some(json!({ "useDefault": true })),
        })
    }

    async fn load_client(
        &self,
        provider_id: &str,
        client_id: &str,
    ) -> Result<Option<Client>, BookifyError> {
        let Some(value) = self.store.get(&paths::client(provider_id, client_id)).await? else {
            return Ok(None);
        };
        let mut client: Client = match serde_json::from_value(value) {
            Ok(client) => client,
            Err(err) => {
                warn!(provider_id, client_id, %err, "malformed client record");
                return Ok(None);
            }
        };
        client.id = client_id.to_string();
        Ok(Some(client))
    }

    async fn store_event_id(
        &self,
        action: &SyncAction,
        event_id: Option<&str>,
    ) -> Result<(), BookifyError> {
        let mut fields = Map::new();
        fields.insert(
            "externalEventId".to_string(),
            match event_id {
                Some(id) => json!(id),
                None => serde_json::Value::Null,
            },
        );
        self.store
            .update(
                &paths::booking(&action.provider_id, &action.booking_id),
                &fields,
            )
            .await?;
        Ok(())
    }
}
