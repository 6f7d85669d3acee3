// --- File: crates/bookify_booking/src/ledger.rs ---
//! The booking ledger: CRUD and status transitions over booking records,
//! plus the notes sub-collection lifecycle and client upsert-by-name.
//!
//! Every mutation validates its interval and runs conflict detection before
//! writing. The store gives atomic single-path writes but no compare-and-swap
//! across a read-then-write, so two concurrent overlapping proposals can both
//! pass validation before either write lands. Known race, kept as-is; closing
//! it would need a version stamp per `(provider, date)` bucket compared at
//! write time.

use chrono::{NaiveDate, Utc};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use bookify_common::{not_found, validation_error, BookifyError};
use bookify_store::{paths, TreeStore};

use crate::availability::{has_conflict, occupied_slots};
use crate::models::{
    Booking, BookingSettings, BookingStatus, Client, Note, OutOfOfficeRange, WeekSchedule,
};
use crate::slots::parse_hhmm;

/// Fields for a new booking.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub client_id: String,
    pub service: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
}

/// Partial fields for a booking edit; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct BookingPatch {
    pub client_id: Option<String>,
    pub service: Option<String>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

/// The booking ledger over a tree store.
///
/// `step_minutes` is the occupancy step used for conflict detection; the
/// public surface pins it to 30, provider-facing surfaces pass the
/// configured interval.
pub struct Ledger {
    store: Arc<dyn TreeStore>,
    step_minutes: u32,
}

impl Ledger {
    pub fn new(store: Arc<dyn TreeStore>, step_minutes: u32) -> Self {
        Self {
            store,
            step_minutes,
        }
    }

    pub fn store(&self) -> &Arc<dyn TreeStore> {
        &self.store
    }

    pub fn step_minutes(&self) -> u32 {
        self.step_minutes
    }

    fn check_interval(start: &str, end: &str) -> Result<(), BookifyError> {
        let (Some(s), Some(e)) = (parse_hhmm(start), parse_hhmm(end)) else {
            return Err(validation_error(format!(
                "times must be zero-padded HH:mm, got {start}..{end}"
            )));
        };
        if e <= s {
            return Err(validation_error(format!(
                "end time ({end}) must be after start time ({start})"
            )));
        }
        Ok(())
    }

    /// The occupied-slot view for a provider and date.
    pub async fn check_availability(
        &self,
        provider_id: &str,
        date: NaiveDate,
        exclude_booking_id: Option<&str>,
    ) -> Result<HashSet<String>, BookifyError> {
        occupied_slots(
            self.store.as_ref(),
            provider_id,
            date,
            exclude_booking_id,
            self.step_minutes,
        )
        .await
    }

    /// Accept/reject for a proposed interval. Rejects with `Validation`
    /// before any conflict check when the interval is inverted or malformed.
    pub async fn propose_booking(
        &self,
        provider_id: &str,
        date: NaiveDate,
        start_time: &str,
        end_time: &str,
        exclude_booking_id: Option<&str>,
    ) -> Result<(), BookifyError> {
        Self::check_interval(start_time, end_time)?;
        let occupied = self
            .check_availability(provider_id, date, exclude_booking_id)
            .await?;
        if has_conflict(start_time, end_time, &occupied, self.step_minutes) {
            return Err(BookifyError::Conflict(format!(
                "{date} {start_time}..{end_time} overlaps an existing booking"
            )));
        }
        Ok(())
    }

    /// Creates a booking after interval validation and conflict detection.
    /// Returns the generated booking id.
    pub async fn create_booking(
        &self,
        provider_id: &str,
        new: NewBooking,
    ) -> Result<String, BookifyError> {
        self.propose_booking(provider_id, new.date, &new.start_time, &new.end_time, None)
            .await?;

        let booking_id = Uuid::new_v4().to_string();
        let booking = Booking {
            id: booking_id.clone(),
            client_id: new.client_id,
            service: new.service,
            date: new.date,
            start_time: new.start_time,
            end_time: new.end_time,
            status: BookingStatus::Booked,
            notes: Vec::new(),
            external_event_id: None,
        };
        self.store
            .set(
                &paths::booking(provider_id, &booking_id),
                &serde_json::to_value(&booking)?,
            )
            .await?;
        info!(provider_id, booking_id, date = %booking.date, "booking created");
        Ok(booking_id)
    }

    /// Loads a booking, resolving `NotFound` for absent records.
    pub async fn get_booking(
        &self,
        provider_id: &str,
        booking_id: &str,
    ) -> Result<Booking, BookifyError> {
        let value = self
            .store
            .get(&paths::booking(provider_id, booking_id))
            .await?
            .ok_or_else(|| not_found(format!("booking {booking_id}")))?;
        let mut booking: Booking = serde_json::from_value(value)?;
        booking.id = booking_id.to_string();
        Ok(booking)
    }

    /// Edits a booking. Conflict detection excludes the booking itself, and
    /// a date change re-fetches the occupied set for the new date.
    pub async fn update_booking(
        &self,
        provider_id: &str,
        booking_id: &str,
        patch: BookingPatch,
    ) -> Result<(), BookifyError> {
        let current = self.get_booking(provider_id, booking_id).await?;

        let date = patch.date.unwrap_or(current.date);
        let start_time = patch.start_time.unwrap_or(current.start_time);
        let end_time = patch.end_time.unwrap_or(current.end_time);
        self.propose_booking(provider_id, date, &start_time, &end_time, Some(booking_id))
            .await?;

        let mut fields = Map::new();
        fields.insert("date".to_string(), json!(date.format("%Y-%m-%d").to_string()));
        fields.insert("startTime".to_string(), json!(start_time));
        fields.insert("endTime".to_string(), json!(end_time));
        if let Some(client_id) = patch.client_id {
            fields.insert("clientId".to_string(), json!(client_id));
        }
        if let Some(service) = patch.service {
            fields.insert("service".to_string(), json!(service));
        }
        self.store
            .update(&paths::booking(provider_id, booking_id), &fields)
            .await?;
        debug!(provider_id, booking_id, "booking updated");
        Ok(())
    }

    /// `Booked → Cancelled`, one-way. The record is kept for the client's
    /// booking history; only the status changes.
    pub async fn cancel_booking(
        &self,
        provider_id: &str,
        booking_id: &str,
    ) -> Result<(), BookifyError> {
        let booking = self.get_booking(provider_id, booking_id).await?;
        if booking.status == BookingStatus::Cancelled {
            debug!(provider_id, booking_id, "booking already cancelled");
            return Ok(());
        }
        let mut fields = Map::new();
        fields.insert("status".to_string(), json!(BookingStatus::Cancelled));
        self.store
            .update(&paths::booking(provider_id, booking_id), &fields)
            .await?;
        info!(provider_id, booking_id, "booking cancelled");
        Ok(())
    }

    /// Appends a note, or replaces the text and timestamp of the note with
    /// `note_id`. The whole notes array is rewritten in one atomic path
    /// write; the store is last-write-wins per path, so two concurrent
    /// editors silently clobber each other (the store API has no ETag).
    pub async fn append_or_edit_note(
        &self,
        provider_id: &str,
        booking_id: &str,
        note_id: Option<&str>,
        text: String,
    ) -> Result<Note, BookifyError> {
        let booking = self.get_booking(provider_id, booking_id).await?;
        let mut notes = booking.notes;
        let now = Utc::now().timestamp_millis();

        let note = match note_id {
            Some(id) => {
                let existing = notes
                    .iter_mut()
                    .find(|n| n.id == id)
                    .ok_or_else(|| not_found(format!("note {id} on booking {booking_id}")))?;
                existing.text = text;
                existing.timestamp = now;
                existing.clone()
            }
            None => {
                let note = Note {
                    id: Uuid::new_v4().to_string(),
                    text,
                    timestamp: now,
                };
                notes.push(note.clone());
                note
            }
        };
        notes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        self.replace_notes(provider_id, booking_id, &notes).await?;
        Ok(note)
    }

    /// Removes the note with `note_id` and rewrites the array. Deleting a
    /// note that is already gone succeeds.
    pub async fn delete_note(
        &self,
        provider_id: &str,
        booking_id: &str,
        note_id: &str,
    ) -> Result<(), BookifyError> {
        let booking = self.get_booking(provider_id, booking_id).await?;
        let before = booking.notes.len();
        let notes: Vec<Note> = booking
            .notes
            .into_iter()
            .filter(|n| n.id != note_id)
            .collect();
        if notes.len() == before {
            debug!(provider_id, booking_id, note_id, "note already absent");
        }
        self.replace_notes(provider_id, booking_id, &notes).await
    }

    async fn replace_notes(
        &self,
        provider_id: &str,
        booking_id: &str,
        notes: &[Note],
    ) -> Result<(), BookifyError> {
        let path = format!("{}/notes", paths::booking(provider_id, booking_id));
        self.store.set(&path, &serde_json::to_value(notes)?).await?;
        Ok(())
    }

    /// Looks a client up by name, creating the record when absent. Returns
    /// the client id. Precedes public-form booking creation.
    pub async fn upsert_client_by_name(
        &self,
        provider_id: &str,
        name: &str,
        email: Option<&str>,
    ) -> Result<String, BookifyError> {
        if name.trim().is_empty() {
            return Err(validation_error("client name must not be empty"));
        }
        let hits = self
            .store
            .query_by_field(&paths::clients(provider_id), "name", &json!(name))
            .await?;
        if let Some((id, existing)) = hits.into_iter().next() {
            // Fill in an email we did not have before; never overwrite one.
            if existing.get("email").is_none() {
                if let Some(email) = email {
                    let mut fields = Map::new();
                    fields.insert("email".to_string(), json!(email));
                    self.store
                        .update(&paths::client(provider_id, &id), &fields)
                        .await?;
                }
            }
            return Ok(id);
        }

        let client_id = Uuid::new_v4().to_string();
        let client = Client {
            id: client_id.clone(),
            name: name.to_string(),
            email: email.map(str::to_string),
        };
        self.store
            .set(
                &paths::client(provider_id, &client_id),
                &serde_json::to_value(&client)?,
            )
            .await?;
        info!(provider_id, client_id, "client created from public form");
        Ok(client_id)
    }

    /// Loads a client record, if present.
    pub async fn get_client(
        &self,
        provider_id: &str,
        client_id: &str,
    ) -> Result<Option<Client>, BookifyError> {
        let Some(value) = self.store.get(&paths::client(provider_id, client_id)).await? else {
            return Ok(None);
        };
        let mut client: Client = serde_json::from_value(value)?;
        client.id = client_id.to_string();
        Ok(Some(client))
    }

    // --- Schedule configuration ---
    // Read as explicit inputs by the availability callers; malformed or
    // absent records fall back to defaults rather than blocking bookings.

    pub async fn get_week_schedule(&self, provider_id: &str) -> Result<WeekSchedule, BookifyError> {
        let Some(value) = self.store.get(&paths::working_hours(provider_id)).await? else {
            return Ok(WeekSchedule::default());
        };
        match serde_json::from_value(value) {
            Ok(schedule) => Ok(schedule),
            Err(err) => {
                warn!(provider_id, %err, "malformed working hours, using defaults");
                Ok(WeekSchedule::default())
            }
        }
    }

    pub async fn save_week_schedule(
        &self,
        provider_id: &str,
        schedule: &WeekSchedule,
    ) -> Result<(), BookifyError> {
        schedule.validate()?;
        self.store
            .set(
                &paths::working_hours(provider_id),
                &serde_json::to_value(schedule)?,
            )
            .await?;
        Ok(())
    }

    pub async fn get_out_of_office(
        &self,
        provider_id: &str,
    ) -> Result<Vec<OutOfOfficeRange>, BookifyError> {
        let Some(value) = self.store.get(&paths::out_of_office(provider_id)).await? else {
            return Ok(Vec::new());
        };
        // Stored keyed by range id; order does not matter for union semantics.
        let ranges = match value {
            Value::Object(map) => map
                .into_values()
                .filter_map(|v| serde_json::from_value(v).ok())
                .collect(),
            Value::Array(items) => items
                .into_iter()
                .filter_map(|v| serde_json::from_value(v).ok())
                .collect(),
            _ => Vec::new(),
        };
        Ok(ranges)
    }

    pub async fn add_out_of_office(
        &self,
        provider_id: &str,
        range: OutOfOfficeRange,
    ) -> Result<String, BookifyError> {
        range.validate()?;
        let range_id = Uuid::new_v4().to_string();
        let path = format!("{}/{}", paths::out_of_office(provider_id), range_id);
        self.store.set(&path, &serde_json::to_value(&range)?).await?;
        Ok(range_id)
    }

    pub async fn get_settings(&self, provider_id: &str) -> Result<BookingSettings, BookifyError> {
        let Some(value) = self.store.get(&paths::booking_settings(provider_id)).await? else {
            return Ok(BookingSettings::default());
        };
        match serde_json::from_value(value) {
            Ok(settings) => Ok(settings),
            Err(err) => {
                warn!(provider_id, %err, "malformed booking settings, using defaults");
                Ok(BookingSettings::default())
            }
        }
    }

    pub async fn save_settings(
        &self,
        provider_id: &str,
        settings: BookingSettings,
    ) -> Result<(), BookifyError> {
        self.store
            .set(
                &paths::booking_settings(provider_id),
                &serde_json::to_value(settings)?,
            )
            .await?;
        Ok(())
    }
}
