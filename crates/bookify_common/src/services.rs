// --- File: crates/bookify_common/src/services.rs ---
//! Service abstractions for external services.
//!
//! These traits decouple the sync coordinator from the concrete Google
//! Calendar client so it can be exercised against scripted mocks in tests.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Type alias for a boxed future that returns a Result
pub type BoxFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Errors surfaced by calendar API implementations.
///
/// `NotFound` and `Gone` are kept distinguishable from other failures because
/// the delete path downgrades them to success (the mirror already converged).
#[derive(Error, Debug)]
pub enum CalendarApiError {
    /// The remote event does not exist (HTTP 404).
    #[error("event not found: {0}")]
    NotFound(String),
    /// The remote event was deleted earlier (HTTP 410).
    #[error("event gone: {0}")]
    Gone(String),
    /// The access token was rejected.
    #[error("calendar auth rejected: {0}")]
    Auth(String),
    /// Any other API or transport failure.
    #[error("calendar API error: {0}")]
    Api(String),
}

/// An event start or end, composed of a local date-time plus an IANA zone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventTime {
    #[serde(rename = "dateTime")]
    pub date_time: String,
    #[serde(rename = "timeZone")]
    pub time_zone: String,
}

/// A single event attendee, identified by email only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventAttendee {
    pub email: String,
}

/// The event body written to the external calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventPayload {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<EventAttendee>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminders: Option<serde_json::Value>,
}

/// Represents the result of a calendar event operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventResult {
    /// The ID of the event.
    pub event_id: Option<String>,
    /// The status of the event as reported by the API.
    pub status: String,
}

/// A trait for external calendar operations.
///
/// Implementations receive a live bearer token per call; token lifecycle is
/// owned by the credential vault, not by the calendar client.
pub trait CalendarApi: Send + Sync {
    /// Insert a new event; the returned result carries the originated id.
    fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        payload: EventPayload,
    ) -> BoxFuture<'_, EventResult, CalendarApiError>;

    /// Update an existing event by id.
    fn update_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
        payload: EventPayload,
    ) -> BoxFuture<'_, EventResult, CalendarApiError>;

    /// Delete an event by id. Raises `NotFound`/`Gone` distinguishably.
    fn delete_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> BoxFuture<'_, (), CalendarApiError>;
}

impl CalendarApiError {
    /// True for the error classes a delete treats as already-converged.
    pub fn is_already_deleted(&self) -> bool {
        matches!(self, CalendarApiError::NotFound(_) | CalendarApiError::Gone(_))
    }
}

/// The booking lifecycle event a sync request mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncActionKind {
    Create,
    Update,
    Delete,
}

/// Seam between booking mutations and calendar sync.
///
/// The ledger side calls this after a committed write. Implementations park
/// the action durably before returning (one local store write, awaited on
/// the request path) and deliver it off the request path, so a mutation
/// never blocks on (or fails because of) the external calendar. An `Err`
/// means the action could not be parked; callers log it, the ledger write
/// stays committed.
pub trait SyncNotifier: Send + Sync {
    fn notify(
        &self,
        action: SyncActionKind,
        provider_id: &str,
        booking_id: &str,
        time_zone: &str,
    ) -> BoxFuture<'_, (), crate::error::BookifyError>;
}
