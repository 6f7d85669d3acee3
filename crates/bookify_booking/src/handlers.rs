// --- File: crates/bookify_booking/src/handlers.rs ---
//! Axum handlers for the booking surface.
//!
//! Handlers stay thin: parse, call the ledger, map errors through the shared
//! status taxonomy, enqueue the sync action after a committed mutation. Sync
//! is best-effort relative to the ledger write; a mutation response never
//! waits on the external calendar.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use bookify_common::{BookifyError, HttpStatusCode, SyncActionKind, SyncNotifier};

use crate::availability::{is_date_bookable, occupied_slots};
use crate::ledger::{BookingPatch, Ledger, NewBooking};
use crate::models::{Booking, BookingSettings, Note, OutOfOfficeRange, WeekSchedule};
use crate::slots::generate_day_slots;

/// Shared state for the booking routes.
pub struct BookingState {
    pub ledger: Ledger,
    /// Absent when calendar sync is disabled; mutations then skip enqueueing.
    pub sync: Option<Arc<dyn SyncNotifier>>,
}

impl BookingState {
    /// Parks the sync action for the committed mutation. A parking failure
    /// is logged, never surfaced: the ledger write already happened and the
    /// response must reflect it.
    async fn notify(&self, action: SyncActionKind, provider_id: &str, booking_id: &str, tz: &str) {
        if let Some(sync) = &self.sync {
            if let Err(err) = sync.notify(action, provider_id, booking_id, tz).await {
                warn!(provider_id, booking_id, %err, "failed to park sync action");
            }
        }
    }
}

fn into_response_error(err: BookifyError) -> (StatusCode, String) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, err.to_string())
}

fn default_time_zone() -> String {
    "UTC".to_string()
}

// --- Availability ---

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    /// Target date in YYYY-MM-DD format
    pub date: NaiveDate,
    /// Booking to exclude from its own conflict view (edit flows)
    pub exclude_booking_id: Option<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub date: NaiveDate,
    /// False when the weekday is unavailable or the date is out of office;
    /// slot data is still returned for rendering, the date gate is coarse.
    pub bookable: bool,
    /// The slot grid offered for this surface.
    pub slots: Vec<String>,
    /// Occupied slot starts, sorted, HH:mm.
    pub occupied: Vec<String>,
}

/// Public booking form availability: fixed 30-minute grid.
pub async fn public_availability_handler(
    State(state): State<Arc<BookingState>>,
    Path(provider_id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, (StatusCode, String)> {
    availability(&state, &provider_id, query, state.ledger.step_minutes())
        .await
        .map(Json)
        .map_err(into_response_error)
}

/// Provider-facing availability: grid at the provider's configured interval.
pub async fn provider_availability_handler(
    State(state): State<Arc<BookingState>>,
    Path(provider_id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, (StatusCode, String)> {
    let settings = state
        .ledger
        .get_settings(&provider_id)
        .await
        .map_err(into_response_error)?;
    availability(&state, &provider_id, query, settings.time_interval.minutes())
        .await
        .map(Json)
        .map_err(into_response_error)
}

async fn availability(
    state: &BookingState,
    provider_id: &str,
    query: AvailabilityQuery,
    step_minutes: u32,
) -> Result<AvailabilityResponse, BookifyError> {
    let schedule = state.ledger.get_week_schedule(provider_id).await?;
    let out_of_office = state.ledger.get_out_of_office(provider_id).await?;
    let bookable = is_date_bookable(&schedule, &out_of_office, query.date);

    let mut occupied: Vec<String> = occupied_slots(
        state.ledger.store().as_ref(),
        provider_id,
        query.date,
        query.exclude_booking_id.as_deref(),
        step_minutes,
    )
    .await?
    .into_iter()
    .collect();
    occupied.sort();

    Ok(AvailabilityResponse {
        date: query.date,
        bookable,
        slots: generate_day_slots(step_minutes),
        occupied,
    })
}

// --- Propose ---

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProposeBookingRequest {
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub exclude_booking_id: Option<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProposeBookingResponse {
    pub accepted: bool,
}

pub async fn propose_booking_handler(
    State(state): State<Arc<BookingState>>,
    Path(provider_id): Path<String>,
    Json(request): Json<ProposeBookingRequest>,
) -> Result<Json<ProposeBookingResponse>, (StatusCode, String)> {
    state
        .ledger
        .propose_booking(
            &provider_id,
            request.date,
            &request.start_time,
            &request.end_time,
            request.exclude_booking_id.as_deref(),
        )
        .await
        .map_err(into_response_error)?;
    Ok(Json(ProposeBookingResponse { accepted: true }))
}

// --- Create ---

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub client_id: String,
    pub service: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PublicBookingRequest {
    pub client_name: String,
    pub client_email: Option<String>,
    pub service: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingResponse {
    pub booking_id: String,
}

pub async fn create_booking_handler(
    State(state): State<Arc<BookingState>>,
    Path(provider_id): Path<String>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<CreateBookingResponse>), (StatusCode, String)> {
    let booking_id = state
        .ledger
        .create_booking(
            &provider_id,
            NewBooking {
                client_id: request.client_id,
                service: request.service,
                date: request.date,
                start_time: request.start_time,
                end_time: request.end_time,
            },
        )
        .await
        .map_err(into_response_error)?;

    state.notify(SyncActionKind::Create, &provider_id, &booking_id, &request.time_zone).await;
    Ok((StatusCode::CREATED, Json(CreateBookingResponse { booking_id })))
}

/// Public-form booking: upsert the client by name, then create. The date
/// gate is enforced here; occupied slots alone do not reject a closed day.
pub async fn public_booking_handler(
    State(state): State<Arc<BookingState>>,
    Path(provider_id): Path<String>,
    Json(request): Json<PublicBookingRequest>,
) -> Result<(StatusCode, Json<CreateBookingResponse>), (StatusCode, String)> {
    let schedule = state
        .ledger
        .get_week_schedule(&provider_id)
        .await
        .map_err(into_response_error)?;
    let out_of_office = state
        .ledger
        .get_out_of_office(&provider_id)
        .await
        .map_err(into_response_error)?;
    if !is_date_bookable(&schedule, &out_of_office, request.date) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("{} is not open for bookings", request.date),
        ));
    }

    let client_id = state
        .ledger
        .upsert_client_by_name(
            &provider_id,
            &request.client_name,
            request.client_email.as_deref(),
        )
        .await
        .map_err(into_response_error)?;

    let booking_id = state
        .ledger
        .create_booking(
            &provider_id,
            NewBooking {
                client_id,
                service: request.service,
                date: request.date,
                start_time: request.start_time,
                end_time: request.end_time,
            },
        )
        .await
        .map_err(into_response_error)?;

    state.notify(SyncActionKind::Create, &provider_id, &booking_id, &request.time_zone).await;
    Ok((StatusCode::CREATED, Json(CreateBookingResponse { booking_id })))
}

// --- Read / update / cancel ---

pub async fn get_booking_handler(
    State(state): State<Arc<BookingState>>,
    Path((provider_id, booking_id)): Path<(String, String)>,
) -> Result<Json<Booking>, (StatusCode, String)> {
    state
        .ledger
        .get_booking(&provider_id, &booking_id)
        .await
        .map(Json)
        .map_err(into_response_error)
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingRequest {
    pub client_id: Option<String>,
    pub service: Option<String>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
}

pub async fn update_booking_handler(
    State(state): State<Arc<BookingState>>,
    Path((provider_id, booking_id)): Path<(String, String)>,
    Json(request): Json<UpdateBookingRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .ledger
        .update_booking(
            &provider_id,
            &booking_id,
            BookingPatch {
                client_id: request.client_id,
                service: request.service,
                date: request.date,
                start_time: request.start_time,
                end_time: request.end_time,
            },
        )
        .await
        .map_err(into_response_error)?;

    state.notify(SyncActionKind::Update, &provider_id, &booking_id, &request.time_zone).await;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CancelBookingRequest {
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
}

pub async fn cancel_booking_handler(
    State(state): State<Arc<BookingState>>,
    Path((provider_id, booking_id)): Path<(String, String)>,
    request: Option<Json<CancelBookingRequest>>,
) -> Result<StatusCode, (StatusCode, String)> {
    let time_zone = request
        .map(|Json(r)| r.time_zone)
        .unwrap_or_else(default_time_zone);
    state
        .ledger
        .cancel_booking(&provider_id, &booking_id)
        .await
        .map_err(into_response_error)?;

    // A cancel must delete the mirrored event.
    state.notify(SyncActionKind::Delete, &provider_id, &booking_id, &time_zone).await;
    Ok(StatusCode::NO_CONTENT)
}

// --- Notes ---

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NoteRequest {
    pub note_id: Option<String>,
    pub text: String,
}

pub async fn put_note_handler(
    State(state): State<Arc<BookingState>>,
    Path((provider_id, booking_id)): Path<(String, String)>,
    Json(request): Json<NoteRequest>,
) -> Result<Json<Note>, (StatusCode, String)> {
    state
        .ledger
        .append_or_edit_note(
            &provider_id,
            &booking_id,
            request.note_id.as_deref(),
            request.text,
        )
        .await
        .map(Json)
        .map_err(into_response_error)
}

pub async fn delete_note_handler(
    State(state): State<Arc<BookingState>>,
    Path((provider_id, booking_id, note_id)): Path<(String, String, String)>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .ledger
        .delete_note(&provider_id, &booking_id, &note_id)
        .await
        .map_err(into_response_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Schedule configuration ---

pub async fn get_working_hours_handler(
    State(state): State<Arc<BookingState>>,
    Path(provider_id): Path<String>,
) -> Result<Json<WeekSchedule>, (StatusCode, String)> {
    state
        .ledger
        .get_week_schedule(&provider_id)
        .await
        .map(Json)
        .map_err(into_response_error)
}

pub async fn put_working_hours_handler(
    State(state): State<Arc<BookingState>>,
    Path(provider_id): Path<String>,
    Json(schedule): Json<WeekSchedule>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .ledger
        .save_week_schedule(&provider_id, &schedule)
        .await
        .map_err(into_response_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_out_of_office_handler(
    State(state): State<Arc<BookingState>>,
    Path(provider_id): Path<String>,
) -> Result<Json<Vec<OutOfOfficeRange>>, (StatusCode, String)> {
    state
        .ledger
        .get_out_of_office(&provider_id)
        .await
        .map(Json)
        .map_err(into_response_error)
}

pub async fn add_out_of_office_handler(
    State(state): State<Arc<BookingState>>,
    Path(provider_id): Path<String>,
    Json(range): Json<OutOfOfficeRange>,
) -> Result<(StatusCode, Json<serde_json::Value>), (StatusCode, String)> {
    let range_id = state
        .ledger
        .add_out_of_office(&provider_id, range)
        .await
        .map_err(into_response_error)?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "rangeId": range_id })),
    ))
}

pub async fn get_settings_handler(
    State(state): State<Arc<BookingState>>,
    Path(provider_id): Path<String>,
) -> Result<Json<BookingSettings>, (StatusCode, String)> {
    state
        .ledger
        .get_settings(&provider_id)
        .await
        .map(Json)
        .map_err(into_response_error)
}

pub async fn put_settings_handler(
    State(state): State<Arc<BookingState>>,
    Path(provider_id): Path<String>,
    Json(settings): Json<BookingSettings>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .ledger
        .save_settings(&provider_id, settings)
        .await
        .map_err(into_response_error)?;
    Ok(StatusCode::NO_CONTENT)
}
