// --- File: crates/bookify_booking/src/routes.rs ---

use crate::handlers::{
    add_out_of_office_handler, cancel_booking_handler, create_booking_handler,
    delete_note_handler, get_booking_handler, get_out_of_office_handler, get_settings_handler,
    get_working_hours_handler, propose_booking_handler, provider_availability_handler,
    public_availability_handler, public_booking_handler, put_note_handler, put_settings_handler,
    put_working_hours_handler, update_booking_handler, BookingState,
};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

/// Creates a router containing all routes for the booking feature.
pub fn routes(state: Arc<BookingState>) -> Router {
    Router::new()
        .route(
            "/providers/{provider_id}/availability",
            get(public_availability_handler),
        )
        .route(
            "/providers/{provider_id}/admin/availability",
            get(provider_availability_handler),
        )
        .route(
            "/providers/{provider_id}/bookings/propose",
            post(propose_booking_handler),
        )
        .route(
            "/providers/{provider_id}/bookings",
            post(create_booking_handler),
        )
        .route(
            "/providers/{provider_id}/public-booking",
            post(public_booking_handler),
        )
        .route(
            "/providers/{provider_id}/bookings/{booking_id}",
            get(get_booking_handler).patch(update_booking_handler),
        )
        .route(
            "/providers/{provider_id}/bookings/{booking_id}/cancel",
            post(cancel_booking_handler),
        )
        .route(
            "/providers/{provider_id}/bookings/{booking_id}/notes",
            put(put_note_handler),
        )
        .route(
            "/providers/{provider_id}/bookings/{booking_id}/notes/{note_id}",
            delete(delete_note_handler),
        )
        .route(
            "/providers/{provider_id}/working-hours",
            get(get_working_hours_handler).put(put_working_hours_handler),
        )
        .route(
            "/providers/{provider_id}/out-of-office",
            get(get_out_of_office_handler).post(add_out_of_office_handler),
        )
        .route(
            "/providers/{provider_id}/settings",
            get(get_settings_handler).put(put_settings_handler),
        )
        .with_state(state)
}
