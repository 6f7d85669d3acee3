// --- File: crates/bookify_gcal/src/routes.rs ---

use crate::handlers::{
    callback_handler, connect_handler, disconnect_handler, drain_handler, status_handler,
    sync_handler, GcalState,
};
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

/// Creates a router containing all routes for the calendar feature.
pub fn routes(state: Arc<GcalState>) -> Router {
    Router::new()
        .route("/gcal/connect", get(connect_handler))
        .route("/gcal/oauth/callback", get(callback_handler))
        .route(
            "/providers/{provider_id}/calendar/status",
            get(status_handler),
        )
        .route(
            "/providers/{provider_id}/calendar",
            delete(disconnect_handler),
        )
        .route("/providers/{provider_id}/calendar/sync", post(sync_handler))
        .route(
            "/providers/{provider_id}/calendar/sync/drain",
            post(drain_handler),
        )
        .with_state(state)
}
