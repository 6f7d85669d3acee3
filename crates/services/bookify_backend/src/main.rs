// File: services/bookify_backend/src/main.rs
//! Bookify service binary: wires the store, the booking ledger and the
//! calendar sync stack together and serves the combined API under `/api`.

use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use bookify_booking::handlers::BookingState;
use bookify_booking::ledger::Ledger;
use bookify_booking::routes as booking_routes;
use bookify_common::SyncNotifier;
use bookify_config::{load_config, AppConfig};
use bookify_gcal::handlers::GcalState;
use bookify_gcal::routes as gcal_routes;
use bookify_gcal::{
    CredentialVault, GoogleCalendarClient, GoogleTokenEndpoint, SyncCoordinator, SyncOutbox,
};
use bookify_store::{FirebaseRtdb, TreeStore};

/// Builds the calendar stack, or `None` when gcal is disabled or misconfigured.
fn build_gcal(
    config: &AppConfig,
    store: Arc<dyn TreeStore>,
) -> Option<(Arc<GcalState>, SyncOutbox)> {
    if !config.use_gcal {
        return None;
    }
    let Some(gcal_config) = config.gcal.clone() else {
        warn!("use_gcal is set but the [gcal] section is missing; sync disabled");
        return None;
    };
    let exchanger = match GoogleTokenEndpoint::new(&gcal_config) {
        Ok(exchanger) => Arc::new(exchanger),
        Err(err) => {
            warn!(%err, "gcal misconfigured; sync disabled");
            return None;
        }
    };
    let vault = Arc::new(CredentialVault::new(store.clone(), exchanger));
    let coordinator = Arc::new(SyncCoordinator::new(
        store.clone(),
        vault.clone(),
        Arc::new(GoogleCalendarClient::new()),
        gcal_config.calendar_id.clone(),
    ));
    let outbox = SyncOutbox::new(store, coordinator.clone());
    let state = Arc::new(GcalState {
        config: gcal_config,
        vault,
        coordinator,
        outbox: outbox.clone(),
    });
    Some((state, outbox))
}

#[tokio::main]
async fn main() {
    bookify_common::logging::init();
    let config = Arc::new(load_config().expect("failed to load configuration"));

    let store: Arc<dyn TreeStore> = Arc::new(FirebaseRtdb::new(&config.store));
    let ledger = Ledger::new(store.clone(), config.booking.public_step_minutes);

    let gcal = build_gcal(&config, store.clone());
    let sync: Option<Arc<dyn SyncNotifier>> = gcal
        .as_ref()
        .map(|(_, outbox)| Arc::new(outbox.clone()) as Arc<dyn SyncNotifier>);

    let booking_state = Arc::new(BookingState { ledger, sync });

    let mut api_router = Router::new()
        .route("/", get(|| async { "Bookify API" }))
        .merge(booking_routes::routes(booking_state));

    if let Some((gcal_state, outbox)) = gcal {
        api_router = api_router.merge(gcal_routes::routes(gcal_state));

        // Pick up actions parked before the last shutdown. One pass; parked
        // failures wait for the next mutation or an explicit drain call.
        match outbox.drain_all().await {
            Ok(cleared) => info!(cleared, "startup sync drain complete"),
            Err(err) => warn!(%err, "startup sync drain failed"),
        }
    }

    let app = Router::new()
        .nest("/api", api_router)
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .expect("failed to bind server address");
    info!("listening on http://{addr}/api");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
        .expect("server error");
}
