// --- File: crates/bookify_gcal/src/handlers.rs ---
//! Axum handlers for calendar connection and sync.
//!
//! The OAuth flow is two redirects: `/connect` sends the browser to the
//! Google consent page with a signed state, the callback verifies that state,
//! exchanges the code and sends the browser back to the origin it named.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Json, Redirect},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use bookify_common::{BookifyError, HttpStatusCode, SyncActionKind};
use bookify_config::GcalConfig;

use crate::oauth::{authorize_url, sign_state, verify_state, AuthState, CredentialVault};
use crate::outbox::SyncOutbox;
use crate::sync::{SyncAction, SyncCoordinator, SyncOutcome};

/// Shared state for the calendar routes.
pub struct GcalState {
    pub config: GcalConfig,
    pub vault: Arc<CredentialVault>,
    pub coordinator: Arc<SyncCoordinator>,
    pub outbox: SyncOutbox,
}

impl GcalState {
    fn signing_key(&self) -> Result<&str, BookifyError> {
        self.config
            .state_signing_key
            .as_deref()
            .ok_or_else(|| BookifyError::Config("missing gcal state signing key".to_string()))
    }
}

fn into_response_error(err: BookifyError) -> (StatusCode, String) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, err.to_string())
}

// --- OAuth connect flow ---

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ConnectQuery {
    pub provider_id: String,
    /// Where the browser lands after the callback.
    pub origin: String,
}

pub async fn connect_handler(
    State(state): State<Arc<GcalState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<Redirect, (StatusCode, String)> {
    let auth_state = AuthState {
        provider_id: query.provider_id,
        origin: query.origin,
    };
    let key = state.signing_key().map_err(into_response_error)?;
    let signed = sign_state(key, &auth_state).map_err(into_response_error)?;
    let url = authorize_url(&state.config, &signed).map_err(into_response_error)?;
    Ok(Redirect::temporary(&url))
}

#[derive(Deserialize, Debug)]
pub struct CallbackQuery {
    pub state: String,
    #[serde(default)]
    pub code: Option<String>,
    /// Set by Google when the user denies consent.
    #[serde(default)]
    pub error: Option<String>,
}

pub async fn callback_handler(
    State(state): State<Arc<GcalState>>,
    Query(query): Query<CallbackQuery>,
) -> Result<Redirect, (StatusCode, String)> {
    let key = state.signing_key().map_err(into_response_error)?;
    // Verify before anything else; an unverified state never picks the
    // provider whose tokens get written.
    let auth_state = verify_state(key, &query.state).map_err(into_response_error)?;

    if let Some(error) = query.error {
        warn!(provider_id = %auth_state.provider_id, error, "consent denied");
        return Ok(Redirect::temporary(&format!(
            "{}?calendar=denied",
            auth_state.origin
        )));
    }
    let Some(code) = query.code else {
        return Err((
            StatusCode::BAD_REQUEST,
            "callback carried neither code nor error".to_string(),
        ));
    };

    match state
        .vault
        .complete_connection(&auth_state.provider_id, &code)
        .await
    {
        Ok(()) => Ok(Redirect::temporary(&format!(
            "{}?calendar=connected",
            auth_state.origin
        ))),
        Err(err) => {
            warn!(provider_id = %auth_state.provider_id, %err, "code exchange failed");
            Ok(Redirect::temporary(&format!(
                "{}?calendar=error",
                auth_state.origin
            )))
        }
    }
}

// --- Connection status / disconnect ---

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationStatusResponse {
    pub integrated: bool,
}

pub async fn status_handler(
    State(state): State<Arc<GcalState>>,
    Path(provider_id): Path<String>,
) -> Result<Json<IntegrationStatusResponse>, (StatusCode, String)> {
    let integration = state
        .vault
        .integration(&provider_id)
        .await
        .map_err(into_response_error)?;
    Ok(Json(IntegrationStatusResponse {
        integrated: integration.map(|i| i.integrated).unwrap_or(false),
    }))
}

pub async fn disconnect_handler(
    State(state): State<Arc<GcalState>>,
    Path(provider_id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .vault
        .disconnect(&provider_id)
        .await
        .map_err(into_response_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Explicit sync trigger ---

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    pub action: SyncActionKind,
    pub booking_id: String,
    /// Must match the path provider when present; a mismatch is rejected.
    #[serde(default)]
    pub provider_id: Option<String>,
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
}

fn default_time_zone() -> String {
    "UTC".to_string()
}

/// Runs one sync action inline and reports the outcome. Used by operators
/// and by the frontend after offline edits; the regular mutation path goes
/// through the outbox instead.
pub async fn sync_handler(
    State(state): State<Arc<GcalState>>,
    Path(provider_id): Path<String>,
    Json(request): Json<SyncRequest>,
) -> Result<Json<SyncOutcome>, (StatusCode, String)> {
    if let Some(body_provider) = &request.provider_id {
        if body_provider != &provider_id {
            return Err((
                StatusCode::FORBIDDEN,
                "providerId does not match the request path".to_string(),
            ));
        }
    }

    let action = SyncAction {
        action: request.action,
        booking_id: request.booking_id,
        provider_id,
        time_zone: request.time_zone,
    };
    state
        .coordinator
        .sync(&action)
        .await
        .map(Json)
        .map_err(into_response_error)
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DrainResponse {
    pub cleared: usize,
}

/// Retries every parked sync action for the provider.
pub async fn drain_handler(
    State(state): State<Arc<GcalState>>,
    Path(provider_id): Path<String>,
) -> Result<Json<DrainResponse>, (StatusCode, String)> {
    state
        .outbox
        .drain_provider(&provider_id)
        .await
        .map(|cleared| Json(DrainResponse { cleared }))
        .map_err(into_response_error)
}
