// --- File: crates/bookify_gcal/src/client.rs ---
//! Google Calendar events REST client.
//!
//! Implements [`CalendarApi`] with per-call bearer tokens; the credential
//! vault owns the token lifecycle. 404 and 410 on delete stay distinguishable
//! because the coordinator downgrades exactly those to success.

use reqwest::{Client, StatusCode};
use serde::Deserialize;

use bookify_common::{BoxFuture, CalendarApi, CalendarApiError, EventPayload, EventResult};

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// REST client for the Google Calendar events surface.
pub struct GoogleCalendarClient {
    client: Client,
    base_url: String,
}

impl Default for GoogleCalendarClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GoogleCalendarClient {
    pub fn new() -> Self {
        Self {
            client: bookify_common::HTTP_CLIENT.clone(),
            base_url: CALENDAR_API_BASE.to_string(),
        }
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!("{}/calendars/{}/events", self.base_url, calendar_id)
    }

    fn event_url(&self, calendar_id: &str, event_id: &str) -> String {
        format!("{}/{}", self.events_url(calendar_id), event_id)
    }
}

#[derive(Debug, Deserialize)]
struct ApiEvent {
    id: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

async fn map_error(response: reqwest::Response) -> CalendarApiError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::NOT_FOUND => CalendarApiError::NotFound(body),
        StatusCode::GONE => CalendarApiError::Gone(body),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CalendarApiError::Auth(body),
        other => CalendarApiError::Api(format!("{other}: {body}")),
    }
}

async fn parse_event(response: reqwest::Response) -> Result<EventResult, CalendarApiError> {
    let event: ApiEvent = response
        .json()
        .await
        .map_err(|e| CalendarApiError::Api(format!("malformed event response: {e}")))?;
    Ok(EventResult {
        event_id: event.id,
        status: event.status.unwrap_or_else(|| "confirmed".to_string()),
    })
}

impl CalendarApi for GoogleCalendarClient {
    fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        payload: EventPayload,
    ) -> BoxFuture<'_, EventResult, CalendarApiError> {
        let url = self.events_url(calendar_id);
        let token = access_token.to_string();
        Box::pin(async move {
            let response = self
                .client
                .post(url)
                .bearer_auth(token)
                .json(&payload)
                .send()
                .await
                .map_err(|e| CalendarApiError::Api(e.to_string()))?;
            if !response.status().is_success() {
                return Err(map_error(response).await);
            }
            parse_event(response).await
        })
    }

    fn update_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
        payload: EventPayload,
    ) -> BoxFuture<'_, EventResult, CalendarApiError> {
        let url = self.event_url(calendar_id, event_id);
        let token = access_token.to_string();
        Box::pin(async move {
            let response = self
                .client
                .put(url)
                .bearer_auth(token)
                .json(&payload)
                .send()
                .await
                .map_err(|e| CalendarApiError::Api(e.to_string()))?;
            if !response.status().is_success() {
                return Err(map_error(response).await);
            }
            parse_event(response).await
        })
    }

    fn delete_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> BoxFuture<'_, (), CalendarApiError> {
        let url = self.event_url(calendar_id, event_id);
        let token = access_token.to_string();
        Box::pin(async move {
            let response = self
                .client
                .delete(url)
                .bearer_auth(token)
                .send()
                .await
                .map_err(|e| CalendarApiError::Api(e.to_string()))?;
            if !response.status().is_success() {
                return Err(map_error(response).await);
            }
            Ok(())
        })
    }
}
