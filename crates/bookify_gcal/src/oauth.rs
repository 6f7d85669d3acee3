// --- File: crates/bookify_gcal/src/oauth.rs ---
//! Credential vault: per-provider OAuth2 tokens for Google Calendar.
//!
//! The vault owns the whole `calendarIntegration/{providerId}` record:
//! created on code exchange, tokens refreshed in place, removed wholesale on
//! disconnect. Refresh is not mutex-guarded per provider, so two concurrent
//! sync calls may both refresh; last-write-wins storage makes the duplicate
//! harmless, just wasteful.

use base64::engine::general_purpose::URL_SAFE_NO_PAD as base64_engine;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{info, warn};

use bookify_common::{credential_error, BookifyError, BoxFuture};
use bookify_config::GcalConfig;
use bookify_store::{paths, TreeStore};

type HmacSha256 = Hmac<Sha256>;

/// Refresh when the access token expires within this margin.
const REFRESH_MARGIN_MS: i64 = 60_000;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar.events";

// --- Stored shapes ---

/// The stored token set. `refresh_token` survives refreshes that omit it, since
/// refresh tokens are not reissued on every exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    pub expiry_epoch_millis: i64,
}

impl TokenSet {
    fn expires_within(&self, margin_ms: i64) -> bool {
        self.expiry_epoch_millis < Utc::now().timestamp_millis() + margin_ms
    }
}

/// Per-provider integration record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarIntegration {
    pub integrated: bool,
    pub tokens: TokenSet,
}

// --- Token endpoint boundary ---

/// Response of the Google OAuth token endpoint (code and refresh exchanges).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Absolute expiry in epoch milliseconds, when the endpoint supplies it.
    #[serde(default)]
    pub expiry_date: Option<i64>,
    /// Relative lifetime in seconds, the usual Google form.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl TokenResponse {
    fn expiry_epoch_millis(&self) -> i64 {
        self.expiry_date.unwrap_or_else(|| {
            Utc::now().timestamp_millis() + self.expires_in.unwrap_or(0) * 1000
        })
    }
}

/// The OAuth token endpoint, abstracted so the vault can be exercised
/// against a scripted exchanger in tests.
pub trait TokenExchanger: Send + Sync {
    fn exchange_code(&self, code: &str) -> BoxFuture<'_, TokenResponse, BookifyError>;
    fn refresh(&self, refresh_token: &str) -> BoxFuture<'_, TokenResponse, BookifyError>;
}

/// Production exchanger: form posts against the Google token endpoint.
pub struct GoogleTokenEndpoint {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl GoogleTokenEndpoint {
    pub fn new(config: &GcalConfig) -> Result<Self, BookifyError> {
        let client_secret = config
            .client_secret
            .clone()
            .ok_or_else(|| BookifyError::Config("missing gcal client secret".to_string()))?;
        Ok(Self {
            client: bookify_common::HTTP_CLIENT.clone(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            client_id: config.client_id.clone(),
            client_secret,
            redirect_uri: config.redirect_uri.clone(),
        })
    }

    async fn post_form(&self, form: Vec<(&str, String)>) -> Result<TokenResponse, BookifyError> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| credential_error(format!("token endpoint unreachable: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(credential_error(format!(
                "token endpoint returned {status}: {body}"
            )));
        }
        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| credential_error(format!("malformed token response: {e}")))
    }
}

impl TokenExchanger for GoogleTokenEndpoint {
    fn exchange_code(&self, code: &str) -> BoxFuture<'_, TokenResponse, BookifyError> {
        let code = code.to_string();
        Box::pin(async move {
            self.post_form(vec![
                ("grant_type", "authorization_code".to_string()),
                ("code", code),
                ("client_id", self.client_id.clone()),
                ("client_secret", self.client_secret.clone()),
                ("redirect_uri", self.redirect_uri.clone()),
            ])
            .await
        })
    }

    fn refresh(&self, refresh_token: &str) -> BoxFuture<'_, TokenResponse, BookifyError> {
        let refresh_token = refresh_token.to_string();
        Box::pin(async move {
            self.post_form(vec![
                ("grant_type", "refresh_token".to_string()),
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.clone()),
                ("client_secret", self.client_secret.clone()),
            ])
            .await
        })
    }
}

// --- Signed OAuth state ---

/// The payload carried through the OAuth redirect round-trip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub provider_id: String,
    /// Where the browser returns after the callback completes.
    pub origin: String,
}

/// Signs the state as `base64url(json) . hex(hmac_sha256)`.
pub fn sign_state(key: &str, state: &AuthState) -> Result<String, BookifyError> {
    let payload = base64_engine.encode(serde_json::to_vec(state)?);
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|_| BookifyError::Config("empty state signing key".to_string()))?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());
    Ok(format!("{payload}.{signature}"))
}

/// Verifies and decodes a signed state. Rejection is a validation error;
/// a forged or truncated state never reaches the token exchange.
pub fn verify_state(key: &str, signed: &str) -> Result<AuthState, BookifyError> {
    let (payload, signature) = signed
        .split_once('.')
        .ok_or_else(|| BookifyError::Validation("malformed state token".to_string()))?;
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|_| BookifyError::Config("empty state signing key".to_string()))?;
    mac.update(payload.as_bytes());
    let signature =
        hex::decode(signature).map_err(|_| BookifyError::Validation("bad state signature".to_string()))?;
    mac.verify_slice(&signature)
        .map_err(|_| BookifyError::Validation("state signature mismatch".to_string()))?;
    let bytes = base64_engine
        .decode(payload)
        .map_err(|_| BookifyError::Validation("bad state payload".to_string()))?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Builds the Google consent URL. `access_type=offline` + `prompt=consent`
/// so the exchange yields a refresh token.
pub fn authorize_url(config: &GcalConfig, signed_state: &str) -> Result<String, BookifyError> {
    let query = serde_urlencoded::to_string([
        ("client_id", config.client_id.as_str()),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("response_type", "code"),
        ("scope", CALENDAR_SCOPE),
        ("access_type", "offline"),
        ("prompt", "consent"),
        ("state", signed_state),
    ])
    .map_err(|e| BookifyError::Internal(format!("url encoding: {e}")))?;
    Ok(format!("{GOOGLE_AUTH_URL}?{query}"))
}

// --- The vault ---

/// Stores, retrieves and refreshes OAuth tokens per provider.
pub struct CredentialVault {
    store: Arc<dyn TreeStore>,
    exchanger: Arc<dyn TokenExchanger>,
}

impl CredentialVault {
    pub fn new(store: Arc<dyn TreeStore>, exchanger: Arc<dyn TokenExchanger>) -> Self {
        Self { store, exchanger }
    }

    /// The stored integration record, if any.
    pub async fn integration(
        &self,
        provider_id: &str,
    ) -> Result<Option<CalendarIntegration>, BookifyError> {
        let Some(value) = self
            .store
            .get(&paths::calendar_integration(provider_id))
            .await?
        else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(integration) => Ok(Some(integration)),
            Err(err) => {
                warn!(provider_id, %err, "malformed calendar integration record");
                Ok(None)
            }
        }
    }

    /// The stored token set, if the provider is connected.
    pub async fn tokens(&self, provider_id: &str) -> Result<Option<TokenSet>, BookifyError> {
        Ok(self.integration(provider_id).await?.map(|i| i.tokens))
    }

    /// A live access token, refreshing when the stored one expires within
    /// the 60-second margin.
    ///
    /// `None` means "not connected" and is a skip state for callers, not a
    /// failure. A failed refresh also yields `None` for this call only: the
    /// integration stays marked `integrated` because a refresh failure can
    /// be transient (network) as well as terminal (revoked consent), and the
    /// two are locally indistinguishable.
    pub async fn authenticated_access(
        &self,
        provider_id: &str,
    ) -> Result<Option<String>, BookifyError> {
        let Some(tokens) = self.tokens(provider_id).await? else {
            return Ok(None);
        };

        if !tokens.expires_within(REFRESH_MARGIN_MS) {
            return Ok(Some(tokens.access_token));
        }

        let Some(refresh_token) = tokens.refresh_token.clone() else {
            warn!(provider_id, "access token expired and no refresh token is stored");
            return Ok(None);
        };

        match self.exchanger.refresh(&refresh_token).await {
            Ok(response) => {
                let merged = merge_tokens(&tokens, &response);
                self.persist_tokens(provider_id, &merged).await?;
                info!(provider_id, "access token refreshed");
                Ok(Some(merged.access_token))
            }
            Err(err) => {
                // Permanent for this call; no retry here. Operators see the
                // warning, the provider stays integrated until they act.
                warn!(provider_id, %err, "token refresh failed, skipping sync for this call");
                Ok(None)
            }
        }
    }

    /// One-time code exchange: persists `{integrated: true, tokens}`.
    pub async fn complete_connection(
        &self,
        provider_id: &str,
        code: &str,
    ) -> Result<(), BookifyError> {
        let response = self.exchanger.exchange_code(code).await?;
        if response.refresh_token.is_none() {
            // Short-lived session only; still usable, so not fatal.
            warn!(provider_id, "code exchange returned no refresh token");
        }
        let tokens = TokenSet {
            access_token: response.access_token.clone(),
            refresh_token: response.refresh_token.clone(),
            scope: response.scope.clone(),
            token_type: response.token_type.clone(),
            expiry_epoch_millis: response.expiry_epoch_millis(),
        };
        let integration = CalendarIntegration {
            integrated: true,
            tokens,
        };
        self.store
            .set(
                &paths::calendar_integration(provider_id),
                &serde_json::to_value(&integration)?,
            )
            .await?;
        info!(provider_id, "calendar connected");
        Ok(())
    }

    /// Removes the whole integration record.
    pub async fn disconnect(&self, provider_id: &str) -> Result<(), BookifyError> {
        self.store
            .remove(&paths::calendar_integration(provider_id))
            .await?;
        info!(provider_id, "calendar disconnected");
        Ok(())
    }

    async fn persist_tokens(
        &self,
        provider_id: &str,
        tokens: &TokenSet,
    ) -> Result<(), BookifyError> {
        let integration = CalendarIntegration {
            integrated: true,
            tokens: tokens.clone(),
        };
        self.store
            .set(
                &paths::calendar_integration(provider_id),
                &serde_json::to_value(&integration)?,
            )
            .await?;
        Ok(())
    }
}

/// Merges a refresh response over the stored tokens, preserving the old
/// `refresh_token` when the response omits one.
pub(crate) fn merge_tokens(current: &TokenSet, response: &TokenResponse) -> TokenSet {
    TokenSet {
        access_token: response.access_token.clone(),
        refresh_token: response
            .refresh_token
            .clone()
            .or_else(|| current.refresh_token.clone()),
        scope: response.scope.clone().or_else(|| current.scope.clone()),
        token_type: response
            .token_type
            .clone()
            .or_else(|| current.token_type.clone()),
        expiry_epoch_millis: response.expiry_epoch_millis(),
    }
}
