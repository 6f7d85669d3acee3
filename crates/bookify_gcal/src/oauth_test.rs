// --- File: crates/bookify_gcal/src/oauth_test.rs ---

use chrono::Utc;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bookify_common::{credential_error, BookifyError, BoxFuture};
use bookify_config::GcalConfig;
use bookify_store::{paths, MemoryStore, TreeStore};

use crate::oauth::{
    authorize_url, merge_tokens, sign_state, verify_state, AuthState, CredentialVault,
    TokenExchanger, TokenResponse, TokenSet,
};

/// Scripted token endpoint recording every refresh it receives.
struct RecordingExchanger {
    refresh_calls: Mutex<Vec<String>>,
    fail_refresh: AtomicBool,
}

impl RecordingExchanger {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            refresh_calls: Mutex::new(Vec::new()),
            fail_refresh: AtomicBool::new(false),
        })
    }

    fn refresh_count(&self) -> usize {
        self.refresh_calls.lock().unwrap().len()
    }
}

impl TokenExchanger for RecordingExchanger {
    fn exchange_code(&self, code: &str) -> BoxFuture<'_, TokenResponse, BookifyError> {
        let code = code.to_string();
        Box::pin(async move {
            Ok(TokenResponse {
                access_token: format!("access-for-{code}"),
                refresh_token: Some("granted-refresh".to_string()),
                scope: Some("calendar.events".to_string()),
                token_type: Some("Bearer".to_string()),
                expiry_date: None,
                expires_in: Some(3600),
            })
        })
    }

    fn refresh(&self, refresh_token: &str) -> BoxFuture<'_, TokenResponse, BookifyError> {
        let refresh_token = refresh_token.to_string();
        Box::pin(async move {
            self.refresh_calls.lock().unwrap().push(refresh_token);
            if self.fail_refresh.load(Ordering::SeqCst) {
                return Err(credential_error("refresh rejected"));
            }
            Ok(TokenResponse {
                access_token: "refreshed-access".to_string(),
                // Google omits the refresh token on refresh grants.
                refresh_token: None,
                scope: None,
                token_type: None,
                expiry_date: None,
                expires_in: Some(3600),
            })
        })
    }
}

fn vault() -> (Arc<MemoryStore>, Arc<RecordingExchanger>, CredentialVault) {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let exchanger = RecordingExchanger::new();
    let vault = CredentialVault::new(store.clone(), exchanger.clone());
    (store, exchanger, vault)
}

async fn seed_tokens(store: &MemoryStore, provider_id: &str, expiry_epoch_millis: i64) {
    let record = json!({
        "integrated": true,
        "tokens": {
            "accessToken": "stored-access",
            "refreshToken": "stored-refresh",
            "expiryEpochMillis": expiry_epoch_millis,
        }
    });
    store
        .set(&paths::calendar_integration(provider_id), &record)
        .await
        .unwrap();
}

#[tokio::test]
async fn fresh_token_is_returned_without_refresh() {
    let (store, exchanger, vault) = vault();
    seed_tokens(&store, "prov", Utc::now().timestamp_millis() + 600_000).await;

    let token = vault.authenticated_access("prov").await.unwrap();

    assert_eq!(token.as_deref(), Some("stored-access"));
    assert_eq!(exchanger.refresh_count(), 0);
}

#[tokio::test]
async fn token_expiring_within_the_margin_is_refreshed() {
    let (store, exchanger, vault) = vault();
    // Still valid, but inside the 60-second margin.
    seed_tokens(&store, "prov", Utc::now().timestamp_millis() + 30_000).await;

    let token = vault.authenticated_access("prov").await.unwrap();

    assert_eq!(token.as_deref(), Some("refreshed-access"));
    assert_eq!(
        exchanger.refresh_calls.lock().unwrap().as_slice(),
        ["stored-refresh"]
    );
}

#[tokio::test]
async fn expired_token_is_refreshed_and_refresh_token_survives() {
    let (store, _exchanger, vault) = vault();
    seed_tokens(&store, "prov", Utc::now().timestamp_millis() - 1_000).await;

    vault.authenticated_access("prov").await.unwrap();

    // The refresh response omitted the refresh token; the stored one stays.
    let tokens = vault.tokens("prov").await.unwrap().unwrap();
    assert_eq!(tokens.access_token, "refreshed-access");
    assert_eq!(tokens.refresh_token.as_deref(), Some("stored-refresh"));
    assert!(tokens.expiry_epoch_millis > Utc::now().timestamp_millis() + 3_000_000);
}

#[tokio::test]
async fn failed_refresh_yields_none_but_stays_integrated() {
    let (store, exchanger, vault) = vault();
    seed_tokens(&store, "prov", Utc::now().timestamp_millis() - 1_000).await;
    exchanger.fail_refresh.store(true, Ordering::SeqCst);

    let token = vault.authenticated_access("prov").await.unwrap();

    assert!(token.is_none());
    let integration = vault.integration("prov").await.unwrap().unwrap();
    assert!(integration.integrated);
    assert_eq!(integration.tokens.access_token, "stored-access");
}

#[tokio::test]
async fn expired_token_without_refresh_token_yields_none() {
    let (store, exchanger, vault) = vault();
    let record = json!({
        "integrated": true,
        "tokens": {
            "accessToken": "stored-access",
            "expiryEpochMillis": Utc::now().timestamp_millis() - 1_000,
        }
    });
    store
        .set(&paths::calendar_integration("prov"), &record)
        .await
        .unwrap();

    assert!(vault.authenticated_access("prov").await.unwrap().is_none());
    assert_eq!(exchanger.refresh_count(), 0);
}

#[tokio::test]
async fn unconnected_provider_yields_none() {
    let (_store, exchanger, vault) = vault();
    assert!(vault.authenticated_access("prov").await.unwrap().is_none());
    assert_eq!(exchanger.refresh_count(), 0);
}

#[tokio::test]
async fn code_exchange_persists_the_integration() {
    let (_store, _exchanger, vault) = vault();

    vault.complete_connection("prov", "the-code").await.unwrap();

    let integration = vault.integration("prov").await.unwrap().unwrap();
    assert!(integration.integrated);
    assert_eq!(integration.tokens.access_token, "access-for-the-code");
    assert_eq!(
        integration.tokens.refresh_token.as_deref(),
        Some("granted-refresh")
    );
}

#[tokio::test]
async fn disconnect_removes_the_record() {
    let (store, _exchanger, vault) = vault();
    seed_tokens(&store, "prov", Utc::now().timestamp_millis() + 600_000).await;

    vault.disconnect("prov").await.unwrap();

    assert!(vault.integration("prov").await.unwrap().is_none());
}

#[test]
fn merge_preserves_fields_the_response_omits() {
    let current = TokenSet {
        access_token: "old-access".to_string(),
        refresh_token: Some("old-refresh".to_string()),
        scope: Some("calendar.events".to_string()),
        token_type: Some("Bearer".to_string()),
        expiry_epoch_millis: 1,
    };
    let response = TokenResponse {
        access_token: "new-access".to_string(),
        refresh_token: None,
        scope: None,
        token_type: None,
        expiry_date: Some(99_000),
        expires_in: None,
    };

    let merged = merge_tokens(&current, &response);

    assert_eq!(merged.access_token, "new-access");
    assert_eq!(merged.refresh_token.as_deref(), Some("old-refresh"));
    assert_eq!(merged.scope.as_deref(), Some("calendar.events"));
    assert_eq!(merged.token_type.as_deref(), Some("Bearer"));
    assert_eq!(merged.expiry_epoch_millis, 99_000);
}

#[test]
fn merge_takes_a_reissued_refresh_token() {
    let current = TokenSet {
        access_token: "old-access".to_string(),
        refresh_token: Some("old-refresh".to_string()),
        scope: None,
        token_type: None,
        expiry_epoch_millis: 1,
    };
    let response = TokenResponse {
        access_token: "new-access".to_string(),
        refresh_token: Some("new-refresh".to_string()),
        scope: None,
        token_type: None,
        expiry_date: Some(99_000),
        expires_in: None,
    };

    assert_eq!(
        merge_tokens(&current, &response).refresh_token.as_deref(),
        Some("new-refresh")
    );
}

#[test]
fn state_roundtrip_and_tamper_rejection() {
    let state = AuthState {
        provider_id: "prov".to_string(),
        origin: "https://app.example.com/settings".to_string(),
    };

    let signed = sign_state("secret-key", &state).unwrap();
    assert_eq!(verify_state("secret-key", &signed).unwrap(), state);

    // A flipped payload byte breaks the signature.
    let mut tampered = signed.clone().into_bytes();
    tampered[0] = if tampered[0] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(tampered).unwrap();
    assert!(verify_state("secret-key", &tampered).is_err());

    assert!(verify_state("other-key", &signed).is_err());
    assert!(verify_state("secret-key", "no-dot-here").is_err());
}

#[test]
fn authorize_url_carries_offline_access_and_state() {
    let config = GcalConfig {
        client_id: "client-1".to_string(),
        redirect_uri: "https://api.example.com/api/gcal/oauth/callback".to_string(),
        client_secret: None,
        calendar_id: "primary".to_string(),
        state_signing_key: Some("secret-key".to_string()),
    };

    let url = authorize_url(&config, "signed.state").unwrap();

    assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
    assert!(url.contains("access_type=offline"));
    assert!(url.contains("prompt=consent"));
    assert!(url.contains("state=signed.state"));
    assert!(url.contains("client_id=client-1"));
}
