// --- File: crates/bookify_config/src/lib.rs ---
//! Configuration loading for the Bookify workspace.
//!
//! Configuration is layered: `config/default.toml`, an optional
//! `config/local.toml`, then `BOOKIFY__`-prefixed environment variables
//! (double underscore as section separator, e.g. `BOOKIFY__SERVER__PORT`).
//! Secrets are read from plain env vars so they never land in a config file.

pub mod models;

use config::{Config, ConfigError, Environment, File};
use once_cell::sync::Lazy;

pub use models::{AppConfig, BookingConfig, GcalConfig, ServerConfig, StoreConfig};

static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    // Missing .env is fine; env vars may come from the environment itself.
    let _ = dotenv::dotenv();
});

/// Loads `.env` exactly once per process.
pub fn ensure_dotenv_loaded() {
    Lazy::force(&DOTENV_LOADED);
}

/// Loads the layered application configuration.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    ensure_dotenv_loaded();

    let run_env = std::env::var("RUN_ENV").unwrap_or_else(|_| "default".to_string());

    let mut config: AppConfig = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_env}")).required(false))
        .add_source(File::with_name("config/local").required(false))
        .add_source(Environment::with_prefix("BOOKIFY").separator("__"))
        .build()?
        .try_deserialize()?;

    apply_secret_env_overrides(&mut config);
    Ok(config)
}

/// Fills secret fields from their dedicated env vars when the config file
/// left them empty.
fn apply_secret_env_overrides(config: &mut AppConfig) {
    if config.store.auth_token.is_none() {
        config.store.auth_token = std::env::var("STORE_AUTH_TOKEN").ok();
    }
    if let Some(gcal) = config.gcal.as_mut() {
        if gcal.client_secret.is_none() {
            gcal.client_secret = std::env::var("GCAL_CLIENT_SECRET").ok();
        }
        if gcal.state_signing_key.is_none() {
            gcal.state_signing_key = std::env::var("GCAL_STATE_SIGNING_KEY").ok();
        }
    }
}
