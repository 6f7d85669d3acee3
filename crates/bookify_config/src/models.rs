// --- File: crates/bookify_config/src/models.rs ---

use serde::{Deserialize, Serialize};

// --- General Server Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

// --- Tree Store Config ---
// Holds the non-secret store settings. The database auth secret is loaded
// directly from the STORE_AUTH_TOKEN env var.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StoreConfig {
    /// Base URL of the Realtime Database instance,
    /// e.g. "https://my-project-default-rtdb.firebaseio.com"
    pub database_url: String,
    #[serde(default)]
    pub auth_token: Option<String>,
}

// --- Google Calendar / OAuth Config ---
// Holds non-secret OAuth client settings. The client secret is loaded
// directly from the GCAL_CLIENT_SECRET env var when absent here.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GcalConfig {
    pub client_id: String,
    pub redirect_uri: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Calendar the mirrored events are written to. Defaults to "primary".
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
    /// Key used to sign the OAuth `state` payload.
    #[serde(default)]
    pub state_signing_key: Option<String>,
}

fn default_calendar_id() -> String {
    "primary".to_string()
}

// --- Booking Engine Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BookingConfig {
    /// Grid granularity for the public booking form, in minutes.
    #[serde(default = "default_public_step")]
    pub public_step_minutes: u32,
    /// First slot of the bookable day, "HH:mm".
    #[serde(default = "default_day_start")]
    pub day_start: String,
    /// Last slot of the bookable day, "HH:mm".
    #[serde(default = "default_day_end")]
    pub day_end: String,
}

fn default_public_step() -> u32 {
    30
}
fn default_day_start() -> String {
    "06:00".to_string()
}
fn default_day_end() -> String {
    "21:00".to_string()
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            public_step_minutes: default_public_step(),
            day_start: default_day_start(),
            day_end: default_day_end(),
        }
    }
}

// --- Unified App Configuration ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    // Server config is mandatory
    pub server: ServerConfig,

    // --- Runtime Flags (optional in config file, default to false) ---
    #[serde(default)]
    pub use_gcal: bool,

    // --- Feature Configurations ---
    pub store: StoreConfig,
    #[serde(default)]
    pub gcal: Option<GcalConfig>,
    #[serde(default)]
    pub booking: BookingConfig,
}
