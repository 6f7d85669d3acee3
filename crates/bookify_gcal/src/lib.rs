// --- File: crates/bookify_gcal/src/lib.rs ---
//! Google Calendar mirror of the booking ledger.
//!
//! One module per concern: `oauth` keeps per-provider tokens alive, `client`
//! talks to the Calendar REST surface, `sync` reconciles a single booking,
//! `outbox` makes the whole thing fire-and-forget for the booking routes.

pub mod client;
pub mod handlers;
pub mod oauth;
pub mod outbox;
pub mod routes;
pub mod sync;

pub use client::GoogleCalendarClient;
pub use oauth::{CredentialVault, GoogleTokenEndpoint};
pub use outbox::SyncOutbox;
pub use sync::{SyncAction, SyncCoordinator, SyncOutcome};

#[cfg(test)]
mod oauth_test;
