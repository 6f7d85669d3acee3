// --- File: crates/bookify_store/src/lib.rs ---
//! Key-value tree store boundary: the trait the booking ledger and the
//! credential vault are written against, plus the Firebase Realtime Database
//! backend and an in-memory backend for tests.

pub mod error;
pub mod firebase;
pub mod memory;
pub mod repository;

pub use error::StoreError;
pub use firebase::FirebaseRtdb;
pub use memory::MemoryStore;
pub use repository::TreeStore;

/// Store path helpers. Paths are namespaced per provider; this is the only
/// isolation boundary between providers.
pub mod paths {
    pub fn bookings(provider_id: &str) -> String {
        format!("bookings/{provider_id}")
    }
    pub fn booking(provider_id: &str, booking_id: &str) -> String {
        format!("bookings/{provider_id}/{booking_id}")
    }
    pub fn clients(provider_id: &str) -> String {
        format!("clients/{provider_id}")
    }
    pub fn client(provider_id: &str, client_id: &str) -> String {
        format!("clients/{provider_id}/{client_id}")
    }
    pub fn calendar_integration(provider_id: &str) -> String {
        format!("calendarIntegration/{provider_id}")
    }
    pub fn working_hours(provider_id: &str) -> String {
        format!("workingHours/{provider_id}")
    }
    pub fn out_of_office(provider_id: &str) -> String {
        format!("outOfOffice/{provider_id}")
    }
    pub fn booking_settings(provider_id: &str) -> String {
        format!("bookingSettings/{provider_id}")
    }
    pub fn sync_queue(provider_id: &str) -> String {
        format!("syncQueue/{provider_id}")
    }
    pub fn sync_action(provider_id: &str, action_id: &str) -> String {
        format!("syncQueue/{provider_id}/{action_id}")
    }
}
