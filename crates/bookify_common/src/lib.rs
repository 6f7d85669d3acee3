// --- File: crates/bookify_common/src/lib.rs ---

// Declare modules within this crate
pub mod error; // Error handling
pub mod http; // HTTP utilities
pub mod logging; // Logging utilities
pub mod services; // Service abstractions

// Re-export error types and utilities for easier access
pub use error::{
    conflict, credential_error, not_found, transient_io, validation_error, BookifyError,
    HttpStatusCode,
};

// Re-export HTTP utilities for easier access
pub use http::{create_client, HTTP_CLIENT};

// Re-export service abstractions for easier access
pub use services::{
    BoxFuture, CalendarApi, CalendarApiError, EventAttendee, EventPayload, EventResult, EventTime,
    SyncActionKind, SyncNotifier,
};
