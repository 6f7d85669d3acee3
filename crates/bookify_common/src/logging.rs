// --- File: crates/bookify_common/src/logging.rs ---
//! Logging utilities for the Bookify application.
//!
//! Initializes the tracing subscriber once for the whole process. Individual
//! crates only depend on `tracing` macros and stay subscriber-agnostic.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber with the default INFO level.
pub fn init() {
    init_with_level(Level::INFO);
}

/// Initialize the tracing subscriber with a specific minimum level.
///
/// `RUST_LOG` still wins when set; the level argument only supplies the
/// default directive for the workspace crates.
pub fn init_with_level(level: Level) {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("bookify={level}").parse().expect("valid directive"));

    // try_init so tests that initialize logging twice do not panic.
    let result = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter)
        .try_init();

    if result.is_err() {
        tracing::debug!("tracing subscriber was already initialized");
    }
}
