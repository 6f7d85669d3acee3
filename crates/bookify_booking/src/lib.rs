// --- File: crates/bookify_booking/src/lib.rs ---
// Declare modules within this crate
pub mod availability;
pub mod handlers;
pub mod ledger;
#[cfg(test)]
mod ledger_test;
pub mod models;
#[cfg(test)]
mod models_test;
pub mod routes;
pub mod slots;
#[cfg(test)]
mod slots_proptest;
