// --- File: crates/bookify_booking/src/availability.rs ---
//! Availability resolver and conflict detector.
//!
//! The resolver walks the day's booked intervals into a set of occupied slot
//! starts; the detector steps a proposed interval through that set. Both work
//! at the occupancy step size, so the smallest detectable conflict unit
//! equals one step (30 minutes in the public configuration). Bookings shorter
//! than one step are not separately representable; this is a documented
//! precision limit of the stepping approach, not a bug.

use chrono::{Datelike, NaiveDate};
use serde_json::json;
use std::collections::HashSet;
use tracing::warn;

use bookify_common::BookifyError;
use bookify_store::{paths, TreeStore};

use crate::models::{Booking, BookingStatus, OutOfOfficeRange, WeekSchedule};
use crate::slots::{format_hhmm, parse_hhmm};

/// Resolves the set of occupied HH:mm slot starts for a provider and date.
///
/// Only `Booked` entries count; `exclude_booking_id` removes the booking
/// being edited from its own conflict check. A failed date query surfaces as
/// a retryable error and must never read as "no conflicts".
pub async fn occupied_slots(
    store: &dyn TreeStore,
    provider_id: &str,
    date: NaiveDate,
    exclude_booking_id: Option<&str>,
    step_minutes: u32,
) -> Result<HashSet<String>, BookifyError> {
    let date_key = date.format("%Y-%m-%d").to_string();
    let rows = store
        .query_by_field(&paths::bookings(provider_id), "date", &json!(date_key))
        .await
        .map_err(|err| {
            BookifyError::TransientIo(format!("schedule unavailable for {date_key}: {err}"))
        })?;

    let mut occupied = HashSet::new();
    for (id, value) in rows {
        let booking: Booking = match serde_json::from_value(value) {
            Ok(b) => b,
            Err(err) => {
                warn!(provider_id, booking_id = %id, %err, "skipping malformed booking record");
                continue;
            }
        };
        if booking.status != BookingStatus::Booked {
            continue;
        }
        if exclude_booking_id == Some(id.as_str()) {
            continue;
        }
        mark_interval(&mut occupied, &booking.start_time, &booking.end_time, step_minutes);
    }
    Ok(occupied)
}

/// Adds every stepped slot start of `[start, end)` to the occupied set.
fn mark_interval(occupied: &mut HashSet<String>, start: &str, end: &str, step_minutes: u32) {
    let (Some(start), Some(end)) = (parse_hhmm(start), parse_hhmm(end)) else {
        return;
    };
    if step_minutes == 0 {
        return;
    }
    let mut current = start;
    while current < end {
        occupied.insert(format_hhmm(current));
        current += step_minutes;
    }
}

/// Steps `[proposed_start, proposed_end)` through the occupied set,
/// short-circuiting on the first hit.
///
/// Callers enforce `proposed_end > proposed_start` (a validation error)
/// before conflict checking.
pub fn has_conflict(
    proposed_start: &str,
    proposed_end: &str,
    occupied: &HashSet<String>,
    step_minutes: u32,
) -> bool {
    let (Some(start), Some(end)) = (parse_hhmm(proposed_start), parse_hhmm(proposed_end)) else {
        return false;
    };
    if step_minutes == 0 {
        return false;
    }
    let mut current = start;
    while current < end {
        if occupied.contains(&format_hhmm(current)) {
            return true;
        }
        current += step_minutes;
    }
    false
}

/// Coarse date-level gate for the public booking form: the weekday must not
/// be marked unavailable and the date must not fall in any out-of-office
/// range. Evaluated independently of the occupied-slot set; both inputs are
/// passed in explicitly so the check is deterministic under test.
pub fn is_date_bookable(
    schedule: &WeekSchedule,
    out_of_office: &[OutOfOfficeRange],
    date: NaiveDate,
) -> bool {
    if schedule.day(date.weekday()).is_unavailable {
        return false;
    }
    !out_of_office.iter().any(|range| range.contains(date))
}
