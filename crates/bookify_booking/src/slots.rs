// --- File: crates/bookify_booking/src/slots.rs ---
//! Time grid: discrete HH:mm slots at a configurable granularity.
//!
//! Pure functions, recomputed per call. Slots are plain zero-padded strings
//! because that is what the ledger stores and what the occupancy set keys on.

/// Default first slot of the bookable day.
pub const DAY_START: &str = "06:00";
/// Default last slot of the bookable day.
pub const DAY_END: &str = "21:00";
/// Sentinel appended by the full-day grid used for working-hours editing.
pub const END_OF_DAY: &str = "23:59";

/// Parses "HH:mm" into minutes since midnight.
pub fn parse_hhmm(value: &str) -> Option<u32> {
    let (h, m) = value.split_once(':')?;
    if h.len() != 2 || m.len() != 2 {
        return None;
    }
    let hours: u32 = h.parse().ok()?;
    let minutes: u32 = m.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Formats minutes since midnight as zero-padded "HH:mm".
pub fn format_hhmm(minutes_since_midnight: u32) -> String {
    format!(
        "{:02}:{:02}",
        minutes_since_midnight / 60,
        minutes_since_midnight % 60
    )
}

/// Generates the ordered slot grid from `day_start` to `day_end`, inclusive
/// of `day_end` when it lands exactly on a grid boundary.
///
/// Returns an empty grid for malformed bounds or a zero granularity; callers
/// validate their inputs before rendering, so an empty grid only ever means
/// "nothing offerable".
pub fn generate_slots(granularity_minutes: u32, day_start: &str, day_end: &str) -> Vec<String> {
    let (Some(start), Some(end)) = (parse_hhmm(day_start), parse_hhmm(day_end)) else {
        return Vec::new();
    };
    if granularity_minutes == 0 || end < start {
        return Vec::new();
    }
    let mut slots = Vec::with_capacity(((end - start) / granularity_minutes + 1) as usize);
    let mut current = start;
    while current <= end {
        slots.push(format_hhmm(current));
        current += granularity_minutes;
    }
    slots
}

/// The bookable-day grid with the default 06:00–21:00 bounds.
pub fn generate_day_slots(granularity_minutes: u32) -> Vec<String> {
    generate_slots(granularity_minutes, DAY_START, DAY_END)
}

/// Full-day grid (00:00–23:59) for working-hours editing. Always appends the
/// terminal "23:59" sentinel even when it is not grid-aligned.
pub fn generate_full_day_slots(granularity_minutes: u32) -> Vec<String> {
    let mut slots = generate_slots(granularity_minutes, "00:00", END_OF_DAY);
    if slots.last().map(String::as_str) != Some(END_OF_DAY) {
        slots.push(END_OF_DAY.to_string());
    }
    slots
}
