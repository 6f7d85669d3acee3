// --- File: crates/bookify_booking/src/models.rs ---
//! Data model of the booking ledger.
//!
//! Wire shapes are camelCase JSON, matching the provider-namespaced store
//! layout (`bookings/{providerId}/{bookingId}`, `workingHours/{providerId}`,
//! ...). Record identity lives in the store key, so the structs carry their
//! id in a `#[serde(skip)]` field filled in after load.

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Deserializer, Serialize};

use bookify_common::{validation_error, BookifyError};

/// Lifecycle status of a booking.
///
/// `Booked → Cancelled` is one-way; there is no un-cancel. Unknown strings
/// and missing fields deserialize to `Unknown`, which neither participates
/// in conflict checks nor syncs to the external calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BookingStatus {
    Booked,
    Cancelled,
    #[default]
    #[serde(other)]
    Unknown,
}

/// A note attached to a booking. Append-only list, edited by replacing the
/// whole collection; ids stay stable so edits and deletes can target them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub text: String,
    /// Epoch milliseconds; display order is timestamp descending.
    pub timestamp: i64,
}

/// Normalizes every historical shape of the notes collection to `Vec<Note>`.
///
/// Legacy records hold the notes as a JSON array, as a map keyed by note id,
/// or as a single bare string. Business logic only ever sees the canonical
/// sequence; this shim is the one place shape-sniffing happens.
pub fn deserialize_notes<'de, D>(deserializer: D) -> Result<Vec<Note>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(normalize_notes(value))
}

fn normalize_notes(value: serde_json::Value) -> Vec<Note> {
    use serde_json::Value;
    let mut notes = match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value::<Note>(item).ok())
            .collect(),
        Value::Object(map) => map
            .into_iter()
            .filter_map(|(key, mut item)| {
                // Keyed maps may omit the id inside the value.
                if item.get("id").is_none() {
                    item.as_object_mut()?
                        .insert("id".to_string(), Value::String(key));
                }
                serde_json::from_value::<Note>(item).ok()
            })
            .collect(),
        Value::String(text) => vec![Note {
            id: "legacy".to_string(),
            text,
            timestamp: 0,
        }],
        _ => Vec::new(),
    };
    notes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    notes
}

/// A booking record. Identity is `(providerId, bookingId)`; the interval is
/// half-open `[start_time, end_time)` on `date`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(skip)]
    pub id: String,
    pub client_id: String,
    pub service: String,
    /// yyyy-MM-dd; also the indexed query field.
    pub date: NaiveDate,
    /// HH:mm, inclusive start.
    pub start_time: String,
    /// HH:mm, exclusive end; `end_time > start_time` whenever `Booked`.
    pub end_time: String,
    #[serde(default)]
    pub status: BookingStatus,
    #[serde(default, deserialize_with = "deserialize_notes")]
    pub notes: Vec<Note>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_event_id: Option<String>,
}

/// A client record backing upsert-by-name from the public booking form.
/// The optional email is the snapshot the sync coordinator attaches as the
/// event attendee.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    #[serde(skip)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Working hours for one weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub is_unavailable: bool,
}

impl DaySchedule {
    /// Lexicographic compare is valid: both sides are zero-padded 24h HH:mm.
    pub fn validate(&self) -> Result<(), BookifyError> {
        if !self.is_unavailable && self.end_time <= self.start_time {
            return Err(validation_error(format!(
                "working hours end ({}) must be after start ({})",
                self.end_time, self.start_time
            )));
        }
        Ok(())
    }
}

fn workday() -> DaySchedule {
    DaySchedule {
        start_time: "09:00".to_string(),
        end_time: "17:00".to_string(),
        is_unavailable: false,
    }
}

fn closed_day() -> DaySchedule {
    DaySchedule {
        is_unavailable: true,
        ..workday()
    }
}

/// The fixed 7-entry working-hours set, Monday through Sunday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekSchedule {
    pub monday: DaySchedule,
    pub tuesday: DaySchedule,
    pub wednesday: DaySchedule,
    pub thursday: DaySchedule,
    pub friday: DaySchedule,
    pub saturday: DaySchedule,
    pub sunday: DaySchedule,
}

impl Default for WeekSchedule {
    fn default() -> Self {
        Self {
            monday: workday(),
            tuesday: workday(),
            wednesday: workday(),
            thursday: workday(),
            friday: workday(),
            saturday: closed_day(),
            sunday: closed_day(),
        }
    }
}

impl WeekSchedule {
    pub fn day(&self, weekday: Weekday) -> &DaySchedule {
        match weekday {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }

    pub fn validate(&self) -> Result<(), BookifyError> {
        for day in [
            &self.monday,
            &self.tuesday,
            &self.wednesday,
            &self.thursday,
            &self.friday,
            &self.saturday,
            &self.sunday,
        ] {
            day.validate()?;
        }
        Ok(())
    }
}

/// An inclusive out-of-office date range. Overlapping ranges are allowed;
/// union semantics apply at query time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutOfOfficeRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl OutOfOfficeRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }

    pub fn validate(&self) -> Result<(), BookifyError> {
        if self.from > self.to {
            return Err(validation_error(format!(
                "out-of-office range {} .. {} is inverted",
                self.from, self.to
            )));
        }
        Ok(())
    }
}

/// Grid granularity for provider-facing forms. The public-facing form is
/// always on a fixed 30-minute grid regardless of this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum TimeInterval {
    Minutes15,
    Minutes30,
    Minutes60,
}

impl TimeInterval {
    pub fn minutes(self) -> u32 {
        match self {
            TimeInterval::Minutes15 => 15,
            TimeInterval::Minutes30 => 30,
            TimeInterval::Minutes60 => 60,
        }
    }
}

impl TryFrom<u32> for TimeInterval {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            15 => Ok(TimeInterval::Minutes15),
            30 => Ok(TimeInterval::Minutes30),
            60 => Ok(TimeInterval::Minutes60),
            other => Err(format!("time interval must be 15, 30 or 60, got {other}")),
        }
    }
}

impl From<TimeInterval> for u32 {
    fn from(value: TimeInterval) -> Self {
        value.minutes()
    }
}

/// Per-provider booking settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingSettings {
    pub time_interval: TimeInterval,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            time_interval: TimeInterval::Minutes30,
        }
    }
}
