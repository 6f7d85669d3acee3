#[cfg(test)]
mod tests {
    use crate::models::{
        Booking, BookingSettings, BookingStatus, DaySchedule, OutOfOfficeRange, TimeInterval,
        WeekSchedule,
    };
    use chrono::NaiveDate;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn booking_roundtrips_through_camel_case_wire_form() {
        let value = json!({
            "clientId": "c1",
            "service": "Consultation",
            "date": "2026-03-02",
            "startTime": "10:00",
            "endTime": "10:30",
            "status": "Booked",
            "externalEventId": "ev-123",
            "notes": []
        });
        let booking: Booking = serde_json::from_value(value).unwrap();
        assert_eq!(booking.status, BookingStatus::Booked);
        assert_eq!(booking.external_event_id.as_deref(), Some("ev-123"));

        let back = serde_json::to_value(&booking).unwrap();
        assert_eq!(back["startTime"], "10:00");
        assert!(back.get("id").is_none(), "identity lives in the store key");
    }

    #[test]
    fn unknown_and_missing_status_default_defensively() {
        let malformed: Booking = serde_json::from_value(json!({
            "clientId": "c1",
            "service": "x",
            "date": "2026-03-02",
            "startTime": "10:00",
            "endTime": "11:00",
            "status": "SomethingLegacy"
        }))
        .unwrap();
        assert_eq!(malformed.status, BookingStatus::Unknown);

        let missing: Booking = serde_json::from_value(json!({
            "clientId": "c1",
            "service": "x",
            "date": "2026-03-02",
            "startTime": "10:00",
            "endTime": "11:00"
        }))
        .unwrap();
        assert_eq!(missing.status, BookingStatus::Unknown);
    }

    #[test]
    fn notes_normalize_from_array_map_and_legacy_string() {
        let base = json!({
            "clientId": "c1",
            "service": "x",
            "date": "2026-03-02",
            "startTime": "10:00",
            "endTime": "11:00",
            "status": "Booked"
        });

        let mut as_array = base.clone();
        as_array["notes"] = json!([
            {"id": "n1", "text": "older", "timestamp": 100},
            {"id": "n2", "text": "newer", "timestamp": 200}
        ]);
        let booking: Booking = serde_json::from_value(as_array).unwrap();
        let ids: Vec<_> = booking.notes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["n2", "n1"], "display order is timestamp descending");

        let mut as_map = base.clone();
        as_map["notes"] = json!({
            "n1": {"text": "from map", "timestamp": 5}
        });
        let booking: Booking = serde_json::from_value(as_map).unwrap();
        assert_eq!(booking.notes.len(), 1);
        assert_eq!(booking.notes[0].id, "n1", "map key supplies the id");

        let mut as_string = base.clone();
        as_string["notes"] = json!("one legacy note");
        let booking: Booking = serde_json::from_value(as_string).unwrap();
        assert_eq!(booking.notes.len(), 1);
        assert_eq!(booking.notes[0].text, "one legacy note");
    }

    #[test]
    fn day_schedule_validates_lexicographically() {
        let good = DaySchedule {
            start_time: "09:00".into(),
            end_time: "17:00".into(),
            is_unavailable: false,
        };
        assert!(good.validate().is_ok());

        let inverted = DaySchedule {
            start_time: "17:00".into(),
            end_time: "09:00".into(),
            is_unavailable: false,
        };
        assert!(inverted.validate().is_err());

        // An unavailable day may carry any times.
        let closed = DaySchedule {
            start_time: "17:00".into(),
            end_time: "09:00".into(),
            is_unavailable: true,
        };
        assert!(closed.validate().is_ok());
    }

    #[test]
    fn week_schedule_has_a_full_seven_day_wire_form() {
        let value = serde_json::to_value(WeekSchedule::default()).unwrap();
        for day in ["monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday"] {
            assert!(value.get(day).is_some(), "missing {day}");
        }
    }

    #[test]
    fn out_of_office_ranges_are_inclusive() {
        let range = OutOfOfficeRange {
            from: date("2026-03-02"),
            to: date("2026-03-04"),
        };
        assert!(range.contains(date("2026-03-02")));
        assert!(range.contains(date("2026-03-04")));
        assert!(!range.contains(date("2026-03-05")));
        assert!(range.validate().is_ok());

        let inverted = OutOfOfficeRange {
            from: date("2026-03-04"),
            to: date("2026-03-02"),
        };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn time_interval_only_accepts_the_three_granularities() {
        let settings: BookingSettings =
            serde_json::from_value(json!({"timeInterval": 15})).unwrap();
        assert_eq!(settings.time_interval, TimeInterval::Minutes15);

        assert!(serde_json::from_value::<BookingSettings>(json!({"timeInterval": 20})).is_err());
        assert_eq!(
            serde_json::to_value(BookingSettings::default()).unwrap()["timeInterval"],
            30
        );
    }
}
