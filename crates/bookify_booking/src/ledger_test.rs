#[cfg(test)]
mod tests {
    use crate::ledger::{BookingPatch, Ledger, NewBooking};
    use crate::models::BookingStatus;
    use bookify_common::BookifyError;
    use bookify_store::{MemoryStore, TreeStore};
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn ledger() -> (Arc<MemoryStore>, Ledger) {
        let store = Arc::new(MemoryStore::new());
        let ledger = Ledger::new(store.clone(), 30);
        (store, ledger)
    }

    fn consultation(day: &str, start: &str, end: &str) -> NewBooking {
        NewBooking {
            client_id: "c1".to_string(),
            service: "Consultation".to_string(),
            date: date(day),
            start_time: start.to_string(),
            end_time: end.to_string(),
        }
    }

    #[tokio::test]
    async fn create_then_overlap_is_rejected_without_write() {
        let (store, ledger) = ledger();
        let id = ledger
            .create_booking("p1", consultation("2026-03-02", "10:00", "10:30"))
            .await
            .unwrap();
        assert!(!id.is_empty());

        let err = ledger
            .create_booking("p1", consultation("2026-03-02", "10:00", "10:30"))
            .await
            .unwrap_err();
        assert!(matches!(err, BookifyError::Conflict(_)));

        // Fail closed: only the first booking landed.
        let rows = store
            .query_by_field("bookings/p1", "date", &serde_json::json!("2026-03-02"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn adjacent_interval_is_accepted() {
        let (_store, ledger) = ledger();
        ledger
            .create_booking("p1", consultation("2026-03-02", "10:00", "10:30"))
            .await
            .unwrap();
        ledger
            .create_booking("p1", consultation("2026-03-02", "10:30", "11:00"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn inverted_interval_is_a_validation_error_not_a_conflict() {
        let (_store, ledger) = ledger();
        let err = ledger
            .create_booking("p1", consultation("2026-03-02", "11:00", "10:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, BookifyError::Validation(_)));

        let err = ledger
            .propose_booking("p1", date("2026-03-02"), "10:00", "10:00", None)
            .await
            .unwrap_err();
        assert!(matches!(err, BookifyError::Validation(_)));
    }

    #[tokio::test]
    async fn update_excludes_itself_and_rechecks_the_new_date() {
        let (_store, ledger) = ledger();
        let id = ledger
            .create_booking("p1", consultation("2026-03-02", "10:00", "10:30"))
            .await
            .unwrap();
        ledger
            .create_booking("p1", consultation("2026-03-03", "10:00", "10:30"))
            .await
            .unwrap();

        // Moving within its own slot is fine (self-exclusion).
        ledger
            .update_booking(
                "p1",
                &id,
                BookingPatch {
                    start_time: Some("10:00".to_string()),
                    end_time: Some("11:00".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // Moving onto the other date's occupied slot conflicts.
        let err = ledger
            .update_booking(
                "p1",
                &id,
                BookingPatch {
                    date: Some(date("2026-03-03")),
                    start_time: Some("10:00".to_string()),
                    end_time: Some("10:30".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BookifyError::Conflict(_)));
    }

    #[tokio::test]
    async fn cancel_preserves_the_record_and_frees_the_slot() {
        let (_store, ledger) = ledger();
        let id = ledger
            .create_booking("p1", consultation("2026-03-02", "10:00", "10:30"))
            .await
            .unwrap();
        ledger.cancel_booking("p1", &id).await.unwrap();

        let booking = ledger.get_booking("p1", &id).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Cancelled);

        // Cancelled bookings never participate in conflict checks.
        ledger
            .create_booking("p1", consultation("2026-03-02", "10:00", "10:30"))
            .await
            .unwrap();

        // Cancelling again is a no-op, not an error.
        ledger.cancel_booking("p1", &id).await.unwrap();
    }

    #[tokio::test]
    async fn cancel_of_missing_booking_is_not_found() {
        let (_store, ledger) = ledger();
        let err = ledger.cancel_booking("p1", "nope").await.unwrap_err();
        assert!(matches!(err, BookifyError::NotFound(_)));
    }

    #[tokio::test]
    async fn notes_append_edit_delete_rewrite_the_whole_array() {
        let (store, ledger) = ledger();
        let id = ledger
            .create_booking("p1", consultation("2026-03-02", "10:00", "10:30"))
            .await
            .unwrap();

        let first = ledger
            .append_or_edit_note("p1", &id, None, "first".to_string())
            .await
            .unwrap();
        let second = ledger
            .append_or_edit_note("p1", &id, None, "second".to_string())
            .await
            .unwrap();

        let booking = ledger.get_booking("p1", &id).await.unwrap();
        assert_eq!(booking.notes.len(), 2);
        assert_eq!(booking.notes[0].id, second.id, "newest first");

        // Edit keeps the id, replaces text and timestamp.
        let edited = ledger
            .append_or_edit_note("p1", &id, Some(&first.id), "first, edited".to_string())
            .await
            .unwrap();
        assert_eq!(edited.id, first.id);
        assert!(edited.timestamp >= first.timestamp);

        // The stored value is a plain array (whole-collection replace).
        let raw = store
            .get(&format!("bookings/p1/{id}/notes"))
            .await
            .unwrap()
            .unwrap();
        assert!(raw.is_array());

        ledger.delete_note("p1", &id, &first.id).await.unwrap();
        let booking = ledger.get_booking("p1", &id).await.unwrap();
        assert_eq!(booking.notes.len(), 1);

        // Deleting an absent note succeeds.
        ledger.delete_note("p1", &id, &first.id).await.unwrap();

        // Editing an absent note does not.
        let err = ledger
            .append_or_edit_note("p1", &id, Some("ghost"), "x".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, BookifyError::NotFound(_)));
    }

    #[tokio::test]
    async fn client_upsert_by_name_reuses_and_backfills_email() {
        let (_store, ledger) = ledger();
        let first = ledger
            .upsert_client_by_name("p1", "Ada Lovelace", None)
            .await
            .unwrap();
        let second = ledger
            .upsert_client_by_name("p1", "Ada Lovelace", Some("ada@example.com"))
            .await
            .unwrap();
        assert_eq!(first, second);

        let client = ledger.get_client("p1", &first).await.unwrap().unwrap();
        assert_eq!(client.email.as_deref(), Some("ada@example.com"));

        // A different name creates a different record.
        let third = ledger
            .upsert_client_by_name("p1", "Grace Hopper", None)
            .await
            .unwrap();
        assert_ne!(first, third);
    }

    #[tokio::test]
    async fn providers_are_isolated_by_namespace() {
        let (_store, ledger) = ledger();
        ledger
            .create_booking("p1", consultation("2026-03-02", "10:00", "10:30"))
            .await
            .unwrap();
        // Same slot for another provider is not a conflict.
        ledger
            .create_booking("p2", consultation("2026-03-02", "10:00", "10:30"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn no_overlap_invariant_holds_after_a_mutation_sequence() {
        let (_store, ledger) = ledger();
        let day = "2026-03-02";
        let b1 = ledger
            .create_booking("p1", consultation(day, "09:00", "10:00"))
            .await
            .unwrap();
        let _b2 = ledger
            .create_booking("p1", consultation(day, "10:00", "11:00"))
            .await
            .unwrap();
        ledger
            .update_booking(
                "p1",
                &b1,
                BookingPatch {
                    start_time: Some("09:30".to_string()),
                    end_time: Some("10:00".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(ledger
            .update_booking(
                "p1",
                &b1,
                BookingPatch {
                    end_time: Some("10:30".to_string()),
                    ..Default::default()
                },
            )
            .await
            .is_err());

        // All booked intervals on the day are pairwise disjoint.
        let occupied = ledger
            .check_availability("p1", date(day), None)
            .await
            .unwrap();
        assert_eq!(occupied.len(), 3, "09:30, 10:00, 10:30 one owner each");
    }
}
