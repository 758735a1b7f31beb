mod common;

use std::sync::Arc;

use common::{FlakyStore, booking, monday, new_client, options, seeded_store, t};
use medspa_scheduler::models::{AppointmentStatus, AvailabilityQuery, CallerBookingRequest, TimeRange};
use medspa_scheduler::storage::{JsonFileStore, SnapshotStore};
use medspa_scheduler::{ErrorKind, SchedulingError, SpaStore};

#[tokio::test]
async fn botox_then_fillers_conflict_then_cancel_and_rebook() {
    let (store, backend) = seeded_store().await;

    let botox = store
        .book(booking("CL0001", "SVC001", "STF001", t(14, 0)))
        .await
        .unwrap();
    assert_eq!(botox.status, AppointmentStatus::Scheduled);

    let err = store
        .book(booking("CL0001", "SVC002", "STF001", t(14, 15)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SlotConflict);
    assert!(err.alternatives().contains(&TimeRange {
        start: t(14, 30),
        end: t(17, 0),
    }));

    store.cancel(&botox.id, Some("rescheduling")).await.unwrap();
    let rebooked = store
        .book(booking("CL0001", "SVC001", "STF001", t(14, 0)))
        .await
        .unwrap();
    assert_ne!(rebooked.id, botox.id);

    let durable = backend.saved().await.unwrap();
    assert_eq!(durable.appointments.len(), 2);
    assert_eq!(durable.appointments[0].status, AppointmentStatus::Cancelled);
    assert_eq!(
        durable.appointments[0].cancellation_reason.as_deref(),
        Some("rescheduling")
    );
}

#[tokio::test]
async fn booking_into_every_computed_gap_succeeds() {
    let (store, _) = seeded_store().await;
    store
        .book(booking("CL0001", "SVC002", "STF001", t(11, 0)))
        .await
        .unwrap();

    let query = AvailabilityQuery {
        date: monday(),
        staff_id: Some("STF001".into()),
        service_id: Some("SVC001".into()),
    };
    let gaps = store.availability(&query).await.unwrap().remove(0).free;
    assert_eq!(gaps.len(), 2);

    for gap in gaps {
        store
            .book(booking("CL0001", "SVC001", "STF001", gap.start))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn specialty_mismatch_wins_over_a_free_slot() {
    let (store, _) = seeded_store().await;
    let err = store
        .book(booking("CL0001", "SVC003", "STF001", t(9, 0)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SpecialtyMismatch);
    assert_eq!(err.code(), "SPECIALTY_MISMATCH");
}

#[tokio::test]
async fn completion_uses_booking_time_price() {
    let (store, _) = seeded_store().await;
    let appt = store
        .book(booking("CL0001", "SVC007", "STF003", t(9, 0)))
        .await
        .unwrap();

    let done = store
        .update_status(&appt.id, AppointmentStatus::Completed, None)
        .await
        .unwrap();
    assert_eq!(done.status, AppointmentStatus::Completed);

    let client = store.client("CL0001").await.unwrap();
    assert_eq!(client.total_visits, 1);
    assert_eq!(client.total_spent_cents, 80_000);

    let err = store
        .update_status(&appt.id, AppointmentStatus::Cancelled, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    assert_eq!(store.client("CL0001").await.unwrap().total_visits, 1);
}

#[tokio::test]
async fn failed_save_leaves_memory_untouched() {
    let backend = Arc::new(FlakyStore::default());
    let store = SpaStore::open(backend.clone(), options()).await.unwrap();
    store.add_client(new_client("Ana Lopez", "305-555-0100")).await.unwrap();
    let before = store.snapshot().await;

    backend.set_failing(true);
    let err = store
        .book(booking("CL0001", "SVC001", "STF001", t(10, 0)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert!(matches!(err, SchedulingError::Storage(_)));
    assert_eq!(store.snapshot().await, before);

    let err = store.add_client(new_client("Ben", "786-555-0101")).await.unwrap_err();
    assert_eq!(err.code(), "STORAGE_ERROR");
    assert!(store.find_client_by_phone("786-555-0101").await.is_none());

    // once storage recovers the same booking goes through with the same id
    backend.set_failing(false);
    let appt = store
        .book(booking("CL0001", "SVC001", "STF001", t(10, 0)))
        .await
        .unwrap();
    assert_eq!(appt.id, "APT0001");
    assert_eq!(backend.saved().await.unwrap(), store.snapshot().await);
}

#[tokio::test]
async fn hung_save_times_out_and_rolls_back() {
    let backend = Arc::new(FlakyStore::default());
    let store = SpaStore::open(backend.clone(), options()).await.unwrap();
    store.add_client(new_client("Ana Lopez", "305-555-0100")).await.unwrap();

    backend.set_hanging(true);
    let err = store
        .book(booking("CL0001", "SVC001", "STF001", t(10, 0)))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "STORAGE_TIMEOUT");
    assert!(store.list_by_date(monday()).await.is_empty());
}

#[tokio::test]
async fn rejected_operations_do_not_touch_storage() {
    let backend = Arc::new(FlakyStore::default());
    let store = SpaStore::open(backend.clone(), options()).await.unwrap();
    let saves = backend.saves.load(std::sync::atomic::Ordering::SeqCst);

    let err = store
        .book(booking("CL0404", "SVC001", "STF001", t(10, 0)))
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::ClientNotFound(_)));
    // already seeded: nothing to write
    assert!(!store.seed_default_catalog().await.unwrap());
    assert_eq!(backend.saves.load(std::sync::atomic::Ordering::SeqCst), saves);
}

#[tokio::test]
async fn status_changes_on_unknown_appointments_are_not_found() {
    let backend = Arc::new(FlakyStore::default());
    let store = SpaStore::open(backend.clone(), options()).await.unwrap();
    store.add_client(new_client("Ana Lopez", "305-555-0100")).await.unwrap();
    store
        .book(booking("CL0001", "SVC001", "STF001", t(9, 0)))
        .await
        .unwrap();
    let saves = backend.saves.load(std::sync::atomic::Ordering::SeqCst);
    let before = store.snapshot().await;

    let err = store
        .update_status("APT0404", AppointmentStatus::Completed, Some("done"))
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::AppointmentNotFound(ref id) if id == "APT0404"));
    assert_eq!(err.code(), "APPOINTMENT_NOT_FOUND");

    let err = store.cancel("APT0404", Some("changed plans")).await.unwrap_err();
    assert!(matches!(err, SchedulingError::AppointmentNotFound(_)));
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert_eq!(backend.saves.load(std::sync::atomic::Ordering::SeqCst), saves);
    assert_eq!(store.snapshot().await, before);
    assert_eq!(store.client("CL0001").await.unwrap().total_visits, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bookings_of_one_slot_yield_one_winner() {
    let (store, _) = seeded_store().await;
    let store = Arc::new(store);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .book(booking("CL0001", "SVC002", "STF001", t(15, 0)))
                .await
        }));
    }

    let mut wins = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => wins += 1,
            Err(e) => assert_eq!(e.kind(), ErrorKind::SlotConflict),
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(store.list_by_date(monday()).await.len(), 1);
}

#[tokio::test]
async fn caller_booking_registers_once_and_is_recognized_later() {
    let (store, _) = seeded_store().await;
    let call = |time| CallerBookingRequest {
        service_query: "hydrafacial".into(),
        date: monday() + chrono::Duration::days(1), // Tuesday, Sarah works
        time,
        client_name: "Carla Diaz".into(),
        client_phone: "+1 786 555 0142".into(),
        client_email: "carla@example.com".into(),
        staff_id: None,
        notes: None,
    };

    let first = store.book_for_caller(call(t(10, 0))).await.unwrap();
    assert!(first.new_client);
    assert_eq!(first.appointment.staff_id, "STF002");

    let second = store.book_for_caller(call(t(11, 0))).await.unwrap();
    assert!(!second.new_client);
    assert_eq!(second.client.id, first.client.id);

    // a conflicting call from a new number must not leave a client behind
    let mut clash = call(t(10, 30));
    clash.client_phone = "786-555-0199".into();
    let err = store.book_for_caller(clash).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SlotConflict);
    assert!(store.find_client_by_phone("786-555-0199").await.is_none());

    let history = store.client_history(&first.client.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].time, t(11, 0));
}

#[tokio::test]
async fn duplicate_phone_is_a_typed_error() {
    let (store, _) = seeded_store().await;
    let err = store
        .add_client(new_client("Someone Else", "(305) 555-0100"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicatePhone);
    assert_eq!(store.search_clients("").await.len(), 1);
}

#[tokio::test]
async fn json_store_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let backend: Arc<dyn SnapshotStore> = Arc::new(JsonFileStore::new(dir.path()));
        let store = SpaStore::open(backend, options()).await.unwrap();
        store.add_client(new_client("Ana Lopez", "305-555-0100")).await.unwrap();
        store
            .book(booking("CL0001", "SVC004", "STF001", t(9, 30)))
            .await
            .unwrap();
    }

    let backend: Arc<dyn SnapshotStore> = Arc::new(JsonFileStore::new(dir.path()));
    let store = SpaStore::open(backend, options()).await.unwrap();
    assert_eq!(store.services(None).await.len(), 7);
    assert_eq!(store.find_client_by_phone("3055550100").await.unwrap().id, "CL0001");

    let appt = store.appointment("APT0001").await.unwrap();
    assert_eq!((appt.time, appt.duration_minutes), (t(9, 30), 30));

    let err = store
        .book(booking("CL0001", "SVC004", "STF001", t(9, 45)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SlotConflict);
}
