mod common;

use std::sync::Arc;

use carebook_core::{
    errors::CareError,
    models::appointment::AppointmentStatus,
    slots::{compute_slots, Interval, SlotService, SLOT_MINUTES},
};
use chrono::{Duration, NaiveDate};
use common::{appointment_at, clock, day, dr_x, t, MockDirectory, MockStore};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
}

#[test]
fn test_slots_cover_working_hours_in_half_hour_steps() {
    let provider = dr_x();
    let slots: Vec<_> = compute_slots(&provider, day(), &[], today()).collect();

    assert_eq!(slots.len(), 16);
    assert_eq!(slots.first().map(|s| s.start_time), Some(t(9, 0)));
    assert_eq!(slots.last().map(|s| s.ends_at()), Some(day().and_time(t(17, 0))));

    for pair in slots.windows(2) {
        assert_eq!(pair[0].ends_at(), pair[1].starts_at());
    }
    assert!(slots.iter().all(|s| s.available && s.duration_minutes == SLOT_MINUTES));
}

#[test]
fn test_unaligned_end_drops_the_partial_slot() {
    let mut provider = dr_x();
    provider.working_hours.end = t(10, 45);

    let starts: Vec<_> = compute_slots(&provider, day(), &[], today())
        .map(|s| s.start_time)
        .collect();
    assert_eq!(starts, vec![t(9, 0), t(9, 30), t(10, 0)]);
}

#[test]
fn test_booked_slot_is_unavailable() {
    let provider = dr_x();
    let existing = vec![appointment_at(t(10, 0), AppointmentStatus::Scheduled)];

    let unavailable: Vec<_> = compute_slots(&provider, day(), &existing, today())
        .filter(|s| !s.available)
        .map(|s| s.start_time)
        .collect();
    assert_eq!(unavailable, vec![t(10, 0)]);
}

#[test]
fn test_long_appointment_blocks_every_slot_it_touches() {
    let provider = dr_x();
    let mut long = appointment_at(t(10, 15), AppointmentStatus::Confirmed);
    long.duration_minutes = 45;

    let unavailable: Vec<_> = compute_slots(&provider, day(), &[long], today())
        .filter(|s| !s.available)
        .map(|s| s.start_time)
        .collect();
    assert_eq!(unavailable, vec![t(10, 0), t(10, 30)]);
}

#[test]
fn test_cancelled_and_foreign_appointments_are_ignored() {
    let provider = dr_x();
    let cancelled = appointment_at(t(10, 0), AppointmentStatus::Cancelled);
    let mut other_provider = appointment_at(t(11, 0), AppointmentStatus::Scheduled);
    other_provider.provider_id = "doc-y".to_string();
    let mut other_day = appointment_at(t(12, 0), AppointmentStatus::Scheduled);
    other_day.date = day() + Duration::days(1);

    let existing = vec![cancelled, other_provider, other_day];
    assert!(compute_slots(&provider, day(), &existing, today()).all(|s| s.available));
}

#[test]
fn test_past_date_yields_nothing() {
    let provider = dr_x();
    let yesterday = today() - Duration::days(1);

    assert_eq!(compute_slots(&provider, yesterday, &[], today()).count(), 0);
    assert_eq!(compute_slots(&provider, today(), &[], today()).count(), 16);
}

#[test]
fn test_repeated_computation_is_identical() {
    let provider = dr_x();
    let existing = vec![appointment_at(t(9, 30), AppointmentStatus::Pending)];

    let slots = compute_slots(&provider, day(), &existing, today());
    let first: Vec<_> = slots.clone().collect();
    let second: Vec<_> = slots.collect();
    let third: Vec<_> = compute_slots(&provider, day(), &existing, today()).collect();

    assert_eq!(first, second);
    assert_eq!(first, third);
}

#[rstest]
#[case(t(9, 30), 30, t(10, 0), false)]
#[case(t(9, 31), 30, t(10, 0), true)]
#[case(t(10, 30), 30, t(10, 0), false)]
#[case(t(10, 29), 30, t(10, 0), true)]
#[case(t(10, 5), 10, t(10, 0), true)]
fn test_half_open_overlap(
    #[case] other_start: chrono::NaiveTime,
    #[case] other_minutes: u32,
    #[case] slot_start: chrono::NaiveTime,
    #[case] overlaps: bool,
) {
    let slot = Interval::new(day(), slot_start, SLOT_MINUTES);
    let other = Interval::new(day(), other_start, other_minutes);

    assert_eq!(slot.overlaps(&other), overlaps);
    assert_eq!(other.overlaps(&slot), overlaps);
}

#[tokio::test]
async fn test_service_reads_store_on_every_call() {
    let mut directory = MockDirectory::new();
    directory
        .expect_get()
        .withf(|id| id.to_string() == "doc-x")
        .times(2)
        .returning(|_| Ok(Some(dr_x())));

    let mut store = MockStore::new();
    let mut calls = 0;
    store
        .expect_query()
        .withf(|filter| filter.exclude_cancelled && filter.provider_id.as_deref() == Some("doc-x"))
        .times(2)
        .returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(Vec::new())
            } else {
                Ok(vec![appointment_at(t(9, 0), AppointmentStatus::Scheduled)])
            }
        });

    let service = SlotService::new(Arc::new(directory), Arc::new(store), clock());

    let before = service.slots_for("doc-x", day()).await.unwrap();
    let after = service.slots_for("doc-x", day()).await.unwrap();

    assert!(before[0].available);
    assert!(!after[0].available);
}

#[tokio::test]
async fn test_service_skips_store_for_past_dates() {
    let mut directory = MockDirectory::new();
    directory.expect_get().returning(|_| Ok(Some(dr_x())));
    let mut store = MockStore::new();
    store.expect_query().times(0);

    let service = SlotService::new(Arc::new(directory), Arc::new(store), clock());
    let slots = service
        .slots_for("doc-x", NaiveDate::from_ymd_opt(2024, 1, 9).unwrap())
        .await
        .unwrap();

    assert!(slots.is_empty());
}

#[tokio::test]
async fn test_unknown_provider_is_not_found() {
    let mut directory = MockDirectory::new();
    directory.expect_get().returning(|_| Ok(None));

    let service = SlotService::new(Arc::new(directory), Arc::new(MockStore::new()), clock());
    let err = service.slots_for("doc-missing", day()).await.unwrap_err();

    assert!(matches!(err, CareError::NotFound(_)));
}
