//! End-to-end behavior of the adherence listing and the status-set
//! operation, exercised against an in-memory store with a pinned "now".

mod common;

use api_lib::error::ApiError;
use api_lib::web::medicine_reminders::{
    apply_status, resolve_reminders_for_day, SetStatusRequest,
};
use household_core::domain::LogStatus;

use common::{reminder_fixture, utc, InMemoryStore};

#[tokio::test]
async fn listing_a_past_day_backfills_missed_logs() {
    let start = utc(2024, 3, 1, 0, 0);
    let (medication, reminder) = reminder_fixture(&["08:00"], Some("7 days"), start);
    let profile_id = reminder.profile_id;
    let store = InMemoryStore::with_reminder(medication, reminder);

    let now = utc(2024, 3, 4, 10, 0);
    let yesterday = utc(2024, 3, 3, 0, 0);
    let resolved = resolve_reminders_for_day(&store, now, profile_id, yesterday)
        .await
        .unwrap();

    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].slots.len(), 1);
    assert_eq!(resolved[0].slots[0].time, "08:00");
    assert_eq!(resolved[0].slots[0].status, Some(LogStatus::Missed));
    assert_eq!(resolved[0].status, Some(LogStatus::Missed));

    let logs = store.logs_snapshot();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].occurred_at, utc(2024, 3, 3, 8, 0));
    assert_eq!(logs[0].status, LogStatus::Missed);
}

#[tokio::test]
async fn listing_a_future_day_creates_no_logs() {
    let start = utc(2024, 3, 1, 0, 0);
    let (medication, reminder) = reminder_fixture(&["08:00"], Some("7 days"), start);
    let profile_id = reminder.profile_id;
    let store = InMemoryStore::with_reminder(medication, reminder);

    let now = utc(2024, 3, 4, 10, 0);
    let tomorrow = utc(2024, 3, 5, 0, 0);
    let resolved = resolve_reminders_for_day(&store, now, profile_id, tomorrow)
        .await
        .unwrap();

    assert_eq!(resolved[0].slots[0].status, None);
    assert_eq!(resolved[0].status, None);
    assert_eq!(store.log_count(), 0);
}

#[tokio::test]
async fn repeated_listings_do_not_duplicate_backfills() {
    let start = utc(2024, 3, 1, 0, 0);
    let (medication, reminder) = reminder_fixture(&["08:00", "20:00"], Some("7 days"), start);
    let profile_id = reminder.profile_id;
    let store = InMemoryStore::with_reminder(medication, reminder);

    let now = utc(2024, 3, 4, 10, 0);
    let yesterday = utc(2024, 3, 3, 0, 0);
    for _ in 0..3 {
        resolve_reminders_for_day(&store, now, profile_id, yesterday)
            .await
            .unwrap();
    }

    assert_eq!(store.log_count(), 2);
}

#[tokio::test]
async fn out_of_window_reminders_are_dropped_entirely() {
    let start = utc(2024, 3, 1, 0, 0);
    let (medication, reminder) = reminder_fixture(&["08:00"], Some("2 days"), start);
    let profile_id = reminder.profile_id;
    let store = InMemoryStore::with_reminder(medication, reminder);

    let now = utc(2024, 3, 10, 10, 0);
    let resolved = resolve_reminders_for_day(&store, now, profile_id, now)
        .await
        .unwrap();

    assert!(resolved.is_empty());
    assert_eq!(store.log_count(), 0);
}

#[tokio::test]
async fn set_taken_then_list_shows_the_slot_taken() {
    let start = utc(2024, 3, 1, 0, 0);
    let (medication, reminder) = reminder_fixture(&["08:00", "20:00"], Some("7 days"), start);
    let profile_id = reminder.profile_id;
    let store = InMemoryStore::with_reminder(medication, reminder.clone());

    let now = utc(2024, 3, 4, 12, 0);
    let request = SetStatusRequest {
        status: "taken".to_string(),
        date: Some("2024-03-04".to_string()),
        time: Some("08:00".to_string()),
    };
    let (log, time) = apply_status(&store, now, &reminder, &request).await.unwrap();
    assert_eq!(time, "08:00");
    assert_eq!(log.unwrap().status, LogStatus::Taken);

    let resolved = resolve_reminders_for_day(&store, now, profile_id, now)
        .await
        .unwrap();
    let slots = &resolved[0].slots;
    assert_eq!(slots[0].status, Some(LogStatus::Taken));
    // The evening slot is still ahead of "now".
    assert_eq!(slots[1].status, None);
    assert_eq!(resolved[0].status, None);
}

#[tokio::test]
async fn pending_deletes_the_log_for_a_future_slot() {
    let start = utc(2024, 3, 1, 0, 0);
    let (medication, reminder) = reminder_fixture(&["08:00"], Some("7 days"), start);
    let profile_id = reminder.profile_id;
    let store = InMemoryStore::with_reminder(medication, reminder.clone());

    let now = utc(2024, 3, 4, 12, 0);
    // Work against a future day so the cleared slot cannot be instantly
    // re-backfilled as missed by the follow-up listing.
    let tomorrow = "2024-03-05";

    let taken = SetStatusRequest {
        status: "taken".to_string(),
        date: Some(tomorrow.to_string()),
        time: Some("08:00".to_string()),
    };
    apply_status(&store, now, &reminder, &taken).await.unwrap();
    assert_eq!(store.log_count(), 1);

    let pending = SetStatusRequest {
        status: "pending".to_string(),
        date: Some(tomorrow.to_string()),
        time: Some("08:00".to_string()),
    };
    let (log, _) = apply_status(&store, now, &reminder, &pending).await.unwrap();
    assert!(log.is_none());
    assert_eq!(store.log_count(), 0);

    let resolved = resolve_reminders_for_day(&store, now, profile_id, utc(2024, 3, 5, 0, 0))
        .await
        .unwrap();
    assert_eq!(resolved[0].slots[0].status, None);
}

#[tokio::test]
async fn set_status_updates_an_existing_log_in_place() {
    let start = utc(2024, 3, 1, 0, 0);
    let (medication, reminder) = reminder_fixture(&["08:00"], Some("7 days"), start);
    let store = InMemoryStore::with_reminder(medication, reminder.clone());

    let now = utc(2024, 3, 4, 12, 0);
    let missed = SetStatusRequest {
        status: "missed".to_string(),
        date: Some("2024-03-04".to_string()),
        time: Some("08:00".to_string()),
    };
    apply_status(&store, now, &reminder, &missed).await.unwrap();

    let taken = SetStatusRequest {
        status: "taken".to_string(),
        date: Some("2024-03-04".to_string()),
        time: Some("08:00".to_string()),
    };
    apply_status(&store, now, &reminder, &taken).await.unwrap();

    let logs = store.logs_snapshot();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, LogStatus::Taken);
}

#[tokio::test]
async fn set_status_rejects_times_outside_the_schedule() {
    let start = utc(2024, 3, 1, 0, 0);
    let (medication, reminder) = reminder_fixture(&["08:00"], Some("7 days"), start);
    let store = InMemoryStore::with_reminder(medication, reminder.clone());

    let request = SetStatusRequest {
        status: "taken".to_string(),
        date: None,
        time: Some("23:45".to_string()),
    };
    let err = apply_status(&store, utc(2024, 3, 4, 12, 0), &reminder, &request)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

#[tokio::test]
async fn set_status_rejects_unknown_status_values() {
    let start = utc(2024, 3, 1, 0, 0);
    let (medication, reminder) = reminder_fixture(&["08:00"], Some("7 days"), start);
    let store = InMemoryStore::with_reminder(medication, reminder.clone());

    let request = SetStatusRequest {
        status: "snoozed".to_string(),
        date: None,
        time: None,
    };
    let err = apply_status(&store, utc(2024, 3, 4, 12, 0), &reminder, &request)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

#[tokio::test]
async fn set_status_defaults_to_the_first_scheduled_time() {
    let start = utc(2024, 3, 1, 0, 0);
    let (medication, reminder) = reminder_fixture(&["09:30", "21:30"], Some("7 days"), start);
    let store = InMemoryStore::with_reminder(medication, reminder.clone());

    let request = SetStatusRequest {
        status: "taken".to_string(),
        date: Some("2024-03-02".to_string()),
        time: None,
    };
    let (log, time) = apply_status(&store, utc(2024, 3, 4, 12, 0), &reminder, &request)
        .await
        .unwrap();
    assert_eq!(time, "09:30");
    assert_eq!(log.unwrap().occurred_at, utc(2024, 3, 2, 9, 30));
}

#[tokio::test]
async fn resolver_finds_logs_written_by_set_status_and_vice_versa() {
    let start = utc(2024, 3, 1, 0, 0);
    let (medication, reminder) = reminder_fixture(&["08:00"], Some("7 days"), start);
    let profile_id = reminder.profile_id;
    let store = InMemoryStore::with_reminder(medication, reminder.clone());

    // The listing backfills yesterday's slot as missed...
    let now = utc(2024, 3, 4, 10, 0);
    resolve_reminders_for_day(&store, now, profile_id, utc(2024, 3, 3, 0, 0))
        .await
        .unwrap();
    assert_eq!(store.log_count(), 1);

    // ...and the status-set path finds that same log and flips it.
    let request = SetStatusRequest {
        status: "taken".to_string(),
        date: Some("2024-03-03".to_string()),
        time: Some("08:00".to_string()),
    };
    apply_status(&store, now, &reminder, &request).await.unwrap();

    let logs = store.logs_snapshot();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, LogStatus::Taken);

    let resolved = resolve_reminders_for_day(&store, now, profile_id, utc(2024, 3, 3, 0, 0))
        .await
        .unwrap();
    assert_eq!(resolved[0].slots[0].status, Some(LogStatus::Taken));
    assert_eq!(resolved[0].status, Some(LogStatus::Taken));
}
