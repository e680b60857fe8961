//! Integration tests for drift correction and retention purging

mod common;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use telecast::models::EntryTag;
use telecast::scheduler::{adjust_future_times, purge_before};
use telecast::storage::Database;

use common::insert_entry;

fn ts(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 10)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

// ============================================================================
// Drift Correction
// ============================================================================

/// Completed entry at 12:00-12:30 that actually ended 45s late, followed by a
/// contiguous chain and one deliberately gapped entry.
fn drifted_schedule(db: &Database) -> (i64, i64, i64, i64) {
    let done = insert_entry(db, EntryTag::TvEpisode, "Done", ts(12, 0), 1800, Some("/m/a.mkv"));
    let e1 = insert_entry(db, EntryTag::TvEpisode, "Next", ts(12, 30), 1800, Some("/m/b.mkv"));
    let e2 = insert_entry(db, EntryTag::TvEpisode, "Later", ts(13, 0), 1800, Some("/m/c.mkv"));
    // Ten-minute planned buffer before this one
    let gapped = insert_entry(db, EntryTag::Movie, "Buffered", ts(13, 40), 5400, Some("/m/d.mkv"));

    let store = db.schedule();
    store.record_actual_start(done, ts(12, 0)).unwrap();
    store
        .record_actual_end(done, ts(12, 30) + Duration::seconds(45))
        .unwrap();

    (done, e1, e2, gapped)
}

#[test]
fn test_drift_shifts_contiguous_future_entries() {
    let db = Database::in_memory().unwrap();
    let (_, e1, e2, gapped) = drifted_schedule(&db);

    let report = adjust_future_times(&db.schedule()).unwrap();
    assert_eq!(report.offset_secs, 45);
    assert_eq!(report.shifted, 2);

    let store = db.schedule();
    let shifted1 = store.entry(e1).unwrap().unwrap();
    assert_eq!(shifted1.start_time, ts(12, 30) + Duration::seconds(45));
    assert_eq!(shifted1.end_time, ts(13, 0) + Duration::seconds(45));

    let shifted2 = store.entry(e2).unwrap().unwrap();
    assert_eq!(shifted2.start_time, ts(13, 0) + Duration::seconds(45));

    // The pre-existing gap is preserved, not collapsed
    let untouched = store.entry(gapped).unwrap().unwrap();
    assert_eq!(untouched.start_time, ts(13, 40));
}

#[test]
fn test_drift_adjustment_is_idempotent() {
    let db = Database::in_memory().unwrap();
    let (_, e1, e2, gapped) = drifted_schedule(&db);

    adjust_future_times(&db.schedule()).unwrap();
    let store = db.schedule();
    let snapshot: Vec<_> = [e1, e2, gapped]
        .iter()
        .map(|&id| {
            let e = store.entry(id).unwrap().unwrap();
            (e.start_time, e.end_time)
        })
        .collect();

    // No new completions: the second pass must not move anything
    let report = adjust_future_times(&db.schedule()).unwrap();
    assert_eq!(report.shifted, 0);

    let after: Vec<_> = [e1, e2, gapped]
        .iter()
        .map(|&id| {
            let e = store.entry(id).unwrap().unwrap();
            (e.start_time, e.end_time)
        })
        .collect();
    assert_eq!(snapshot, after);
}

#[test]
fn test_drift_noop_when_on_plan() {
    let db = Database::in_memory().unwrap();
    let done = insert_entry(&db, EntryTag::TvEpisode, "Done", ts(12, 0), 1800, Some("/m/a.mkv"));
    let e1 = insert_entry(&db, EntryTag::TvEpisode, "Next", ts(12, 30), 1800, Some("/m/b.mkv"));

    let store = db.schedule();
    store.record_actual_start(done, ts(12, 0)).unwrap();
    store.record_actual_end(done, ts(12, 30)).unwrap();

    let report = adjust_future_times(&store).unwrap();
    assert_eq!(report.offset_secs, 0);
    assert_eq!(report.shifted, 0);
    assert_eq!(store.entry(e1).unwrap().unwrap().start_time, ts(12, 30));
}

#[test]
fn test_drift_noop_without_completions() {
    let db = Database::in_memory().unwrap();
    insert_entry(&db, EntryTag::TvEpisode, "Next", ts(12, 30), 1800, Some("/m/b.mkv"));

    let report = adjust_future_times(&db.schedule()).unwrap();
    assert_eq!(report.shifted, 0);
}

#[test]
fn test_drift_leaves_started_entries_in_place() {
    let db = Database::in_memory().unwrap();
    let (_, e1, e2, _) = drifted_schedule(&db);

    // The chain's first entry is already on the air
    let store = db.schedule();
    store.record_actual_start(e1, ts(12, 30)).unwrap();

    let report = adjust_future_times(&store).unwrap();
    assert_eq!(report.shifted, 1);

    // The running entry keeps its plan; the one behind it still shifts
    assert_eq!(store.entry(e1).unwrap().unwrap().start_time, ts(12, 30));
    assert_eq!(
        store.entry(e2).unwrap().unwrap().start_time,
        ts(13, 0) + Duration::seconds(45)
    );
}

// ============================================================================
// Purge
// ============================================================================

#[test]
fn test_purge_respects_cutoff_and_dry_run() {
    let db = Database::in_memory().unwrap();
    insert_entry(&db, EntryTag::TvEpisode, "Ancient", ts(1, 0), 1800, Some("/m/a.mkv"));
    insert_entry(&db, EntryTag::TvEpisode, "Old", ts(2, 0), 1800, Some("/m/b.mkv"));
    let recent = insert_entry(&db, EntryTag::TvEpisode, "Recent", ts(12, 0), 1800, Some("/m/c.mkv"));

    let store = db.schedule();
    let cutoff = ts(6, 0);

    let dry = purge_before(&store, cutoff, true).unwrap();
    assert_eq!(dry.entries, 2);
    assert!(dry.dry_run);
    // Counting removes nothing
    assert_eq!(store.entries_from(ts(0, 0)).unwrap().len(), 3);

    let real = purge_before(&store, cutoff, false).unwrap();
    assert_eq!(real.entries, 2);
    let remaining = store.entries_from(ts(0, 0)).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, recent);
}
