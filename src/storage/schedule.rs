//! Schedule entry lifecycle: inserts, timing updates, range queries, purge
//!
//! The schedule table is the ground truth shared by the builder, the drift
//! corrector, the playout engine, and the out-of-band intermission generator.
//! Each of them goes through this store; the playout engine is the only
//! writer of the actual-timing fields.

use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::Result;
use crate::models::{EntryTag, NewScheduleEntry, ScheduleEntry};

const ENTRY_COLUMNS: &str = "id, tag, is_marathon, title, description, path, \
     thumbnail, thumbnail_width, thumbnail_height, \
     start_time, end_time, actual_start_time, actual_end_time, completed";

/// Store over the schedule table
pub struct ScheduleStore {
    conn: Arc<Mutex<Connection>>,
}

impl ScheduleStore {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Insert a new entry, returning its id
    pub fn insert(&self, entry: &NewScheduleEntry) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO schedule (tag, is_marathon, title, description, path,
                 thumbnail, thumbnail_width, thumbnail_height, start_time, end_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                entry.tag.as_str(),
                entry.is_marathon,
                entry.title,
                entry.description,
                entry.path,
                entry.thumbnail,
                entry.thumbnail_width,
                entry.thumbnail_height,
                entry.start_time,
                entry.end_time,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Fetch an entry by id
    pub fn entry(&self, id: i64) -> Result<Option<ScheduleEntry>> {
        let conn = self.conn.lock().unwrap();
        let entry = conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM schedule WHERE id = ?1"),
                params![id],
                entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    /// Planned end of the latest entry in the schedule, if any
    pub fn latest_end_time(&self) -> Result<Option<NaiveDateTime>> {
        let conn = self.conn.lock().unwrap();
        let end = conn.query_row("SELECT MAX(end_time) FROM schedule", [], |row| row.get(0))?;
        Ok(end)
    }

    /// Planned end of the most recent intermission ending at or before `t`
    pub fn last_intermission_end_before(&self, t: NaiveDateTime) -> Result<Option<NaiveDateTime>> {
        let conn = self.conn.lock().unwrap();
        let end = conn.query_row(
            "SELECT MAX(end_time) FROM schedule WHERE tag = 'INTERMISSION' AND end_time <= ?1",
            params![t],
            |row| row.get(0),
        )?;
        Ok(end)
    }

    /// The playable entry whose planned window covers `now`
    pub fn entry_covering(&self, now: NaiveDateTime) -> Result<Option<ScheduleEntry>> {
        let conn = self.conn.lock().unwrap();
        let entry = conn
            .query_row(
                &format!(
                    "SELECT {ENTRY_COLUMNS} FROM schedule
                     WHERE start_time <= ?1 AND end_time > ?1 AND path IS NOT NULL
                     ORDER BY start_time LIMIT 1"
                ),
                params![now],
                entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    /// First playable entry starting at or after `t` (null-path entries skipped)
    pub fn next_playable_at_or_after(&self, t: NaiveDateTime) -> Result<Option<ScheduleEntry>> {
        self.next_playable(t, ">=")
    }

    /// First playable entry starting strictly after `t` (null-path entries skipped)
    pub fn next_playable_after(&self, t: NaiveDateTime) -> Result<Option<ScheduleEntry>> {
        self.next_playable(t, ">")
    }

    fn next_playable(&self, t: NaiveDateTime, op: &str) -> Result<Option<ScheduleEntry>> {
        let conn = self.conn.lock().unwrap();
        let entry = conn
            .query_row(
                &format!(
                    "SELECT {ENTRY_COLUMNS} FROM schedule
                     WHERE start_time {op} ?1 AND path IS NOT NULL
                     ORDER BY start_time LIMIT 1"
                ),
                params![t],
                entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    /// Record the observed start of an entry
    pub fn record_actual_start(&self, id: i64, at: NaiveDateTime) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE schedule SET actual_start_time = ?1, completed = 0 WHERE id = ?2",
            params![at, id],
        )?;
        Ok(())
    }

    /// Record the observed end of an entry and mark it completed
    pub fn record_actual_end(&self, id: i64, at: NaiveDateTime) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE schedule SET actual_end_time = ?1, completed = 1 WHERE id = ?2",
            params![at, id],
        )?;
        Ok(())
    }

    /// Most recently completed entry with a known actual end time
    pub fn last_completed(&self) -> Result<Option<ScheduleEntry>> {
        let conn = self.conn.lock().unwrap();
        let entry = conn
            .query_row(
                &format!(
                    "SELECT {ENTRY_COLUMNS} FROM schedule
                     WHERE completed = 1 AND actual_end_time IS NOT NULL
                     ORDER BY actual_end_time DESC LIMIT 1"
                ),
                [],
                entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    /// All entries starting at or after `t`, in chronological order
    pub fn entries_from(&self, t: NaiveDateTime) -> Result<Vec<ScheduleEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM schedule
             WHERE start_time >= ?1 ORDER BY start_time"
        ))?;
        let entries = stmt
            .query_map(params![t], entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// Entries whose planned start falls in `[from, to)`, in chronological order
    pub fn entries_in_range(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<ScheduleEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM schedule
             WHERE start_time >= ?1 AND start_time < ?2 ORDER BY start_time"
        ))?;
        let entries = stmt
            .query_map(params![from, to], entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// Move an entry's planned window
    pub fn shift_entry(
        &self,
        id: i64,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE schedule SET start_time = ?1, end_time = ?2 WHERE id = ?3",
            params![start_time, end_time, id],
        )?;
        Ok(())
    }

    /// Set or clear an entry's media path
    ///
    /// Used by the out-of-band intermission generator once the media for a
    /// null-path slot has been materialized (and cleared again on cleanup).
    pub fn set_path(&self, id: i64, path: Option<&str>) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE schedule SET path = ?1 WHERE id = ?2",
            params![path, id],
        )?;
        Ok(())
    }

    /// Future intermission slots still waiting for generated media
    pub fn future_intermissions_without_path(
        &self,
        now: NaiveDateTime,
    ) -> Result<Vec<ScheduleEntry>> {
        self.intermissions(
            "start_time > ?1 AND tag = 'INTERMISSION' AND path IS NULL",
            now,
        )
    }

    /// Past intermission slots whose generated media can be reclaimed
    pub fn expired_intermissions(&self, now: NaiveDateTime) -> Result<Vec<ScheduleEntry>> {
        self.intermissions(
            "end_time < ?1 AND tag = 'INTERMISSION' AND path IS NOT NULL",
            now,
        )
    }

    fn intermissions(&self, predicate: &str, t: NaiveDateTime) -> Result<Vec<ScheduleEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM schedule WHERE {predicate} ORDER BY start_time"
        ))?;
        let entries = stmt
            .query_map(params![t], entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// Count entries whose planned end precedes `cutoff`
    pub fn count_ended_before(&self, cutoff: NaiveDateTime) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM schedule WHERE end_time < ?1",
            params![cutoff],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Delete entries whose planned end precedes `cutoff`, returning the count
    pub fn delete_ended_before(&self, cutoff: NaiveDateTime) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM schedule WHERE end_time < ?1",
            params![cutoff],
        )?;
        Ok(deleted)
    }
}

fn entry_from_row(row: &Row) -> rusqlite::Result<ScheduleEntry> {
    let tag_str: String = row.get(1)?;
    let tag = EntryTag::parse(&tag_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown entry tag '{tag_str}'").into(),
        )
    })?;

    Ok(ScheduleEntry {
        id: row.get(0)?,
        tag,
        is_marathon: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        path: row.get(5)?,
        thumbnail: row.get(6)?,
        thumbnail_width: row.get(7)?,
        thumbnail_height: row.get(8)?,
        start_time: row.get(9)?,
        end_time: row.get(10)?,
        actual_start_time: row.get(11)?,
        actual_end_time: row.get(12)?,
        completed: row.get(13)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use chrono::{Duration, NaiveDate};

    fn ts(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn new_entry(tag: EntryTag, start: NaiveDateTime, secs: i64, path: Option<&str>) -> NewScheduleEntry {
        NewScheduleEntry {
            tag,
            is_marathon: false,
            title: String::from("Entry"),
            description: None,
            path: path.map(String::from),
            thumbnail: None,
            thumbnail_width: None,
            thumbnail_height: None,
            start_time: start,
            end_time: start + Duration::seconds(secs),
        }
    }

    #[test]
    fn test_insert_and_fetch_round_trip() {
        let db = Database::in_memory().unwrap();
        let store = db.schedule();
        let id = store
            .insert(&new_entry(EntryTag::TvEpisode, ts(12, 0), 1800, Some("/m/a.mkv")))
            .unwrap();

        let entry = store.entry(id).unwrap().unwrap();
        assert_eq!(entry.tag, EntryTag::TvEpisode);
        assert_eq!(entry.start_time, ts(12, 0));
        assert_eq!(entry.duration(), 1800);
        assert!(!entry.completed);
        assert!(entry.actual_start_time.is_none());
    }

    #[test]
    fn test_playable_queries_skip_null_paths() {
        let db = Database::in_memory().unwrap();
        let store = db.schedule();
        store
            .insert(&new_entry(EntryTag::Intermission, ts(12, 0), 180, None))
            .unwrap();
        let with_path = store
            .insert(&new_entry(EntryTag::TvEpisode, ts(12, 3), 1800, Some("/m/b.mkv")))
            .unwrap();

        let next = store.next_playable_at_or_after(ts(12, 0)).unwrap().unwrap();
        assert_eq!(next.id, with_path);

        // Covering lookup also refuses the unmaterialized slot
        assert!(store.entry_covering(ts(12, 1)).unwrap().is_none());
    }

    #[test]
    fn test_actual_timing_updates() {
        let db = Database::in_memory().unwrap();
        let store = db.schedule();
        let id = store
            .insert(&new_entry(EntryTag::TvEpisode, ts(12, 0), 1800, Some("/m/a.mkv")))
            .unwrap();

        store.record_actual_start(id, ts(12, 1)).unwrap();
        let entry = store.entry(id).unwrap().unwrap();
        assert_eq!(entry.actual_start_time, Some(ts(12, 1)));
        assert!(!entry.completed);

        store.record_actual_end(id, ts(12, 31)).unwrap();
        let entry = store.entry(id).unwrap().unwrap();
        assert_eq!(entry.actual_end_time, Some(ts(12, 31)));
        assert!(entry.completed);

        let last = store.last_completed().unwrap().unwrap();
        assert_eq!(last.id, id);
    }

    #[test]
    fn test_retention_delete_and_count() {
        let db = Database::in_memory().unwrap();
        let store = db.schedule();
        store
            .insert(&new_entry(EntryTag::TvEpisode, ts(1, 0), 1800, Some("/m/old.mkv")))
            .unwrap();
        store
            .insert(&new_entry(EntryTag::TvEpisode, ts(12, 0), 1800, Some("/m/new.mkv")))
            .unwrap();

        assert_eq!(store.count_ended_before(ts(6, 0)).unwrap(), 1);
        assert_eq!(store.delete_ended_before(ts(6, 0)).unwrap(), 1);
        assert_eq!(store.count_ended_before(ts(6, 0)).unwrap(), 0);
    }

    #[test]
    fn test_intermission_materialization_surface() {
        let db = Database::in_memory().unwrap();
        let store = db.schedule();
        let pending = store
            .insert(&new_entry(EntryTag::Intermission, ts(14, 0), 180, None))
            .unwrap();
        store
            .insert(&new_entry(EntryTag::Intermission, ts(2, 0), 180, Some("/m/done.mp4")))
            .unwrap();

        let waiting = store.future_intermissions_without_path(ts(12, 0)).unwrap();
        assert_eq!(waiting.len(), 1);
        assert_eq!(waiting[0].id, pending);

        store.set_path(pending, Some("/m/generated.mp4")).unwrap();
        assert!(store
            .future_intermissions_without_path(ts(12, 0))
            .unwrap()
            .is_empty());

        let expired = store.expired_intermissions(ts(12, 0)).unwrap();
        assert_eq!(expired.len(), 1);
    }
}
