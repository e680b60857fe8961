//! SQLite persistence for the catalog and the schedule
//!
//! A single database file holds both the media catalog (shows, episodes,
//! movies) and the schedule table. [`Database`] owns the connection and hands
//! out repository views:
//!
//! - [`CatalogRepository`] - read-mostly catalog queries plus the rotation
//!   pointer operation
//! - [`ScheduleStore`] - schedule entry lifecycle (insert, timing updates,
//!   range queries, retention deletes)
//!
//! The repositories share one `Mutex<Connection>`; WAL mode keeps concurrent
//! batch tools (builder, intermission generator, playout) from blocking each
//! other on the file.

pub mod catalog;
pub mod schedule;

pub use catalog::CatalogRepository;
pub use schedule::ScheduleStore;

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::error::Result;

/// Database management wrapper
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.create_schema()?;

        tracing::info!(path = %path.display(), "database opened");
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.create_schema()?;
        Ok(db)
    }

    /// Catalog repository view over this database
    pub fn catalog(&self) -> CatalogRepository {
        CatalogRepository::new(self.conn.clone())
    }

    /// Schedule store view over this database
    pub fn schedule(&self) -> ScheduleStore {
        ScheduleStore::new(self.conn.clone())
    }

    /// Create database schema
    fn create_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS shows (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT,
                enabled INTEGER NOT NULL DEFAULT 1,
                last_played_episode INTEGER,
                thumbnail TEXT,
                thumbnail_width INTEGER,
                thumbnail_height INTEGER
            );

            CREATE TABLE IF NOT EXISTS episodes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                show_id INTEGER NOT NULL REFERENCES shows(id),
                season_number INTEGER NOT NULL,
                episode_number INTEGER NOT NULL,
                duration INTEGER NOT NULL,
                path TEXT NOT NULL,
                description TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_episodes_rotation
                ON episodes(show_id, season_number, episode_number);

            CREATE TABLE IF NOT EXISTS movies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                duration INTEGER NOT NULL,
                path TEXT NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1,
                description TEXT,
                thumbnail TEXT,
                thumbnail_width INTEGER,
                thumbnail_height INTEGER
            );

            CREATE TABLE IF NOT EXISTS schedule (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tag TEXT NOT NULL,
                is_marathon INTEGER NOT NULL DEFAULT 0,
                title TEXT NOT NULL,
                description TEXT,
                path TEXT,
                thumbnail TEXT,
                thumbnail_width INTEGER,
                thumbnail_height INTEGER,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                actual_start_time TEXT,
                actual_end_time TEXT,
                completed INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_schedule_start
                ON schedule(start_time);

            CREATE INDEX IF NOT EXISTS idx_schedule_tag
                ON schedule(tag);
            "#,
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_schema() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("telecast.db")).unwrap();
        // Schema exists: inserting through the repositories must succeed
        let catalog = db.catalog();
        let show_id = catalog.add_show("Test Show", None, true).unwrap();
        assert!(show_id > 0);
    }

    #[test]
    fn test_in_memory_repositories_share_connection() {
        let db = Database::in_memory();
        let db = db.unwrap();
        let catalog = db.catalog();
        let show_id = catalog.add_show("Shared", None, true).unwrap();
        // A second view over the same database sees the row
        let catalog2 = db.catalog();
        assert!(catalog2.show(show_id).unwrap().is_some());
    }
}
