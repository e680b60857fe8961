//! Catalog queries and the rotation pointer operation
//!
//! The catalog is populated by external ingestion tooling; from the core's
//! perspective it is read-mostly. The one mutation the core performs is the
//! rotation pointer advance (`set_last_played`), committed per placed entry so
//! later reads within the same build observe progress.

use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::Result;
use crate::models::{Episode, Movie, Show};

const EPISODE_COLUMNS: &str =
    "id, show_id, season_number, episode_number, duration, path, description";

const MOVIE_COLUMNS: &str =
    "id, title, duration, path, enabled, description, thumbnail, thumbnail_width, thumbnail_height";

/// Repository over the shows, episodes, and movies tables
pub struct CatalogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CatalogRepository {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Ids of all enabled shows, in stable id order
    ///
    /// Randomized selection over this list happens in the builder so it stays
    /// deterministic under a seeded generator.
    pub fn enabled_show_ids(&self) -> Result<Vec<i64>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id FROM shows WHERE enabled = 1 ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    /// Fetch a show by id
    pub fn show(&self, id: i64) -> Result<Option<Show>> {
        let conn = self.conn.lock().unwrap();
        let show = conn
            .query_row(
                "SELECT id, title, description, enabled, last_played_episode,
                        thumbnail, thumbnail_width, thumbnail_height
                 FROM shows WHERE id = ?1",
                params![id],
                show_from_row,
            )
            .optional()?;
        Ok(show)
    }

    /// Enabled shows whose total episode runtime meets `min_total_secs`
    ///
    /// These are the marathon candidates; id order keeps the list stable for
    /// seeded selection.
    pub fn marathon_candidates(&self, min_total_secs: i64) -> Result<Vec<i64>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT e.show_id FROM episodes e
             JOIN shows s ON e.show_id = s.id
             WHERE s.enabled = 1
             GROUP BY e.show_id
             HAVING SUM(e.duration) >= ?1
             ORDER BY e.show_id",
        )?;
        let ids = stmt
            .query_map(params![min_total_secs], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    /// All enabled movies, in stable id order
    pub fn enabled_movies(&self) -> Result<Vec<Movie>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE enabled = 1 ORDER BY id"
        ))?;
        let movies = stmt
            .query_map([], movie_from_row)?
            .collect::<rusqlite::Result<Vec<Movie>>>()?;
        Ok(movies)
    }

    /// Next episode of a show per its stored rotation pointer
    pub fn next_episode(&self, show_id: i64) -> Result<Option<Episode>> {
        let last = self.last_played(show_id)?;
        self.next_episode_after(show_id, last)
    }

    /// Next episode of a show given an explicit rotation position
    ///
    /// The rotation rule in one place: with no pointer, the first episode in
    /// `(season, episode)` order; otherwise the next episode after the
    /// pointer's ordering key, wrapping to the first episode once the last has
    /// been played. A pointer to a since-deleted episode restarts the
    /// rotation.
    pub fn next_episode_after(
        &self,
        show_id: i64,
        last_episode_id: Option<i64>,
    ) -> Result<Option<Episode>> {
        let conn = self.conn.lock().unwrap();

        let Some(last_id) = last_episode_id else {
            return first_episode(&conn, show_id);
        };

        let key: Option<(u32, u32)> = conn
            .query_row(
                "SELECT season_number, episode_number FROM episodes WHERE id = ?1",
                params![last_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((season, episode)) = key else {
            return first_episode(&conn, show_id);
        };

        let next = conn
            .query_row(
                &format!(
                    "SELECT {EPISODE_COLUMNS} FROM episodes
                     WHERE show_id = ?1
                       AND (season_number > ?2
                            OR (season_number = ?2 AND episode_number > ?3))
                     ORDER BY season_number, episode_number LIMIT 1"
                ),
                params![show_id, season, episode],
                episode_from_row,
            )
            .optional()?;

        match next {
            Some(e) => Ok(Some(e)),
            None => first_episode(&conn, show_id),
        }
    }

    /// Current rotation pointer of a show
    pub fn last_played(&self, show_id: i64) -> Result<Option<i64>> {
        let conn = self.conn.lock().unwrap();
        let last = conn
            .query_row(
                "SELECT last_played_episode FROM shows WHERE id = ?1",
                params![show_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(last.flatten())
    }

    /// Advance a show's rotation pointer
    pub fn set_last_played(&self, show_id: i64, episode_id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE shows SET last_played_episode = ?1 WHERE id = ?2",
            params![episode_id, show_id],
        )?;
        Ok(())
    }

    /// Insert a show (used by ingestion tooling and test fixtures)
    pub fn add_show(&self, title: &str, description: Option<&str>, enabled: bool) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO shows (title, description, enabled) VALUES (?1, ?2, ?3)",
            params![title, description, enabled],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert an episode
    pub fn add_episode(
        &self,
        show_id: i64,
        season_number: u32,
        episode_number: u32,
        duration: i64,
        path: &str,
    ) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO episodes (show_id, season_number, episode_number, duration, path)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![show_id, season_number, episode_number, duration, path],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert a movie
    pub fn add_movie(&self, title: &str, duration: i64, path: &str, enabled: bool) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO movies (title, duration, path, enabled) VALUES (?1, ?2, ?3, ?4)",
            params![title, duration, path, enabled],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

fn first_episode(conn: &Connection, show_id: i64) -> Result<Option<Episode>> {
    let episode = conn
        .query_row(
            &format!(
                "SELECT {EPISODE_COLUMNS} FROM episodes
                 WHERE show_id = ?1
                 ORDER BY season_number, episode_number LIMIT 1"
            ),
            params![show_id],
            episode_from_row,
        )
        .optional()?;
    Ok(episode)
}

fn show_from_row(row: &Row) -> rusqlite::Result<Show> {
    Ok(Show {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        enabled: row.get(3)?,
        last_played_episode: row.get(4)?,
        thumbnail: row.get(5)?,
        thumbnail_width: row.get(6)?,
        thumbnail_height: row.get(7)?,
    })
}

fn episode_from_row(row: &Row) -> rusqlite::Result<Episode> {
    Ok(Episode {
        id: row.get(0)?,
        show_id: row.get(1)?,
        season_number: row.get(2)?,
        episode_number: row.get(3)?,
        duration: row.get(4)?,
        path: row.get(5)?,
        description: row.get(6)?,
    })
}

fn movie_from_row(row: &Row) -> rusqlite::Result<Movie> {
    Ok(Movie {
        id: row.get(0)?,
        title: row.get(1)?,
        duration: row.get(2)?,
        path: row.get(3)?,
        enabled: row.get(4)?,
        description: row.get(5)?,
        thumbnail: row.get(6)?,
        thumbnail_width: row.get(7)?,
        thumbnail_height: row.get(8)?,
    })
}
