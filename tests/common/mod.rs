//! Shared fixtures for integration tests
#![allow(dead_code)]

use chrono::{Duration, NaiveDateTime};
use telecast::models::{EntryTag, NewScheduleEntry};
use telecast::storage::Database;

/// Populate the catalog with shows of `(title, episode_count, episode_secs)`
///
/// Each show gets a single season with episodes numbered from 1. Paths encode
/// the show and episode so tests can recover catalog order from the schedule.
pub fn seed_shows(db: &Database, shows: &[(&str, u32, i64)]) -> Vec<i64> {
    let catalog = db.catalog();
    let mut ids = Vec::new();
    for (title, episodes, secs) in shows {
        let show_id = catalog.add_show(title, None, true).unwrap();
        for n in 1..=*episodes {
            catalog
                .add_episode(show_id, 1, n, *secs, &format!("/media/{title}/s01e{n:03}.mkv"))
                .unwrap();
        }
        ids.push(show_id);
    }
    ids
}

/// Insert a bare schedule entry covering `[start, start + secs)`
pub fn insert_entry(
    db: &Database,
    tag: EntryTag,
    title: &str,
    start: NaiveDateTime,
    secs: i64,
    path: Option<&str>,
) -> i64 {
    db.schedule()
        .insert(&NewScheduleEntry {
            tag,
            is_marathon: false,
            title: title.to_string(),
            description: None,
            path: path.map(String::from),
            thumbnail: None,
            thumbnail_width: None,
            thumbnail_height: None,
            start_time: start,
            end_time: start + Duration::seconds(secs),
        })
        .unwrap()
}
