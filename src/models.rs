// Core data structures for the telecast channel automation

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A TV show in the catalog
///
/// `last_played_episode` is the rotation pointer: the id of the most recently
/// scheduled episode, advanced by the builder as entries are placed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Show {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub last_played_episode: Option<i64>,
    pub thumbnail: Option<String>,
    pub thumbnail_width: Option<u32>,
    pub thumbnail_height: Option<u32>,
}

/// A single episode belonging to a show
///
/// Episodes are ordered by `(season_number, episode_number)` ascending; the
/// rotation pointer walks that order and wraps at the end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: i64,
    pub show_id: i64,
    pub season_number: u32,
    pub episode_number: u32,
    /// Runtime in seconds
    pub duration: i64,
    pub path: String,
    pub description: Option<String>,
}

/// A movie in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    /// Runtime in seconds
    pub duration: i64,
    pub path: String,
    pub enabled: bool,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub thumbnail_width: Option<u32>,
    pub thumbnail_height: Option<u32>,
}

/// Classification of a schedule entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryTag {
    TvEpisode,
    TvMarathon,
    Movie,
    Intermission,
}

impl EntryTag {
    /// Get string representation as stored in the schedule table
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TvEpisode => "TV_EPISODE",
            Self::TvMarathon => "TV_MARATHON",
            Self::Movie => "MOVIE",
            Self::Intermission => "INTERMISSION",
        }
    }

    /// Create from the stored string representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TV_EPISODE" => Some(Self::TvEpisode),
            "TV_MARATHON" => Some(Self::TvMarathon),
            "MOVIE" => Some(Self::Movie),
            "INTERMISSION" => Some(Self::Intermission),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntryTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EntryTag {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown entry tag '{s}'"))
    }
}

/// A row in the schedule table
///
/// `start_time`/`end_time` are the planned timeline; the actual timestamps and
/// the `completed` flag are written by the playout engine as execution is
/// observed. `path` is null only for intermission entries whose media has not
/// been materialized yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: i64,
    pub tag: EntryTag,
    pub is_marathon: bool,
    pub title: String,
    pub description: Option<String>,
    pub path: Option<String>,
    pub thumbnail: Option<String>,
    pub thumbnail_width: Option<u32>,
    pub thumbnail_height: Option<u32>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub actual_start_time: Option<NaiveDateTime>,
    pub actual_end_time: Option<NaiveDateTime>,
    pub completed: bool,
}

impl ScheduleEntry {
    /// Planned runtime in seconds
    pub fn duration(&self) -> i64 {
        (self.end_time - self.start_time).num_seconds()
    }

    /// Whether the playout engine has started (or finished) this entry
    pub fn started(&self) -> bool {
        self.actual_start_time.is_some()
    }
}

/// A schedule entry pending insertion (no id, no actuals yet)
#[derive(Debug, Clone)]
pub struct NewScheduleEntry {
    pub tag: EntryTag,
    pub is_marathon: bool,
    pub title: String,
    pub description: Option<String>,
    pub path: Option<String>,
    pub thumbnail: Option<String>,
    pub thumbnail_width: Option<u32>,
    pub thumbnail_height: Option<u32>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}
