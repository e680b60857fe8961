//! telecast - Linear Broadcast Channel Automation
//!
//! Fills a 24-hour programming grid from a catalog of shows, episodes, and
//! movies, then plays that grid out in real time to a streaming destination,
//! reconciling the plan against what actually happened on the wire.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`models`] - Core data structures (catalog entities, schedule entries)
//! - [`storage`] - Database operations (catalog repository, schedule store)
//! - [`scheduler`] - Schedule building, drift correction, retention purge
//! - [`playout`] - Real-time playout engine (control loop + playback task)
//! - [`commands`] - CLI command implementations
//!
//! # Example
//!
//! ```no_run
//! use telecast::scheduler::{BuilderOptions, ScheduleBuilder};
//! use telecast::storage::Database;
//!
//! fn main() -> anyhow::Result<()> {
//!     let db = Database::open("data/telecast.db")?;
//!     let opts = BuilderOptions {
//!         marathon_chance: 0.15,
//!         movie_chance: 0.15,
//!         intermission_interval_mins: 60,
//!     };
//!     let mut builder = ScheduleBuilder::new(&db, opts);
//!     let report = builder.build(chrono::Local::now().date_naive(), false)?;
//!     println!("placed {} entries", report.entries);
//!     Ok(())
//! }
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod playout;
pub mod scheduler;
pub mod storage;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::models::{EntryTag, Episode, Movie, ScheduleEntry, Show};
    pub use crate::scheduler::{BuilderOptions, ScheduleBuilder};
    pub use crate::storage::{CatalogRepository, Database, ScheduleStore};
}

// Direct re-exports for convenience
pub use models::{EntryTag, Episode, Movie, ScheduleEntry, Show};
