//! Unified error handling for the telecast crate
//!
//! Domain code returns [`Result`] with the [`Error`] enum below; the command
//! layer wraps everything in `anyhow` for user-facing reporting. The variants
//! mirror the failure taxonomy of the system: storage faults, probe failures,
//! schedule conflicts, and playout wiring errors.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the telecast crate
#[derive(Error, Debug)]
pub enum Error {
    /// SQLite storage errors
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Filesystem and process I/O errors
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A build was requested for a day that already has coverage
    #[error("schedule already extends past {day}")]
    AlreadyScheduled { day: NaiveDate },

    /// The catalog has no enabled shows to schedule
    #[error("no enabled shows in the catalog")]
    NoEnabledShows,

    /// Stream probing failed or produced unusable output
    #[error("stream probe failed for {path}: {reason}")]
    Probe { path: String, reason: String },

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The playout work queue closed unexpectedly
    #[error("playout queue closed")]
    QueueClosed,
}
