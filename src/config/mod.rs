//! Configuration management for the telecast channel
//!
//! Configuration is loaded from `TELECAST_*` environment variables with
//! sensible defaults, then validated. Sections group the options by concern:
//! channel programming rules, playout/transcode parameters, database location,
//! and logging.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Programming rules for the schedule builder
    pub channel: ChannelConfig,

    /// Playout and transcode configuration
    pub playout: PlayoutConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Programming rules consumed by the schedule builder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Probability (0.0 - 1.0) that a build day contains a marathon
    pub marathon_chance: f64,

    /// Probability (0.0 - 1.0) that a build day contains a movie
    pub movie_chance: f64,

    /// Minutes between intermission slots; 0 disables intermissions
    pub intermission_interval_mins: u32,

    /// Days of schedule history to keep before purging
    pub retention_days: u32,
}

/// Playout and transcode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayoutConfig {
    /// Path to the ffmpeg executable
    pub ffmpeg_path: PathBuf,

    /// Path to the ffprobe executable
    pub ffprobe_path: PathBuf,

    /// Streaming destination (sole output target of the transcode process)
    pub rtmp_url: String,

    /// Preferred audio language tag (e.g. "eng")
    pub audio_lang: String,

    /// Canonical output frame width
    pub output_width: u32,

    /// Canonical output frame height
    pub output_height: u32,

    /// Optional watermark image overlaid on the output
    pub watermark: Option<PathBuf>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path
    pub sqlite_path: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let marathon_chance = env_parse("TELECAST_MARATHON_CHANCE", 0.15);
        let movie_chance = env_parse("TELECAST_MOVIE_CHANCE", 0.15);
        let intermission_interval_mins = env_parse("TELECAST_INTERMISSION_INTERVAL", 60);
        let retention_days = env_parse("TELECAST_RETENTION_DAYS", 14);

        let ffmpeg_path = std::env::var("TELECAST_FFMPEG_PATH")
            .unwrap_or_else(|_| String::from("ffmpeg"))
            .into();
        let ffprobe_path = std::env::var("TELECAST_FFPROBE_PATH")
            .unwrap_or_else(|_| String::from("ffprobe"))
            .into();
        let rtmp_url = std::env::var("TELECAST_RTMP_URL")
            .unwrap_or_else(|_| String::from("rtmp://localhost/live/stream"));
        let audio_lang =
            std::env::var("TELECAST_AUDIO_LANG").unwrap_or_else(|_| String::from("eng"));
        let output_width = env_parse("TELECAST_OUTPUT_WIDTH", 1920);
        let output_height = env_parse("TELECAST_OUTPUT_HEIGHT", 1080);
        let watermark = std::env::var("TELECAST_WATERMARK").ok().map(PathBuf::from);

        let sqlite_path = std::env::var("TELECAST_DB_PATH")
            .unwrap_or_else(|_| String::from("data/telecast.db"))
            .into();

        let level = std::env::var("TELECAST_LOG_LEVEL").unwrap_or_else(|_| String::from("info"));
        let format = std::env::var("TELECAST_LOG_FORMAT").unwrap_or_else(|_| String::from("text"));

        let config = Self {
            channel: ChannelConfig {
                marathon_chance,
                movie_chance,
                intermission_interval_mins,
                retention_days,
            },
            playout: PlayoutConfig {
                ffmpeg_path,
                ffprobe_path,
                rtmp_url,
                audio_lang,
                output_width,
                output_height,
                watermark,
            },
            database: DatabaseConfig { sqlite_path },
            logging: LoggingConfig { level, format },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.channel.marathon_chance) {
            bail!(
                "marathon chance must be between 0.0 and 1.0, got {}",
                self.channel.marathon_chance
            );
        }
        if !(0.0..=1.0).contains(&self.channel.movie_chance) {
            bail!(
                "movie chance must be between 0.0 and 1.0, got {}",
                self.channel.movie_chance
            );
        }
        if self.playout.output_width == 0 || self.playout.output_height == 0 {
            bail!(
                "output dimensions must be non-zero, got {}x{}",
                self.playout.output_width,
                self.playout.output_height
            );
        }
        if self.playout.rtmp_url.is_empty() {
            bail!("streaming destination must not be empty");
        }
        Ok(())
    }
}

/// Read an env var and parse it, falling back to a default
fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
