//! Stream probing and track selection
//!
//! ffprobe is invoked as an opaque subprocess and its JSON stream list is
//! parsed into [`ProbeStream`] records. Track selection itself is a pure
//! function over that list so the preference chain is testable without media
//! files on disk.

use std::path::PathBuf;

use serde::Deserialize;
use tokio::process::Command;

use crate::error::{Error, Result};

/// Fallback stream index when no video stream can be identified
pub const FALLBACK_VIDEO_INDEX: u32 = 0;

/// Fallback stream index when no audio stream can be identified
pub const FALLBACK_AUDIO_INDEX: u32 = 1;

/// Audio codecs preferred when a language match exists
const APPROVED_AUDIO_CODECS: &[&str] = &["aac", "ac3", "eac3", "mp3", "flac", "opus"];

/// One stream as reported by ffprobe
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeStream {
    pub index: u32,
    #[serde(default)]
    pub codec_type: String,
    #[serde(default)]
    pub codec_name: Option<String>,
    #[serde(default)]
    pub tags: ProbeTags,
}

/// Stream tags we care about
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeTags {
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

/// Selected stream indices for one playout item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackSelection {
    pub video_index: u32,
    pub audio_index: u32,
}

impl TrackSelection {
    /// Selection used when probing fails entirely
    pub fn fallback() -> Self {
        Self {
            video_index: FALLBACK_VIDEO_INDEX,
            audio_index: FALLBACK_AUDIO_INDEX,
        }
    }
}

/// Wrapper around the external ffprobe executable
pub struct MediaProber {
    ffprobe_path: PathBuf,
}

impl MediaProber {
    pub fn new(ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }

    /// Probe the stream list of a media file
    pub async fn probe(&self, path: &str) -> Result<Vec<ProbeStream>> {
        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "error", "-print_format", "json", "-show_streams", path])
            .output()
            .await?;

        if !output.status.success() {
            return Err(Error::Probe {
                path: path.to_string(),
                reason: format!("ffprobe exited with {}", output.status),
            });
        }

        let parsed: ProbeOutput =
            serde_json::from_slice(&output.stdout).map_err(|e| Error::Probe {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        Ok(parsed.streams)
    }
}

/// Choose the video and audio stream indices for playout
///
/// Audio preference order: a stream tagged with the configured language using
/// an approved codec, then any stream in the configured language, then the
/// first audio stream, then the fixed fallback index. Video: the first
/// video-typed stream, else the fixed fallback index. Falling back is logged
/// as an error but never blocks playback.
pub fn select_tracks(streams: &[ProbeStream], language: &str) -> TrackSelection {
    let video_index = match streams.iter().find(|s| s.codec_type == "video") {
        Some(stream) => stream.index,
        None => {
            tracing::error!(
                fallback = FALLBACK_VIDEO_INDEX,
                "no video stream found; using fallback index"
            );
            FALLBACK_VIDEO_INDEX
        }
    };

    let audio_index = match audio_preference(streams, language) {
        Some(index) => index,
        None => {
            tracing::error!(
                fallback = FALLBACK_AUDIO_INDEX,
                "no audio stream found; using fallback index"
            );
            FALLBACK_AUDIO_INDEX
        }
    };

    TrackSelection {
        video_index,
        audio_index,
    }
}

fn audio_preference(streams: &[ProbeStream], language: &str) -> Option<u32> {
    let mut language_match: Option<u32> = None;
    let mut first_audio: Option<u32> = None;

    for stream in streams {
        if stream.codec_type != "audio" {
            continue;
        }
        if first_audio.is_none() {
            first_audio = Some(stream.index);
        }
        if stream.tags.language.as_deref() == Some(language) {
            if language_match.is_none() {
                language_match = Some(stream.index);
            }
            let approved = stream
                .codec_name
                .as_deref()
                .is_some_and(|codec| APPROVED_AUDIO_CODECS.contains(&codec));
            if approved {
                return Some(stream.index);
            }
        }
    }

    language_match.or(first_audio)
}
