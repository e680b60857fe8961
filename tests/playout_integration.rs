//! Integration tests for the playout engine
//!
//! The stream process is stood in for by `true`, and probing is pointed at a
//! nonexistent ffprobe so the fallback path is exercised. Everything else is
//! the real control loop and playback task against an in-memory store.

#![cfg(unix)]

mod common;

use std::path::PathBuf;
use std::time::Duration as StdDuration;

use chrono::{Duration, Local};
use telecast::config::PlayoutConfig;
use telecast::models::EntryTag;
use telecast::playout::{self, ControlLoop, MediaProber, PlaybackEvent};
use telecast::storage::Database;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use common::insert_entry;

fn test_playout_config(ffmpeg: &str) -> PlayoutConfig {
    PlayoutConfig {
        ffmpeg_path: PathBuf::from(ffmpeg),
        ffprobe_path: PathBuf::from("/nonexistent/ffprobe"),
        rtmp_url: String::from("rtmp://localhost/live/test"),
        audio_lang: String::from("eng"),
        output_width: 1920,
        output_height: 1080,
        watermark: None,
    }
}

#[tokio::test]
async fn test_control_loop_joins_mid_entry_with_skip_offset() {
    let db = Database::in_memory().unwrap();
    let now = Local::now().naive_local();
    // On the air for ten minutes already, fifty more to go
    let entry_id = insert_entry(
        &db,
        EntryTag::TvEpisode,
        "Running S1 E1",
        now - Duration::minutes(10),
        3600,
        Some("/dev/null"),
    );

    let (work_tx, mut work_rx) = mpsc::channel(1);
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let stop = CancellationToken::new();
    let control = ControlLoop::new(
        db.schedule(),
        MediaProber::new("/nonexistent/ffprobe"),
        test_playout_config("true"),
        work_tx,
        events_rx,
        stop.clone(),
    );
    let handle = tokio::spawn(control.run());

    let request = tokio::time::timeout(StdDuration::from_secs(10), work_rx.recv())
        .await
        .expect("control loop never queued the running entry")
        .expect("work queue closed");

    assert_eq!(request.entry_id, entry_id);
    assert!(
        (599..=605).contains(&request.skip_offset.unwrap()),
        "skip offset was {:?}",
        request.skip_offset
    );
    // Probe failure degraded to the fixed fallback indices
    assert_eq!(request.video_index, 0);
    assert_eq!(request.audio_index, 1);
    assert!(request.wait_until.is_none());

    // Timing events sent before shutdown are still persisted on the way out
    let started_at = Local::now().naive_local();
    events_tx
        .send(PlaybackEvent::Started {
            entry_id,
            at: started_at,
        })
        .unwrap();
    stop.cancel();
    handle.await.unwrap().unwrap();

    let stored = db.schedule().entry(entry_id).unwrap().unwrap();
    assert_eq!(stored.actual_start_time, Some(started_at));
    assert!(!stored.completed);
}

#[tokio::test]
async fn test_engine_records_actual_timing() {
    let db = Database::in_memory().unwrap();
    let now = Local::now().naive_local();
    let entry_id = insert_entry(
        &db,
        EntryTag::TvEpisode,
        "Live S1 E1",
        now - Duration::minutes(10),
        3600,
        Some("/dev/null"),
    );

    let stop = CancellationToken::new();
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            tokio::time::sleep(StdDuration::from_millis(1500)).await;
            stop.cancel();
        });
    }

    let config = test_playout_config("true");
    tokio::time::timeout(StdDuration::from_secs(30), playout::run(&db, &config, stop))
        .await
        .expect("engine did not stop on cancellation")
        .unwrap();

    let stored = db.schedule().entry(entry_id).unwrap().unwrap();
    assert!(stored.actual_start_time.is_some(), "no actual start recorded");
    assert!(stored.actual_end_time.is_some(), "no actual end recorded");
    assert!(stored.completed);
}

#[tokio::test]
async fn test_engine_exits_on_empty_schedule() {
    let db = Database::in_memory().unwrap();
    let config = test_playout_config("true");
    let stop = CancellationToken::new();

    tokio::time::timeout(StdDuration::from_secs(10), playout::run(&db, &config, stop))
        .await
        .expect("engine kept running with nothing scheduled")
        .unwrap();
}
