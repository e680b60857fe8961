//! Playback task: owns the single streaming child process
//!
//! At most one transcode process exists at a time; that is the hard
//! concurrency ceiling of a single-output channel. The task dequeues one item,
//! sleeps out any planned gap, emits a started event, then blocks until the
//! child exits. Shutdown is cooperative: the stop token terminates the child
//! and the completion event for the interrupted item is suppressed.

use std::process::Stdio;
use std::time::Duration;

use chrono::{Duration as TimeDelta, Local, NaiveDateTime};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::PlayoutConfig;

/// Lead time beyond which a dequeued item is treated as a drift anomaly
const DRIFT_ANOMALY_SECS: i64 = 3_600;

/// How long a dequeue blocks before the stop flag is re-checked
const DEQUEUE_TIMEOUT: Duration = Duration::from_secs(5);

/// One item of playout work, produced by the control loop
#[derive(Debug, Clone)]
pub struct PlayRequest {
    pub entry_id: i64,
    pub path: String,
    pub title: String,
    /// Seconds into the media when joining an entry already in progress
    pub skip_offset: Option<i64>,
    /// Sleep until this instant before playing (planned schedule gap)
    pub wait_until: Option<NaiveDateTime>,
    pub scheduled_start: NaiveDateTime,
    pub video_index: u32,
    pub audio_index: u32,
}

/// Timing observed by the playback task, consumed by the control loop
#[derive(Debug, Clone, Copy)]
pub enum PlaybackEvent {
    Started { entry_id: i64, at: NaiveDateTime },
    Completed { entry_id: i64, at: NaiveDateTime },
}

/// The background task that feeds the streaming destination
pub struct PlaybackTask {
    config: PlayoutConfig,
    work_rx: mpsc::Receiver<PlayRequest>,
    events_tx: mpsc::UnboundedSender<PlaybackEvent>,
    stop: CancellationToken,
}

impl PlaybackTask {
    pub fn new(
        config: PlayoutConfig,
        work_rx: mpsc::Receiver<PlayRequest>,
        events_tx: mpsc::UnboundedSender<PlaybackEvent>,
        stop: CancellationToken,
    ) -> Self {
        Self {
            config,
            work_rx,
            events_tx,
            stop,
        }
    }

    pub async fn run(mut self) {
        while !self.stop.is_cancelled() {
            let request = match tokio::time::timeout(DEQUEUE_TIMEOUT, self.work_rx.recv()).await {
                Err(_) => continue,
                Ok(None) => break,
                Ok(Some(request)) => request,
            };
            self.play(request).await;
        }
        tracing::debug!("playback task stopped");
    }

    async fn play(&mut self, request: PlayRequest) {
        let now = Local::now().naive_local();
        let mut wait_until = request.wait_until;

        // An item scheduled far in the future should never free-run now
        if request.scheduled_start - now > TimeDelta::seconds(DRIFT_ANOMALY_SECS) {
            tracing::error!(
                entry_id = request.entry_id,
                scheduled_start = %request.scheduled_start,
                "scheduled start is over an hour away; waiting instead of playing"
            );
            wait_until = Some(request.scheduled_start);
        }

        if let Some(until) = wait_until {
            let now = Local::now().naive_local();
            if until > now {
                let gap = (until - now).to_std().unwrap_or(Duration::ZERO);
                tracing::info!(
                    entry_id = request.entry_id,
                    secs = gap.as_secs(),
                    "waiting out a schedule gap"
                );
                tokio::select! {
                    _ = tokio::time::sleep(gap) => {}
                    _ = self.stop.cancelled() => return,
                }
            }
        }

        let _ = self.events_tx.send(PlaybackEvent::Started {
            entry_id: request.entry_id,
            at: Local::now().naive_local(),
        });

        tracing::info!(
            entry_id = request.entry_id,
            title = %request.title,
            path = %request.path,
            "playing"
        );

        let mut child = match self.stream_command(&request).spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    path = %request.path,
                    "failed to spawn the stream process"
                );
                let _ = self.events_tx.send(PlaybackEvent::Completed {
                    entry_id: request.entry_id,
                    at: Local::now().naive_local(),
                });
                return;
            }
        };

        tokio::select! {
            status = child.wait() => {
                match status {
                    Ok(status) if !status.success() => {
                        tracing::warn!(
                            entry_id = request.entry_id,
                            %status,
                            "stream process exited with failure"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(
                            entry_id = request.entry_id,
                            error = %e,
                            "could not collect the stream process"
                        );
                    }
                    _ => {}
                }
                let _ = self.events_tx.send(PlaybackEvent::Completed {
                    entry_id: request.entry_id,
                    at: Local::now().naive_local(),
                });
            }
            _ = self.stop.cancelled() => {
                if let Err(e) = child.start_kill() {
                    tracing::warn!(error = %e, "failed to terminate the stream process");
                }
                let _ = child.wait().await;
            }
        }
    }

    /// Build the transcode invocation for one item
    ///
    /// The output profile is fixed: fit and pad to the configured frame size,
    /// constant output rate, mono AAC audio, FLV to the streaming target. The
    /// selected stream indices are mapped explicitly.
    fn stream_command(&self, request: &PlayRequest) -> Command {
        let width = self.config.output_width;
        let height = self.config.output_height;
        let scale = format!(
            "scale={width}:{height}:force_original_aspect_ratio=decrease,\
             pad={width}:{height}:(ow-iw)/2:(oh-ih)/2,setsar=1,format=yuv420p"
        );

        let mut cmd = Command::new(&self.config.ffmpeg_path);
        cmd.arg("-re");
        if let Some(skip) = request.skip_offset {
            cmd.args(["-ss", &skip.to_string()]);
        }
        cmd.args(["-i", &request.path]);

        if let Some(watermark) = &self.config.watermark {
            cmd.arg("-i").arg(watermark);
            cmd.args([
                "-filter_complex",
                &format!(
                    "[0:{video}]{scale}[base];\
                     [base][1:v]overlay=main_w-overlay_w-24:24[vout]",
                    video = request.video_index
                ),
            ]);
            cmd.args(["-map", "[vout]"]);
        } else {
            cmd.args(["-map", &format!("0:{}", request.video_index)]);
            cmd.args(["-vf", &scale]);
        }
        cmd.args(["-map", &format!("0:{}", request.audio_index)]);

        cmd.args([
            "-c:v",
            "h264_nvenc",
            "-pix_fmt",
            "yuv420p",
            "-r",
            "30000/1001",
            "-c:a",
            "aac",
            "-ar",
            "44100",
            "-b:a",
            "256k",
            "-ac",
            "1",
            "-f",
            "flv",
        ]);
        cmd.arg(&self.config.rtmp_url);

        cmd.stdout(Stdio::null()).stderr(Stdio::null());
        cmd.kill_on_drop(true);
        cmd
    }
}
