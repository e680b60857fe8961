//! Control loop: computes lookahead and records actual timing
//!
//! The loop starts by finding what should be on the air right now (joining
//! mid-entry with a skip offset, or sleeping until the first future entry),
//! then settles into steady state: drain completion events into the store,
//! keep exactly one item of lookahead queued, and attach a wait instruction
//! whenever the plan contains a deliberate gap. An empty schedule in steady
//! state is a back-off, not an exit; the builder may extend the grid while
//! we run.

use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::PlayoutConfig;
use crate::error::{Error, Result};
use crate::models::ScheduleEntry;
use crate::playout::playback::{PlayRequest, PlaybackEvent};
use crate::playout::probe::{select_tracks, MediaProber, TrackSelection};
use crate::storage::ScheduleStore;

/// Back-off while the playback task still holds the queued item
const QUEUE_BACKOFF: Duration = Duration::from_secs(5);

/// Back-off when the schedule has nothing after the current entry
const EMPTY_BACKOFF: Duration = Duration::from_secs(10);

/// The foreground loop that drives the playback task
pub struct ControlLoop {
    store: ScheduleStore,
    prober: MediaProber,
    config: PlayoutConfig,
    work_tx: mpsc::Sender<PlayRequest>,
    events_rx: mpsc::UnboundedReceiver<PlaybackEvent>,
    stop: CancellationToken,
}

impl ControlLoop {
    pub fn new(
        store: ScheduleStore,
        prober: MediaProber,
        config: PlayoutConfig,
        work_tx: mpsc::Sender<PlayRequest>,
        events_rx: mpsc::UnboundedReceiver<PlaybackEvent>,
        stop: CancellationToken,
    ) -> Self {
        Self {
            store,
            prober,
            config,
            work_tx,
            events_rx,
            stop,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let now = Local::now().naive_local();
        let Some(first) = self.initial_entry(now)? else {
            tracing::warn!("nothing in the schedule; stopping playout");
            return Ok(());
        };

        if first.start_time > now {
            let gap = (first.start_time - now).to_std().unwrap_or(Duration::ZERO);
            tracing::info!(
                secs = gap.as_secs(),
                title = %first.title,
                "waiting for the first scheduled entry"
            );
            tokio::select! {
                _ = tokio::time::sleep(gap) => {}
                _ = self.stop.cancelled() => return Ok(()),
            }
        }

        let skip = skip_offset(Local::now().naive_local(), first.start_time);
        self.enqueue(&first, skip, None).await?;
        let mut previous = first;

        loop {
            if self.stop.is_cancelled() {
                break;
            }
            self.drain_events()?;

            if self.work_tx.capacity() == 0 {
                self.pause(QUEUE_BACKOFF).await;
                continue;
            }

            let Some(next) = self.store.next_playable_after(previous.start_time)? else {
                tracing::debug!("no further schedule entries yet");
                self.pause(EMPTY_BACKOFF).await;
                continue;
            };

            // A planned gap is slept out by the playback task, not collapsed
            let wait_until = (next.start_time != previous.end_time).then_some(next.start_time);
            self.enqueue(&next, None, wait_until).await?;
            previous = next;
        }

        self.drain_events()?;
        tracing::info!("control loop stopped");
        Ok(())
    }

    /// The entry covering `now`, or the next playable one after it
    fn initial_entry(&self, now: NaiveDateTime) -> Result<Option<ScheduleEntry>> {
        if let Some(entry) = self.store.entry_covering(now)? {
            return Ok(Some(entry));
        }
        self.store.next_playable_at_or_after(now)
    }

    /// Persist observed timing from the playback task
    fn drain_events(&mut self) -> Result<()> {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                PlaybackEvent::Started { entry_id, at } => {
                    tracing::debug!(entry_id, at = %at, "entry started");
                    self.store.record_actual_start(entry_id, at)?;
                }
                PlaybackEvent::Completed { entry_id, at } => {
                    tracing::debug!(entry_id, at = %at, "entry completed");
                    self.store.record_actual_end(entry_id, at)?;
                }
            }
        }
        Ok(())
    }

    async fn enqueue(
        &mut self,
        entry: &ScheduleEntry,
        skip_offset: Option<i64>,
        wait_until: Option<NaiveDateTime>,
    ) -> Result<()> {
        let Some(path) = entry.path.clone() else {
            return Ok(());
        };

        let tracks = self.resolve_tracks(&path).await;
        let request = PlayRequest {
            entry_id: entry.id,
            path,
            title: entry.title.clone(),
            skip_offset,
            wait_until,
            scheduled_start: entry.start_time,
            video_index: tracks.video_index,
            audio_index: tracks.audio_index,
        };
        tracing::debug!(
            entry_id = entry.id,
            title = %entry.title,
            skip_offset = ?skip_offset,
            wait_until = ?wait_until,
            "queued entry for playback"
        );
        self.work_tx
            .send(request)
            .await
            .map_err(|_| Error::QueueClosed)
    }

    async fn resolve_tracks(&self, path: &str) -> TrackSelection {
        match self.prober.probe(path).await {
            Ok(streams) => select_tracks(&streams, &self.config.audio_lang),
            Err(e) => {
                tracing::error!(
                    path = %path,
                    error = %e,
                    "probe failed; using fallback stream indices"
                );
                TrackSelection::fallback()
            }
        }
    }

    async fn pause(&self, how_long: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(how_long) => {}
            _ = self.stop.cancelled() => {}
        }
    }
}

/// Seconds into the media when joining an entry already in progress
pub fn skip_offset(now: NaiveDateTime, planned_start: NaiveDateTime) -> Option<i64> {
    let elapsed = (now - planned_start).num_seconds();
    (elapsed > 0).then_some(elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as TimeDelta, NaiveDate};

    fn ts(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_skip_offset_mid_entry() {
        // Joining ten minutes into a running entry
        let start = ts(12, 0);
        let now = start + TimeDelta::minutes(10);
        assert_eq!(skip_offset(now, start), Some(600));
    }

    #[test]
    fn test_skip_offset_absent_when_on_time() {
        let start = ts(12, 0);
        assert_eq!(skip_offset(start, start), None);
        assert_eq!(skip_offset(start - TimeDelta::seconds(30), start), None);
    }
}
