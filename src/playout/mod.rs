//! Real-time playout of the schedule
//!
//! Two concurrent units execute the grid:
//!
//! - [`control`] - polls the schedule store, computes one item of lookahead,
//!   and records actual timing as completion events arrive
//! - [`playback`] - owns at most one external streaming process at a time
//!
//! They communicate over two one-directional queues. The work queue has
//! capacity one, which is what keeps the lookahead at a single item: the next
//! entry is only queued after the playback task has taken the previous one,
//! so schedule edits made while an item plays still take effect. A shared
//! cancellation token is the stop flag for both units.

pub mod control;
pub mod playback;
pub mod probe;

pub use control::{skip_offset, ControlLoop};
pub use playback::{PlayRequest, PlaybackEvent, PlaybackTask};
pub use probe::{select_tracks, MediaProber, ProbeStream, TrackSelection};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::PlayoutConfig;
use crate::error::Result;
use crate::storage::Database;

/// Run the playout engine until the schedule runs dry or `stop` fires
pub async fn run(db: &Database, config: &PlayoutConfig, stop: CancellationToken) -> Result<()> {
    let (work_tx, work_rx) = mpsc::channel(1);
    let (events_tx, events_rx) = mpsc::unbounded_channel();

    let playback = PlaybackTask::new(config.clone(), work_rx, events_tx, stop.clone());
    let playback_handle = tokio::spawn(playback.run());

    let control = ControlLoop::new(
        db.schedule(),
        MediaProber::new(config.ffprobe_path.clone()),
        config.clone(),
        work_tx,
        events_rx,
        stop.clone(),
    );
    let result = control.run().await;

    // The control loop is done (empty schedule, interrupt, or error); wind
    // down the playback task and whatever child it may still hold
    stop.cancel();
    let _ = playback_handle.await;

    result
}
