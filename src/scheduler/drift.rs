//! Post-hoc correction of planned times against observed playout drift
//!
//! The transcoder never finishes exactly on the planned second. After each
//! completion the future timeline can be re-anchored to what actually
//! happened on the wire: every not-yet-started entry that sits flush against
//! the completed entry is shifted by the observed delta. A gap that was
//! planned on purpose (a buffer before a live slot, say) marks the end of
//! the contiguous chain and is never collapsed.

use crate::error::Result;
use crate::storage::ScheduleStore;

/// Result of a drift adjustment pass
#[derive(Debug)]
pub struct DriftReport {
    /// Observed delta in seconds (actual end minus planned end)
    pub offset_secs: i64,
    /// Entries whose planned window was shifted
    pub shifted: usize,
}

impl DriftReport {
    fn noop() -> Self {
        Self {
            offset_secs: 0,
            shifted: 0,
        }
    }
}

/// Shift future, not-yet-started entries by the most recent completion's drift
///
/// The chain walks entries in chronological order starting from the completed
/// entry's planned end, and stops at the first entry whose planned start does
/// not immediately follow the previous planned end. Contiguity is judged on
/// the pre-shift values, so running the pass twice without a new completion
/// is a no-op: the first pass leaves a gap right behind the completed entry.
pub fn adjust_future_times(store: &ScheduleStore) -> Result<DriftReport> {
    let Some(last) = store.last_completed()? else {
        tracing::debug!("no completed entries; nothing to adjust");
        return Ok(DriftReport::noop());
    };
    let Some(actual_end) = last.actual_end_time else {
        return Ok(DriftReport::noop());
    };

    let offset = actual_end - last.end_time;
    if offset.is_zero() {
        tracing::debug!(entry_id = last.id, "playout is on plan; nothing to adjust");
        return Ok(DriftReport::noop());
    }

    let mut expected_start = last.end_time;
    let mut shifted = 0;
    for entry in store.entries_from(last.end_time)? {
        if entry.start_time != expected_start {
            break;
        }
        expected_start = entry.end_time;
        if entry.started() {
            continue;
        }
        store.shift_entry(entry.id, entry.start_time + offset, entry.end_time + offset)?;
        shifted += 1;
    }

    tracing::info!(
        offset_secs = offset.num_seconds(),
        shifted,
        "adjusted future entries for drift"
    );
    Ok(DriftReport {
        offset_secs: offset.num_seconds(),
        shifted,
    })
}
