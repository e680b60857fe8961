//! Retention trimming of old schedule entries

use chrono::{Duration, Local, NaiveDateTime};

use crate::error::Result;
use crate::storage::ScheduleStore;

/// Result of a purge pass
#[derive(Debug)]
pub struct PurgeReport {
    pub cutoff: NaiveDateTime,
    pub entries: usize,
    pub dry_run: bool,
}

/// Purge entries that ended more than `retention_days` ago
pub fn purge_older_than(
    store: &ScheduleStore,
    retention_days: u32,
    dry_run: bool,
) -> Result<PurgeReport> {
    let cutoff = Local::now().naive_local() - Duration::days(i64::from(retention_days));
    purge_before(store, cutoff, dry_run)
}

/// Purge entries whose planned end precedes `cutoff`
pub fn purge_before(
    store: &ScheduleStore,
    cutoff: NaiveDateTime,
    dry_run: bool,
) -> Result<PurgeReport> {
    let entries = if dry_run {
        store.count_ended_before(cutoff)?
    } else {
        store.delete_ended_before(cutoff)?
    };

    tracing::info!(cutoff = %cutoff, entries, dry_run, "purge pass finished");
    Ok(PurgeReport {
        cutoff,
        entries,
        dry_run,
    })
}
