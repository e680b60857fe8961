use anyhow::{Context, Result};

use crate::config::Config;
use crate::scheduler::{adjust_future_times, purge_older_than};
use crate::storage::Database;

/// Create (or migrate) the catalog and schedule database
pub async fn init_db(config: &Config) -> Result<()> {
    let db = Database::open(&config.database.sqlite_path).context("Failed to open database")?;
    drop(db);
    println!("Database ready at {}", config.database.sqlite_path.display());
    Ok(())
}

/// Re-anchor future entries against observed playout drift
pub async fn adjust(config: &Config) -> Result<()> {
    println!("Adjusting future schedule times");

    let db = Database::open(&config.database.sqlite_path).context("Failed to open database")?;
    let report = adjust_future_times(&db.schedule()).context("Drift adjustment failed")?;

    if report.shifted == 0 {
        println!("Nothing to adjust");
    } else {
        println!(
            "Shifted {} entries by {}s",
            report.shifted, report.offset_secs
        );
    }
    Ok(())
}

/// Trim schedule entries past the retention horizon
pub async fn purge(config: &Config, days: Option<u32>, dry_run: bool) -> Result<()> {
    let days = days.unwrap_or(config.channel.retention_days);
    println!("Purging schedule entries older than {days} day(s)");

    let db = Database::open(&config.database.sqlite_path).context("Failed to open database")?;
    let report = purge_older_than(&db.schedule(), days, dry_run).context("Purge failed")?;

    if dry_run {
        println!("{} entries would be removed", report.entries);
    } else {
        println!("Removed {} entries", report.entries);
    }
    Ok(())
}
