use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate};

use crate::config::Config;
use crate::error::Error;
use crate::scheduler::{BuilderOptions, ScheduleBuilder};
use crate::storage::Database;

/// Build the programming grid for one day
pub async fn build(config: &Config, day: Option<NaiveDate>, dry_run: bool) -> Result<()> {
    let day = day.unwrap_or_else(|| (Local::now() + Duration::days(1)).date_naive());

    println!("Building schedule for {day}");
    if dry_run {
        println!("  (dry run: nothing will be written)");
    }

    let db = Database::open(&config.database.sqlite_path).context("Failed to open database")?;
    let mut builder = ScheduleBuilder::new(&db, BuilderOptions::from(&config.channel));

    match builder.build(day, dry_run) {
        Ok(report) => {
            println!("Placed {} entries", report.entries);
            if let Some(end) = report.last_end {
                println!("Schedule now runs through {end}");
            }
        }
        Err(Error::AlreadyScheduled { day }) => {
            println!("Scheduled items already exist for {day}");
        }
        Err(e) => return Err(e).context("Schedule build failed"),
    }

    Ok(())
}
