use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::playout;
use crate::storage::Database;

/// Run the playout engine against the live clock
///
/// Runs until the schedule is empty at startup or an interrupt arrives; the
/// interrupt cooperatively terminates any in-flight stream process.
pub async fn play(config: &Config) -> Result<()> {
    println!("Starting playout to {}", config.playout.rtmp_url);

    let db = Database::open(&config.database.sqlite_path).context("Failed to open database")?;
    let stop = CancellationToken::new();

    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received; stopping playout");
                stop.cancel();
            }
        });
    }

    playout::run(&db, &config.playout, stop)
        .await
        .context("Playout engine failed")?;

    println!("Playout finished");
    Ok(())
}
