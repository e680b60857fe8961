use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use telecast::commands;
use telecast::config::Config;

#[derive(Parser)]
#[command(
    name = "telecast",
    version,
    about = "Linear broadcast channel automation: schedule building and real-time playout",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the catalog and schedule database
    InitDb,

    /// Build the programming grid for a day
    Build {
        /// Day to build (YYYY-MM-DD); defaults to tomorrow
        #[arg(short, long)]
        day: Option<NaiveDate>,

        /// Simulate the build without writing anything
        #[arg(long, default_value = "false")]
        dry_run: bool,
    },

    /// Play the schedule out to the streaming destination
    Play,

    /// Shift future entries against observed playout drift
    Adjust,

    /// Delete schedule entries past the retention horizon
    Purge {
        /// Retention window in days (overrides the configured value)
        #[arg(short, long)]
        days: Option<u32>,

        /// Count matching entries without deleting them
        #[arg(long, default_value = "false")]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    let config = Config::from_env()?;

    match cli.command {
        Commands::InitDb => {
            tracing::info!("Starting init-db command");
            commands::init_db(&config).await?;
        }

        Commands::Build { day, dry_run } => {
            tracing::info!(day = ?day, dry_run = %dry_run, "Starting build command");
            commands::build(&config, day, dry_run).await?;
        }

        Commands::Play => {
            tracing::info!("Starting play command");
            commands::play(&config).await?;
        }

        Commands::Adjust => {
            tracing::info!("Starting adjust command");
            commands::adjust(&config).await?;
        }

        Commands::Purge { days, dry_run } => {
            tracing::info!(days = ?days, dry_run = %dry_run, "Starting purge command");
            commands::purge(&config, days, dry_run).await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("telecast=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("telecast=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
