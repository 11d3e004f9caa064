use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use storyline::config::{GeneratorConfig, PipelineConfig};
use storyline::db::Database;
use storyline::environment::get_env_var;
use storyline::llm::{LlmGenerator, TextGenerator};
use storyline::logging::configure_logging;
use storyline::pipeline::Pipeline;

#[derive(Parser)]
#[clap(name = "storyline", about = "Group unlinked news into events")]
struct Cli {
    /// SQLite database file (defaults to DATABASE_PATH or storyline.db)
    #[clap(long)]
    database: Option<String>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Link unlinked news to recent events and synthesize new events from the rest
    Run {
        /// Minimum number of news items per new event
        #[clap(long)]
        min_news_count: Option<usize>,

        /// Width of the grouping window in hours
        #[clap(long)]
        time_window_hours: Option<i64>,

        /// Maximum number of unlinked news to process (0 for all)
        #[clap(long)]
        max_news: Option<usize>,

        /// Skip the text-generation endpoint even when credentials are set
        #[clap(long)]
        heuristic_only: bool,
    },

    /// Print event and linkage counters as JSON
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    configure_logging();

    let cli = Cli::parse();

    let db_path = cli
        .database
        .or_else(|| get_env_var("DATABASE_PATH"))
        .unwrap_or_else(|| "storyline.db".to_string());
    let db = Database::new(&db_path)
        .await
        .with_context(|| format!("Failed to open database '{}'", db_path))?;

    match cli.command {
        Commands::Run {
            min_news_count,
            time_window_hours,
            max_news,
            heuristic_only,
        } => {
            let mut config = PipelineConfig::from_env()?;
            if let Some(count) = min_news_count {
                config = config.with_min_news_count(count);
            }
            if let Some(hours) = time_window_hours {
                config = config.with_time_window_hours(hours);
            }
            if let Some(limit) = max_news {
                config = config.with_max_news_limit(limit);
            }
            config.validate()?;

            let generator: Option<Arc<dyn TextGenerator>> = if heuristic_only {
                None
            } else {
                let generator_config = GeneratorConfig::from_env()?;
                match LlmGenerator::from_config(&generator_config) {
                    Some(generator) => {
                        info!("Using {} for event synthesis", generator.describe());
                        Some(Arc::new(generator))
                    }
                    None => {
                        warn!("No generation credentials configured, using heuristic synthesis");
                        None
                    }
                }
            };

            let (cancel_tx, cancel_rx) = watch::channel(false);
            tokio::spawn(async move {
                if signal::ctrl_c().await.is_err() {
                    error!("Failed to listen for ctrl-c");
                    return;
                }
                info!("Ctrl-c received, finishing the current group");
                let _ = cancel_tx.send(true);
            });

            let pipeline = Pipeline::new(db, config, generator);
            let stats = pipeline.run(&cancel_rx).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Stats => {
            let lookback_days = PipelineConfig::from_env()?.event_lookback_days;
            let stats = db.generation_statistics(Utc::now(), lookback_days).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
