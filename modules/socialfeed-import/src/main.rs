use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use socialfeed_common::{Config, Platform};
use socialfeed_import::{ImportScheduler, ImportService, ImportSettings, InMemoryStore, PgStore};
use socialfeed_providers::ProviderRegistry;

#[derive(Parser)]
#[command(name = "socialfeed", about = "Import posts from social media platforms")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import the latest posts once
    Import {
        /// twitter, instagram, facebook, linkedin or all
        #[arg(long, default_value = "all")]
        platform: String,
    },

    /// Import from every platform on a fixed interval until interrupted
    Schedule {
        /// Seconds between runs
        #[arg(long, default_value_t = 3600, value_parser = clap::value_parser!(u64).range(1..))]
        every: u64,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("socialfeed=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// `all` (or empty) means no filter.
fn parse_platform(raw: &str) -> Result<Option<Platform>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    Ok(Some(raw.parse()?))
}

async fn build_service(config: &Config) -> Result<ImportService> {
    let registry = ProviderRegistry::from_config(config).context("Failed to build platform providers")?;
    let settings = ImportSettings::from(config);

    let service = match config.database_url.as_deref() {
        Some(url) => {
            let store = Arc::new(
                PgStore::connect(url)
                    .await
                    .context("Failed to connect to Postgres")?,
            );
            ImportService::new(registry, store.clone(), store.clone(), store, settings)
        }
        None => {
            warn!("DATABASE_URL not set, imported posts are kept in memory only");
            let store = Arc::new(InMemoryStore::new());
            ImportService::new(registry, store.clone(), store.clone(), store, settings)
        }
    };
    Ok(service)
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env()?;

    match cli.command {
        Commands::Import { platform } => {
            let platform = parse_platform(&platform)?;
            let service = build_service(&config).await?;

            let started = Instant::now();
            let count = service.import_posts(platform).await?;
            let from = platform.map(|p| format!(" from {p}")).unwrap_or_default();
            println!(
                "Successfully imported {count} social media posts{from} in {:.2} seconds",
                started.elapsed().as_secs_f64()
            );
        }
        Commands::Schedule { every } => {
            let service = Arc::new(build_service(&config).await?);
            let (shutdown_tx, shutdown_rx) = watch::channel(false);

            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!(error = %e, "Failed to listen for shutdown signal");
                }
                info!("Shutdown requested");
                let _ = shutdown_tx.send(true);
            });

            ImportScheduler::new(service, Duration::from_secs(every))
                .run(shutdown_rx)
                .await;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Failed to import social media posts: {e:#}");
            ExitCode::FAILURE
        }
    }
}
