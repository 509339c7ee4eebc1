//! Operator CLI for the travel planner.
//!
//! # Responsibility
//! - Probe core linkage (`ping`).
//! - Create or upgrade the database schema (`migrate`).
//! - Ingest the artwork catalog as places (`fetch-places`).

mod catalog_http;

use anyhow::{Context, Result};
use catalog_http::HttpCatalogSource;
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use travelplan_core::db::{migrations::latest_version, open_db};
use travelplan_core::{
    first_page_url, ingest_catalog, init_logging, AppConfig, PlaceService, SqlitePlaceRepository,
};
use travelplan_core::ingest::MAX_PAGE_LIMIT;

#[derive(Debug, Parser)]
#[command(name = "travelplan", version, about = "Travel planner maintenance commands")]
struct Cli {
    /// Database file; overrides TRAVELPLAN_DB_PATH.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Prints core health and version.
    Ping,
    /// Applies pending schema migrations.
    Migrate,
    /// Fetches the artwork catalog and stores each artwork as a place.
    FetchPlaces {
        /// Catalog search endpoint; overrides TRAVELPLAN_CATALOG_URL.
        #[arg(long)]
        url: Option<String>,
        /// Page size, 1..=100; overrides TRAVELPLAN_CATALOG_PAGE_LIMIT.
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_PAGE_LIMIT)))]
        limit: Option<u32>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::from_env().context("invalid configuration")?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, &log_dir.to_string_lossy())
            .context("failed to initialize logging")?;
    }

    match cli.command {
        Command::Ping => {
            println!("travelplan_core ping={}", travelplan_core::ping());
            println!("travelplan_core version={}", travelplan_core::core_version());
        }
        Command::Migrate => {
            open_db(&config.db_path)
                .with_context(|| format!("failed to open {}", config.db_path.display()))?;
            println!(
                "schema at version {} in {}",
                latest_version(),
                config.db_path.display()
            );
        }
        Command::FetchPlaces { url, limit } => {
            let base = url.unwrap_or(config.catalog_url);
            let start = first_page_url(&base, limit.unwrap_or(config.catalog_page_limit));
            let conn = open_db(&config.db_path)
                .with_context(|| format!("failed to open {}", config.db_path.display()))?;
            let places = PlaceService::new(SqlitePlaceRepository::try_new(&conn)?);
            let source = HttpCatalogSource::new().context("failed to build HTTP client")?;

            info!("event=fetch_places module=cli status=start");
            match ingest_catalog(&source, &places, &start) {
                Ok(report) => println!(
                    "All pages processed: pages={} fetched={} created={} existing={} skipped={}",
                    report.pages, report.fetched, report.created, report.existing, report.skipped
                ),
                Err(failure) => {
                    eprintln!(
                        "Stopped after {} page(s), created={}",
                        failure.partial.pages, failure.partial.created
                    );
                    return Err(failure.into());
                }
            }
        }
    }
    Ok(())
}
