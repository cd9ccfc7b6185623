//! SQLite linkage demo server.
//!
//! Opens an SQLite database (in-memory by default) to prove the bundled
//! native library works inside the container, then answers every request
//! with a fixed confirmation. The database is closed when the listener stops.

use std::path::PathBuf;

use clap::Parser;

use shipshape::config::{AppConfig, LoggingConfig, Profile};
use shipshape::db::Database;
use shipshape::http::start_server;
use shipshape::logging;
use shipshape::routes::create_sqlite_router;

/// Minimal HTTP server linked against a bundled SQLite
#[derive(Parser, Debug)]
#[command(name = "sqlite-server", version, about)]
struct Args {
    /// Path to an optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level filter (e.g., "shipshape=debug")
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let log_filter = logging::resolve_filter(args.log_level);

    let config = match AppConfig::load(args.config.as_deref(), Profile::Sqlite) {
        Ok(config) => config,
        Err(e) => {
            logging::init(&log_filter, &LoggingConfig::default(), None);
            tracing::error!(error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };
    logging::init(&log_filter, &config.logging, None);

    let db = Database::open(&config.database.location)
        .inspect_err(|e| tracing::error!(error = %e, "Failed to open database"))?;
    tracing::info!(
        location = %db.location(),
        version = %db.sqlite_version(),
        "SQLite database ready"
    );

    let result = start_server(create_sqlite_router(), &config.http)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Server failed"));

    if let Err(e) = db.close() {
        tracing::error!(error = %e, "Failed to close database");
    }

    Ok(result?)
}
