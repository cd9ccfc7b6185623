//! Production demo server.
//!
//! Serves a plain-text banner, a `/health` liveness probe for container
//! orchestration, and `/debug/pprof/` profiling routes, all on one listener
//! with read, write and idle timeouts.

use std::path::PathBuf;

use clap::Parser;

use shipshape::config::{AppConfig, LoggingConfig, Profile};
use shipshape::http::start_server;
use shipshape::logging;
use shipshape::profiling::TraceRecorder;
use shipshape::routes::create_production_router;
use shipshape::state::AppState;

/// Production-style HTTP server with health check and profiling routes
#[derive(Parser, Debug)]
#[command(name = "prod-server", version, about)]
struct Args {
    /// Path to an optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level filter (e.g., "shipshape=debug,prod_server=debug")
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let log_filter = logging::resolve_filter(args.log_level);

    let config = match AppConfig::load(args.config.as_deref(), Profile::Production) {
        Ok(config) => config,
        Err(e) => {
            logging::init(&log_filter, &LoggingConfig::default(), None);
            tracing::error!(error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };

    // Trace captures see everything the log filter lets through
    let recorder = TraceRecorder::new();
    logging::init(&log_filter, &config.logging, Some(recorder.clone()));

    let http = config.http.clone();
    let state = AppState::new(config, recorder);
    let app = create_production_router(state);

    start_server(app, &http)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Server failed"))?;

    Ok(())
}
