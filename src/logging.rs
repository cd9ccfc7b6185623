//! Tracing subscriber setup shared by both servers.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LoggingConfig, DEFAULT_LOG_FILTER};
use crate::profiling::TraceRecorder;

/// Pick the log filter with priority: CLI > `RUST_LOG` > default.
pub fn resolve_filter(cli: Option<String>) -> String {
    cli.or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

/// Install the global subscriber.
///
/// When a recorder is given, events that pass `filter` are also offered to
/// it so trace captures see the same stream the logs do.
pub fn init(filter: &str, config: &LoggingConfig, recorder: Option<TraceRecorder>) {
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::new(filter))
        .with(recorder);

    if config.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_filter_wins() {
        assert_eq!(
            resolve_filter(Some("shipshape=trace".to_string())),
            "shipshape=trace"
        );
    }
}
