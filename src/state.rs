//! Shared application state for the production server's handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::profiling::TraceRecorder;

/// Shared application state, cloneable across handlers via Arc-wrapped fields.
///
/// Holds the configuration (the profiling routes need the write timeout)
/// and the recorder used by trace captures.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub recorder: TraceRecorder,
}

impl AppState {
    pub fn new(config: AppConfig, recorder: TraceRecorder) -> Self {
        Self {
            config: Arc::new(config),
            recorder,
        }
    }

    /// Response deadline configured for the listener, if any.
    pub fn write_timeout(&self) -> Option<Duration> {
        self.config.http.timeouts().write
    }
}
