//! Runtime profiling endpoints under `/debug/pprof/`.
//!
//! - `/debug/pprof/` lists the available profiles
//! - `/debug/pprof/profile` samples CPU usage and returns a pprof protobuf
//! - `/debug/pprof/symbol` maps program counters to function names
//! - `/debug/pprof/trace` captures the process's tracing events for a window
//! - `/debug/pprof/flamegraph` renders a CPU profile as SVG
//!
//! The routes are unauthenticated and share the application listener.
//! Sampling windows must stay under the server's write timeout.

pub mod cpu;
pub mod symbol;
pub mod trace;

use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{any, get},
    Router,
};
use serde::Deserialize;
use tracing::instrument;

use crate::config::DEFAULT_TRACE_SECS;
use crate::error::AppError;
use crate::state::AppState;

pub use trace::{TraceCapture, TraceRecorder};

/// Route prefix shared by every profiling endpoint
pub const PPROF_PREFIX: &str = "/debug/pprof/";

/// `?seconds=` as sent by profiling clients. Kept as text so malformed
/// values fall back to the default instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct DurationParams {
    pub seconds: Option<String>,
}

/// (name, description) for each profile listed on the index page
const PROFILES: &[(&str, &str)] = &[
    (
        "profile",
        "CPU profile. You can specify the duration in the seconds GET parameter. \
         After you get the profile file, use the pprof tool to analyze it.",
    ),
    (
        "flamegraph",
        "CPU profile rendered as an SVG flame graph. Accepts the same seconds parameter.",
    ),
    (
        "symbol",
        "Maps program counters to function names. Send addresses separated by '+' \
         in the query string or a POST body.",
    ),
    (
        "trace",
        "A trace of the events logged by the process. You can specify the duration \
         in the seconds GET parameter.",
    ),
];

/// Reject sampling windows the write timeout would cut short.
pub fn check_write_timeout(state: &AppState, seconds: f64) -> Result<(), AppError> {
    match state.write_timeout() {
        Some(limit) if seconds >= limit.as_secs_f64() => {
            Err(AppError::DurationExceedsWriteTimeout)
        }
        _ => Ok(()),
    }
}

/// Window requested for a trace, fractional seconds allowed. Values that
/// are not positive or do not fit a `Duration` fall back to the default.
pub fn trace_duration(params: &DurationParams) -> Duration {
    params
        .seconds
        .as_deref()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|s| *s > 0.0)
        .and_then(|s| Duration::try_from_secs_f64(s).ok())
        .unwrap_or(Duration::from_secs_f64(DEFAULT_TRACE_SECS))
}

/// Render the index page.
pub fn render_index() -> String {
    let mut rows = String::new();
    for (name, _) in PROFILES {
        rows.push_str(&format!(
            "<tr><td><a href=\"{name}\">{name}</a></td></tr>\n"
        ));
    }

    let mut descriptions = String::new();
    for (name, description) in PROFILES {
        descriptions.push_str(&format!(
            "<li><div class=profile-name>{name}: </div> {description}</li>\n"
        ));
    }

    format!(
        r#"<html>
<head>
<title>/debug/pprof/</title>
</head>
<body>
/debug/pprof/
<br>
Types of profiles available:
<table>
<thead><td>Profile</td></thead>
{rows}</table>
<br>
<p>
Profile Descriptions:
<ul>
{descriptions}</ul>
</p>
</body>
</html>
"#
    )
}

/// `/debug/pprof` without the trailing slash: 301 to the index.
pub async fn redirect_to_index() -> impl IntoResponse {
    (
        StatusCode::MOVED_PERMANENTLY,
        [(header::LOCATION, PPROF_PREFIX)],
    )
}

/// `/debug/pprof/`
pub async fn index() -> Html<String> {
    Html(render_index())
}

/// `/debug/pprof/<name>` for names without a dedicated route.
#[instrument(name = "pprof::named", skip(state))]
pub async fn named(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<DurationParams>,
) -> Result<Response, AppError> {
    match name.trim_start_matches('/') {
        "flamegraph" => cpu::flamegraph(&state, &params).await,
        other => Err(AppError::UnknownProfile(other.to_string())),
    }
}

/// `/debug/pprof/trace`: buffer tracing events for the requested window.
#[instrument(name = "pprof::trace", skip(state))]
pub async fn trace(
    State(state): State<AppState>,
    Query(params): Query<DurationParams>,
) -> Result<Response, AppError> {
    let window = trace_duration(&params);
    check_write_timeout(&state, window.as_secs_f64())?;

    let capture = state.recorder.start()?;
    tracing::info!(seconds = window.as_secs_f64(), "Trace capture started");
    tokio::time::sleep(window).await;
    let lines = capture.finish();
    tracing::info!(events = lines.len(), "Trace capture finished");

    let mut body = lines.join("\n");
    if !body.is_empty() {
        body.push('\n');
    }

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"trace\""),
        ],
        body,
    )
        .into_response())
}

/// Profiling routes, to be merged into the application router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/debug/pprof", get(redirect_to_index))
        .route("/debug/pprof/", any(index))
        .route("/debug/pprof/profile", any(cpu::profile))
        .route("/debug/pprof/symbol", any(symbol::symbol))
        .route("/debug/pprof/trace", any(trace))
        .route("/debug/pprof/{*name}", any(named))
}
