//! CPU sampling profiles.
//!
//! Sampling is signal driven and process wide, so only one profile can run
//! at a time. The sampling window is spent on a blocking-pool thread.

use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use pprof::protos::Message;
use tracing::instrument;

use super::{check_write_timeout, DurationParams};
use crate::config::{CPU_PROFILE_FREQUENCY, DEFAULT_CPU_PROFILE_SECS};
use crate::error::AppError;
use crate::state::AppState;

/// Output encodings for a finished CPU profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileFormat {
    /// pprof protobuf, readable by `go tool pprof` and `pprof`
    Protobuf,
    /// Flame graph SVG
    Flamegraph,
}

/// Seconds requested via `?seconds=`, falling back to the default.
pub fn profile_seconds(params: &DurationParams) -> u64 {
    params
        .seconds
        .as_deref()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|s| *s > 0)
        .map(|s| s as u64)
        .unwrap_or(DEFAULT_CPU_PROFILE_SECS)
}

/// Sample the process for `duration` and encode the result.
pub async fn collect(duration: Duration, format: ProfileFormat) -> Result<Vec<u8>, AppError> {
    tokio::task::spawn_blocking(move || -> Result<Vec<u8>, AppError> {
        let guard = pprof::ProfilerGuard::new(CPU_PROFILE_FREQUENCY)?;
        tracing::info!(seconds = duration.as_secs_f64(), "CPU profiling started");
        std::thread::sleep(duration);
        let report = guard.report().build()?;
        drop(guard);
        tracing::info!("CPU profiling finished");

        let mut body = Vec::new();
        match format {
            ProfileFormat::Protobuf => {
                let profile = report.pprof()?;
                profile
                    .encode(&mut body)
                    .map_err(|e| AppError::Encode(e.to_string()))?;
            }
            ProfileFormat::Flamegraph => report.flamegraph(&mut body)?,
        }
        Ok(body)
    })
    .await?
}

/// `/debug/pprof/profile`: protobuf CPU profile as a download.
#[instrument(name = "pprof::profile", skip(state))]
pub async fn profile(
    State(state): State<AppState>,
    Query(params): Query<DurationParams>,
) -> Result<Response, AppError> {
    let seconds = profile_seconds(&params);
    check_write_timeout(&state, seconds as f64)?;

    let body = collect(Duration::from_secs(seconds), ProfileFormat::Protobuf).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"profile\""),
        ],
        body,
    )
        .into_response())
}

/// Named `flamegraph` profile: the same sampling rendered as SVG.
pub async fn flamegraph(state: &AppState, params: &DurationParams) -> Result<Response, AppError> {
    let seconds = profile_seconds(params);
    check_write_timeout(state, seconds as f64)?;

    let body = collect(Duration::from_secs(seconds), ProfileFormat::Flamegraph).await?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], body).into_response())
}
