use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

/// Request-time failures. Only the profiling routes can produce these.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("profile duration exceeds server's WriteTimeout")]
    DurationExceedsWriteTimeout,

    #[error("Could not enable CPU profiling: {0}")]
    CpuProfiler(#[from] pprof::Error),

    #[error("Could not enable tracing: already enabled")]
    TraceInProgress,

    #[error("Unknown profile")]
    UnknownProfile(String),

    #[error("Could not encode profile: {0}")]
    Encode(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::DurationExceedsWriteTimeout => StatusCode::BAD_REQUEST,
            AppError::UnknownProfile(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("profiling task failed: {}", err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Profiling request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Profiling request rejected");
        }

        (
            status,
            [
                (
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; charset=utf-8"),
                ),
                (
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ),
            ],
            format!("{}\n", self),
        )
            .into_response()
    }
}
