//! Root banners for both servers.

use axum::http::header;
use axum::response::IntoResponse;

use crate::config::{PRODUCTION_BANNER, PRODUCTION_TAGLINE, SQLITE_BANNER};

/// SQLite server: the same confirmation for every method and path.
pub async fn sqlite_index() -> &'static str {
    SQLITE_BANNER
}

/// Production banner, with a "served by" line when the hostname is known.
pub fn production_banner(hostname: Option<&str>) -> String {
    let mut body = String::with_capacity(160);
    body.push_str(PRODUCTION_BANNER);
    body.push_str(PRODUCTION_TAGLINE);
    if let Some(hostname) = hostname {
        body.push_str("🌐 Served by: ");
        body.push_str(hostname);
        body.push('\n');
    }
    body
}

/// Best-effort hostname lookup. Failures are logged and swallowed.
pub fn lookup_hostname() -> Option<String> {
    match hostname::get() {
        Ok(name) => Some(name.to_string_lossy().into_owned()),
        Err(e) => {
            tracing::debug!(error = %e, "Hostname lookup failed, omitting served-by line");
            None
        }
    }
}

/// Production server root handler.
pub async fn production_index() -> impl IntoResponse {
    let hostname = lookup_hostname();
    (
        [(header::CONTENT_TYPE, "text/plain")],
        production_banner(hostname.as_deref()),
    )
}
