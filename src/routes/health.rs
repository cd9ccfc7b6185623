//! Health check endpoint for container orchestration.
//!
//! A liveness probe: it only proves the process can answer HTTP, so it has
//! no failure modes.

use crate::config::HEALTH_BODY;

/// Health check handler. Answers every method with `OK`.
pub async fn health() -> &'static str {
    HEALTH_BODY
}
