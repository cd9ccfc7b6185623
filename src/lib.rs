//! Shipshape: minimal HTTP servers for container image demos.
//!
//! Two binaries share this library:
//! - `sqlite-server` links a bundled SQLite, opens an in-memory database and
//!   answers every request with a fixed confirmation
//! - `prod-server` serves a banner, a `/health` liveness probe and
//!   `/debug/pprof/` profiling routes behind read/write/idle timeouts

pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod logging;
pub mod middleware;
pub mod profiling;
pub mod routes;
pub mod state;

pub use error::AppError;
