//! HTTP listener.
//!
//! The listener includes:
//! - Read and idle deadlines per connection
//! - Immediate stop on SIGTERM/SIGINT

mod server;
mod shutdown;

pub use server::{serve, start_server, ServerError};
pub use shutdown::signal;
