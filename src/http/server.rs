//! Listener and per-connection serving.
//!
//! Each accepted connection runs on its own task as HTTP/1.1 with
//! keep-alive. Two deadlines are enforced per connection by a watchdog:
//! - **read**: a fresh connection must deliver its first request in time
//! - **idle**: a keep-alive connection must start its next request in time
//!
//! A connection that misses its deadline is asked to close, then dropped
//! after a short grace period if it still has not finished.
//!
//! The write deadline lives in the router (see `routes`), not here.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use hyper::body::Incoming;
use hyper::Request;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tower::ServiceExt;

use crate::config::{ConfigError, HttpServerConfig, Timeouts};

use super::shutdown;

/// How long a connection may linger after a graceful close was requested
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Server startup error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid listen address: {0}")]
    Address(#[from] ConfigError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read local address: {0}")]
    LocalAddr(#[source] std::io::Error),
}

/// Bind the configured address and serve `app` until SIGINT/SIGTERM.
pub async fn start_server(app: Router, config: &HttpServerConfig) -> Result<(), ServerError> {
    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    let timeouts = config.timeouts();
    tracing::info!(
        %addr,
        read_timeout = ?timeouts.read,
        write_timeout = ?timeouts.write,
        idle_timeout = ?timeouts.idle,
        "Server starting on {}",
        addr
    );

    serve(listener, app, timeouts, shutdown::signal()).await
}

/// Accept connections on `listener` until `shutdown` resolves.
///
/// Shutdown stops the accept loop and returns at once; connections still
/// open are abandoned with the runtime.
pub async fn serve<F>(
    listener: TcpListener,
    app: Router,
    timeouts: Timeouts,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send,
{
    let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;
    tokio::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    // Per-connection failures (e.g. EMFILE) must not stop the listener
                    tracing::warn!(error = %e, "Failed to accept connection");
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    continue;
                }
            },
            _ = &mut shutdown => {
                tracing::info!(%local_addr, "Listener stopped");
                return Ok(());
            }
        };

        let app = app.clone();
        tokio::spawn(async move {
            serve_connection(stream, app, timeouts).await;
            tracing::trace!(%peer, "Connection closed");
        });
    }
}

/// Request bookkeeping for one connection, shared with its service.
#[derive(Default)]
struct ConnectionActivity {
    in_flight: AtomicUsize,
    changed: Notify,
}

impl ConnectionActivity {
    fn begin(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.changed.notify_one();
    }

    fn end(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.changed.notify_one();
    }

    fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }
}

async fn serve_connection(stream: TcpStream, app: Router, timeouts: Timeouts) {
    let activity = Arc::new(ConnectionActivity::default());

    let service = {
        let activity = activity.clone();
        service_fn(move |request: Request<Incoming>| {
            let app = app.clone();
            let activity = activity.clone();
            async move {
                activity.begin();
                let response = app.oneshot(request).await;
                activity.end();
                response
            }
        })
    };

    // No hyper header timer: it would also fire between keep-alive requests
    // and cut the idle window down to the read timeout.
    let mut builder = http1::Builder::new();
    builder.keep_alive(true);

    let conn = builder.serve_connection(TokioIo::new(stream), service);
    tokio::pin!(conn);

    // First request is bounded by the read timeout, later ones by idle.
    let mut wait = timeouts.read;
    let mut closing = false;

    loop {
        let deadline = async move {
            match wait {
                Some(wait) => tokio::time::sleep(wait).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            result = conn.as_mut() => {
                if let Err(e) = result {
                    tracing::debug!(error = %e, "Connection ended with error");
                }
                return;
            }
            _ = activity.changed.notified() => {
                if !closing {
                    wait = timeouts.idle;
                }
            }
            _ = deadline => {
                if activity.is_busy() {
                    continue;
                }
                if closing {
                    // Partial headers or a never-used connection ignore graceful shutdown
                    tracing::debug!("Dropping connection after close grace period");
                    return;
                }
                tracing::debug!(timeout = ?wait, "Closing idle connection");
                conn.as_mut().graceful_shutdown();
                closing = true;
                wait = Some(CLOSE_GRACE);
            }
        }
    }
}
