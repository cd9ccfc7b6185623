//! Socket-level behaviour of the listener: timeouts and shutdown.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use shipshape::config::{AppConfig, Profile, Timeouts};
use shipshape::http::serve;
use shipshape::profiling::TraceRecorder;
use shipshape::routes::{create_production_router, create_sqlite_router};
use shipshape::state::AppState;

/// Start `app` on an ephemeral port; dropping the sender stops the listener.
async fn spawn_server(app: axum::Router, timeouts: Timeouts) -> (std::net::SocketAddr, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        serve(listener, app, timeouts, async {
            let _ = rx.await;
        })
        .await
        .unwrap();
    });
    (addr, tx)
}

fn production_app() -> axum::Router {
    create_production_router(AppState::new(
        AppConfig::for_profile(Profile::Production),
        TraceRecorder::new(),
    ))
}

async fn request(addr: std::net::SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .expect("server answered in time")
        .unwrap();
    String::from_utf8(response).unwrap()
}

#[tokio::test]
async fn test_health_over_socket() {
    let (addr, _stop) = spawn_server(production_app(), Timeouts::default()).await;

    let response = request(
        addr,
        "GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
    assert!(response.ends_with("\r\n\r\nOK"), "{response}");
}

#[tokio::test]
async fn test_sqlite_banner_over_socket() {
    let (addr, _stop) = spawn_server(create_sqlite_router(), Timeouts::default()).await;

    let response = request(
        addr,
        "POST /anything HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
    assert!(response.ends_with("✅ CGO-enabled Go app with SQLite running in Docker!\n"));
}

#[tokio::test]
async fn test_silent_client_disconnected_after_read_timeout() {
    let timeouts = Timeouts {
        read: Some(Duration::from_millis(500)),
        write: None,
        idle: Some(Duration::from_millis(500)),
    };
    let (addr, _stop) = spawn_server(production_app(), timeouts).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    let mut buf = [0u8; 64];
    let read = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
        .await
        .expect("server closed the silent connection");
    // EOF or reset, either way the connection is gone
    assert!(matches!(read, Ok(0) | Err(_)), "{read:?}");
}

#[tokio::test]
async fn test_idle_keep_alive_connection_closed() {
    let timeouts = Timeouts {
        read: Some(Duration::from_secs(2)),
        write: None,
        idle: Some(Duration::from_millis(300)),
    };
    let (addr, _stop) = spawn_server(production_app(), timeouts).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();

    let mut received = Vec::new();
    let mut buf = [0u8; 256];
    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => received.extend_from_slice(&buf[..n]),
            }
        }
    })
    .await;

    assert!(closed.is_ok(), "idle connection was not closed");
    let response = String::from_utf8_lossy(&received);
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
    assert!(response.ends_with("OK"), "{response}");
}

#[tokio::test]
async fn test_shutdown_stops_listener() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    let server = tokio::spawn(serve(
        listener,
        create_sqlite_router(),
        Timeouts::default(),
        async {
            let _ = rx.await;
        },
    ));

    tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("serve returned after shutdown")
        .unwrap();
    assert!(result.is_ok());
}

/// Read one `Content-Length` framed response off a keep-alive stream.
async fn read_response(stream: &mut TcpStream) -> String {
    let mut received = Vec::new();
    let mut buf = [0u8; 512];
    loop {
        let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
            .await
            .expect("response in time")
            .unwrap();
        assert!(n > 0, "connection closed before a full response");
        received.extend_from_slice(&buf[..n]);

        let text = String::from_utf8_lossy(&received).into_owned();
        if let Some(head_end) = text.find("\r\n\r\n") {
            let length = text[..head_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if received.len() >= head_end + 4 + length {
                return text;
            }
        }
    }
}

#[tokio::test]
async fn test_keep_alive_request_after_read_timeout_within_idle() {
    let timeouts = Timeouts {
        read: Some(Duration::from_millis(300)),
        write: None,
        idle: Some(Duration::from_secs(5)),
    };
    let (addr, _stop) = spawn_server(production_app(), timeouts).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = b"GET /health HTTP/1.1\r\nHost: localhost\r\n\r\n";

    stream.write_all(request).await.unwrap();
    let first = read_response(&mut stream).await;
    assert!(first.starts_with("HTTP/1.1 200 OK\r\n"), "{first}");

    // Longer than the read timeout, shorter than the idle timeout
    tokio::time::sleep(Duration::from_secs(1)).await;

    stream.write_all(request).await.unwrap();
    let second = read_response(&mut stream).await;
    assert!(second.starts_with("HTTP/1.1 200 OK\r\n"), "{second}");
    assert!(second.ends_with("OK"), "{second}");
}

#[tokio::test]
async fn test_handler_past_write_timeout_gets_408() {
    let config = AppConfig::from_toml("[http]\nwrite_timeout_seconds = 1\n", Profile::Production).unwrap();
    let app = create_production_router(AppState::new(config, TraceRecorder::new()));
    let (addr, _stop) = spawn_server(app, Timeouts::default()).await;

    // Announce a body that never arrives so the handler stalls on it
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"POST /debug/pprof/symbol HTTP/1.1\r\nHost: localhost\r\nContent-Length: 64\r\n\r\n")
        .await
        .unwrap();

    let response = read_response(&mut stream).await;
    assert!(response.starts_with("HTTP/1.1 408 Request Timeout\r\n"), "{response}");
}
