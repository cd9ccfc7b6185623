//! Shared helpers for driving routers and listeners in tests.

#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, Response};
use axum::Router;
use tower::ServiceExt;

/// Send one request through `router` without a socket.
pub async fn send(router: Router, method: Method, uri: &str) -> Response<Body> {
    send_with_body(router, method, uri, Body::empty()).await
}

pub async fn send_with_body(
    router: Router,
    method: Method,
    uri: &str,
    body: Body,
) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(body)
        .expect("valid request");
    router.oneshot(request).await.expect("router is infallible")
}

/// Collect a response body as UTF-8 text.
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}
