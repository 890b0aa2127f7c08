//! Integration tests for the reqwest transport against a mock server.
//!
//! Covers:
//! - Status and body pass-through (no status interpretation in the transport)
//! - Redirects are surfaced, never followed
//! - Request headers reach the server
//! - Timeout and connection failures map to transport errors

mod common;

use std::collections::BTreeMap;
use std::time::Duration;

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mittfortum::core::http::{HttpRequest, HttpTransport, ReqwestTransport, USER_AGENT};
use mittfortum::error::{ErrorKind, FortumError};

use common::logger::TestLogger;

#[tokio::test]
async fn returns_status_and_body() {
    let log = TestLogger::new("returns_status_and_body");
    log.phase("setup");

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/se/el/api/auth/session"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"user":{"id":"u-1"}}"#))
        .mount(&server)
        .await;

    log.phase("execute");
    let url = format!("{}/se/el/api/auth/session", server.uri());
    log.http_request("GET", &url);
    let response = ReqwestTransport::default()
        .get(HttpRequest::get(url))
        .await
        .expect("request succeeds");

    log.phase("verify");
    assert_eq!(response.status, 200);
    assert_eq!(response.body, r#"{"user":{"id":"u-1"}}"#);
    assert!(response.location.is_none());
    log.finish_ok();
}

#[tokio::test]
async fn server_errors_are_not_transport_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("[]"))
        .mount(&server)
        .await;

    let response = ReqwestTransport::default()
        .get(HttpRequest::get(server.uri()))
        .await
        .expect("500 is still a response");
    assert_eq!(response.status, 500);
    assert_eq!(response.body, "[]");
}

#[tokio::test]
async fn redirect_is_reported_not_followed() {
    let log = TestLogger::new("redirect_is_reported_not_followed");
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/se/el/api/trpc/proc"))
        .respond_with(
            ResponseTemplate::new(307)
                .insert_header("location", "/se/el/sign-out?error=TokenExpired"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/se/el/sign-out"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    log.phase("execute");
    let response = ReqwestTransport::default()
        .get(HttpRequest::get(format!("{}/se/el/api/trpc/proc", server.uri())))
        .await
        .expect("redirect is a response");

    log.phase("verify");
    assert_eq!(response.status, 307);
    assert_eq!(
        response.location.as_deref(),
        Some("/se/el/sign-out?error=TokenExpired")
    );
    log.finish_ok();
}

#[tokio::test]
async fn sends_request_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("user-agent", USER_AGENT))
        .and(header("accept", "application/json"))
        .and(header("referer", "https://www.fortum.com/se/el/inloggad/el"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let mut headers = BTreeMap::new();
    headers.insert("user-agent".to_string(), USER_AGENT.to_string());
    headers.insert("accept".to_string(), "application/json".to_string());
    headers.insert(
        "referer".to_string(),
        "https://www.fortum.com/se/el/inloggad/el".to_string(),
    );

    let response = ReqwestTransport::default()
        .get(HttpRequest::get(server.uri()).with_headers(headers))
        .await
        .expect("request succeeds");
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("{}")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new(Duration::from_millis(200));
    let err = transport
        .get(HttpRequest::get(server.uri()))
        .await
        .expect_err("request times out");

    assert!(matches!(err, FortumError::Timeout(_)), "got {err:?}");
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn refused_connection_is_network_error() {
    let server = MockServer::start().await;
    let url = server.uri();
    drop(server);

    let err = ReqwestTransport::new(Duration::from_secs(2))
        .get(HttpRequest::get(url))
        .await
        .expect_err("nothing listens any more");
    assert!(matches!(err, FortumError::Network(_)), "got {err:?}");
}
