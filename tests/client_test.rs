//! End-to-end tests for `FortumClient` over the reqwest transport.
//!
//! A mock server stands in for the Fortum site; credentials come from the
//! in-memory authenticator in `mittfortum::test_utils`.

mod common;

use std::sync::Arc;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mittfortum::core::auth::SESSION_BASED_TOKEN;
use mittfortum::core::endpoints::{Endpoints, Locale, Resolution};
use mittfortum::core::http::ReqwestTransport;
use mittfortum::error::FortumError;
use mittfortum::test_utils::{MockAuthenticator, fixtures};
use mittfortum::FortumClient;

use common::logger::TestLogger;

const SESSION_PATH: &str = "/se/el/api/auth/session";
const RPC_PATH: &str = "/se/el/api/trpc/loggedIn.timeSeries.listTimeSeries";

fn client_for(server: &MockServer, auth: Arc<MockAuthenticator>) -> FortumClient {
    FortumClient::new(
        auth,
        Arc::new(ReqwestTransport::default()),
        Endpoints::with_site_url(Locale::Sv, format!("{}/se/el", server.uri())),
    )
}

async fn rpc_urls(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == RPC_PATH)
        .map(|r| r.url.to_string())
        .collect()
}

#[tokio::test]
async fn metering_points_from_session_endpoint() {
    let log = TestLogger::new("metering_points_from_session_endpoint");
    log.phase("setup");

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SESSION_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(fixtures::session_body()))
        .expect(1)
        .mount(&server)
        .await;

    log.phase("execute");
    let client = client_for(&server, Arc::new(MockAuthenticator::fresh(SESSION_BASED_TOKEN)));
    let points = client.get_metering_points().await.expect("session parses");

    log.phase("verify");
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].metering_point_no, "6094111");

    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests[0].headers.get("authorization").is_none());
    assert_eq!(
        requests[0]
            .headers
            .get("referer")
            .and_then(|v| v.to_str().ok()),
        Some(format!("{}/se/el/inloggad/el", server.uri()).as_str())
    );
    log.finish_ok();
}

#[tokio::test]
async fn time_series_narrows_range_after_server_errors() {
    let log = TestLogger::new("time_series_narrows_range_after_server_errors");
    log.phase("setup");

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RPC_PATH))
        .respond_with(
            ResponseTemplate::new(500).set_body_string(fixtures::internal_server_error_body()),
        )
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(RPC_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(fixtures::time_series_body()))
        .with_priority(2)
        .mount(&server)
        .await;

    log.phase("execute");
    let client = client_for(&server, Arc::new(MockAuthenticator::fresh("refresh-token")));
    let series = client
        .get_time_series_data(&["6094111".to_string()], None, None, Resolution::Month)
        .await
        .expect("third tier succeeds");

    log.phase("verify");
    assert_eq!(series.len(), 1);
    assert!((series[0].total_energy_consumption() - 830.25).abs() < 1e-9);

    let days: Vec<i64> = rpc_urls(&server)
        .await
        .iter()
        .map(|url| fixtures::requested_days(url))
        .collect();
    assert_eq!(days.len(), 3);
    assert!(days[0] >= 90);
    assert_eq!(&days[1..], &[30, 7]);
    log.finish_ok();
}

#[tokio::test]
async fn server_error_on_every_tier_is_returned() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RPC_PATH))
        .respond_with(
            ResponseTemplate::new(500).set_body_string(fixtures::internal_server_error_body()),
        )
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server, Arc::new(MockAuthenticator::fresh("refresh-token")));
    let err = client
        .get_time_series_data(&["6094111".to_string()], None, None, Resolution::Day)
        .await
        .expect_err("every tier fails");
    assert_eq!(
        err.to_string(),
        "Server error - try reducing date range or changing resolution"
    );
}

#[tokio::test]
async fn sign_out_redirect_is_retried() {
    let log = TestLogger::new("sign_out_redirect_is_retried");
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SESSION_PATH))
        .respond_with(
            ResponseTemplate::new(307)
                .insert_header("location", "/se/el/sign-out?error=TokenExpired"),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SESSION_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(fixtures::session_body()))
        .with_priority(2)
        .mount(&server)
        .await;

    log.phase("execute");
    let client = client_for(&server, Arc::new(MockAuthenticator::fresh("refresh-token")));
    let details = client.get_customer_details().await.expect("second attempt succeeds");

    log.phase("verify");
    assert_eq!(details.customer_id, "1234567");
    assert_eq!(server.received_requests().await.unwrap_or_default().len(), 2);
    log.finish_ok();
}

#[tokio::test]
async fn persistent_unauthorized_stops_at_token_mode_ceiling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SESSION_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let auth = Arc::new(MockAuthenticator::fresh("refresh-token"));
    let client = client_for(&server, auth.clone());
    let err = client
        .get_metering_points()
        .await
        .expect_err("ceiling reached");

    assert!(
        matches!(err, FortumError::MaxRetriesExceeded { attempts: 2, .. }),
        "got {err:?}"
    );
    assert_eq!(auth.refresh_calls(), 2);
}

#[tokio::test]
async fn forbidden_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SESSION_PATH))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Arc::new(MockAuthenticator::fresh(SESSION_BASED_TOKEN)));
    let err = client.get_customer_details().await.expect_err("forbidden");
    assert!(matches!(err, FortumError::Forbidden));
}

#[tokio::test]
async fn consumption_for_all_metering_points() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SESSION_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(fixtures::session_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(RPC_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(fixtures::time_series_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Arc::new(MockAuthenticator::fresh("refresh-token")));
    let records = client
        .get_consumption_data(None, None, None, Resolution::Month)
        .await
        .expect("consumption");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].cost, Some(349.0));

    let urls = rpc_urls(&server).await;
    let input = fixtures::query_input(&urls[0]);
    assert_eq!(input["0"]["json"]["meteringPointNo"][0], "6094111");
    assert_eq!(input["0"]["json"]["resolution"], "MONTH");
}

#[tokio::test]
async fn connection_check_against_live_mock() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SESSION_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(fixtures::session_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(RPC_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(fixtures::time_series_body()))
        .mount(&server)
        .await;

    let client = client_for(&server, Arc::new(MockAuthenticator::fresh("refresh-token")));
    let report = client.test_connection().await;
    assert!(report.success, "{report:?}");

    let urls = rpc_urls(&server).await;
    let input = fixtures::query_input(&urls[0]);
    assert_eq!(input["0"]["json"]["resolution"], "HOUR");
    assert_eq!(fixtures::requested_days(&urls[0]), 1);
}
