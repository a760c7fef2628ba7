//! Integration tests for the Sensor Tower client against a mock HTTP server

use std::time::Duration;

use appstore_revenue::data::{FetchError, SensorTowerClient};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

const APPS_PATH: &str = "/api/ios/apps";

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn client_for(server: &MockServer) -> SensorTowerClient {
    SensorTowerClient::with_base_url(format!("{}{}", server.uri(), APPS_PATH))
}

/// Matches the raw, undecoded query string
struct RawQuery(&'static str);

impl Match for RawQuery {
    fn matches(&self, request: &Request) -> bool {
        request.url.query() == Some(self.0)
    }
}

fn app(app_id: u64, name: &str) -> serde_json::Value {
    json!({
        "app_id": app_id,
        "humanized_name": name,
        "publisher_name": "Publisher",
        "bundle_id": format!("com.example.{}", app_id),
        "humanized_worldwide_last_month_revenue": { "string": "$1M", "revenue": 1000000 },
        "humanized_worldwide_last_month_downloads": { "string": "50k", "downloads": 50000 },
        "some_future_field": [1, 2, 3]
    })
}

#[tokio::test]
async fn test_all_ids_sent_in_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(APPS_PATH))
        .and(query_param("app_ids", "1,2"))
        .and(RawQuery("app_ids=1,2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "apps": [app(1, "One"), app(2, "Two")] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let results = client_for(&server).fetch_app_revenue(&ids(&["1", "2"])).await;

    assert_eq!(results.len(), 2);
    let one = results["1"].as_ref().expect("1 should be found");
    assert_eq!(one.humanized_name(), Some("One"));
    assert_eq!(one.last_month_revenue(), Some("$1M"));
    assert_eq!(one.field("some_future_field"), Some(&json!([1, 2, 3])));
    assert_eq!(results["2"].as_ref().unwrap().app_id().as_deref(), Some("2"));
}

#[tokio::test]
async fn test_missing_app_reported_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(APPS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "apps": [app(1, "One")] })))
        .mount(&server)
        .await;

    let results = client_for(&server).fetch_app_revenue(&ids(&["1", "404"])).await;

    assert!(results["1"].is_ok());
    assert_eq!(
        results["404"].as_ref().unwrap_err(),
        &FetchError::NotFound("404".to_string())
    );
}

#[tokio::test]
async fn test_rate_limit_applies_to_every_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let results = client_for(&server).fetch_app_revenue(&ids(&["X", "Y"])).await;

    assert_eq!(results.len(), 2);
    for id in ["X", "Y"] {
        let error = results[id].as_ref().unwrap_err();
        assert_eq!(error, &FetchError::RateLimited);
        assert!(error.to_string().starts_with("Rate limited"));
    }
}

#[tokio::test]
async fn test_server_error_status_applies_to_every_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let results = client_for(&server).fetch_app_revenue(&ids(&["1", "2"])).await;

    for id in ["1", "2"] {
        assert_eq!(results[id].as_ref().unwrap_err(), &FetchError::Status(503));
    }
}

#[tokio::test]
async fn test_undecodable_body_is_request_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let results = client_for(&server).fetch_app_revenue(&ids(&["1"])).await;

    match results["1"].as_ref().unwrap_err() {
        FetchError::Request(detail) => assert!(!detail.is_empty()),
        other => panic!("Expected request error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_timeout_is_request_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "apps": [] }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = SensorTowerClient::with_timeout(
        format!("{}{}", server.uri(), APPS_PATH),
        Duration::from_millis(200),
    )
    .unwrap();
    let results = client.fetch_app_revenue(&ids(&["1"])).await;

    assert!(matches!(results["1"], Err(FetchError::Request(_))));
}

#[tokio::test]
async fn test_connection_failure_is_request_error() {
    // Bind then release a port so nothing is listening on it
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let base_url = format!("http://127.0.0.1:{}{}", port, APPS_PATH);

    let results = SensorTowerClient::with_base_url(base_url)
        .fetch_app_revenue(&ids(&["1", "2"]))
        .await;

    assert_eq!(results.len(), 2);
    assert!(matches!(results["1"], Err(FetchError::Request(_))));
    assert_eq!(results["1"], results["2"]);
}
