//! Integration tests for the server binary
//!
//! Runs the built executable with piped stdio, the way an MCP client would.

use std::io::Write;
use std::process::{Command, Output, Stdio};

use serde_json::Value;
use tempfile::TempDir;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to run the binary with given args and stdin, capturing output
fn run_server(args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_appstore-revenue"))
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute appstore-revenue");

    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(stdin.as_bytes())
        .expect("Failed to write stdin");

    child.wait_with_output().expect("Failed to wait for appstore-revenue")
}

fn responses(output: &Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("stdout should only carry JSON-RPC"))
        .collect()
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = run_server(&["--help"], "");
    assert!(output.status.success(), "Expected --help to exit successfully");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("appstore-revenue"));
    assert!(stdout.contains("--cache-dir"));
    assert!(stdout.contains("--clear-cache"));
}

#[test]
fn test_invalid_api_url_fails() {
    let cache_dir = TempDir::new().unwrap();
    let dir = cache_dir.path().to_str().unwrap();
    let output = run_server(&["--cache-dir", dir, "--api-url", "not a url"], "");

    assert!(!output.status.success(), "Expected invalid URL to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid API URL"), "Unexpected stderr: {}", stderr);
}

#[test]
fn test_initialize_over_stdio() {
    let cache_dir = TempDir::new().unwrap();
    let dir = cache_dir.path().to_str().unwrap();
    let input = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
        "\n"
    );

    let output = run_server(&["--cache-dir", dir], input);

    assert!(output.status.success());
    let replies = responses(&output);
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0]["result"]["serverInfo"]["name"], "appstore-revenue");
    assert_eq!(replies[1]["result"]["tools"][0]["name"], "fetch-app-revenue");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_lookup_is_cached_across_restarts() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("app_ids", "284882215"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "apps": [{
                "app_id": 284882215,
                "humanized_name": "Facebook",
                "publisher_name": "Meta Platforms, Inc.",
                "humanized_worldwide_last_month_revenue": { "string": "$5M" },
                "humanized_worldwide_last_month_downloads": { "string": "8M" }
            }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let cache_dir = TempDir::new().unwrap();
    let dir = cache_dir.path().to_str().unwrap().to_string();
    let api_url = format!("{}/api/ios/apps", mock_server.uri());
    let call = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"fetch-app-revenue","arguments":{"app_ids":["284882215"]}}}"#,
        "\n"
    );

    let args = ["--cache-dir", dir.as_str(), "--api-url", api_url.as_str()];

    // The mock server runs on its own thread, so blocking on the child is fine
    let first = run_server(&args, call);
    let second = run_server(&args, call);

    for (output, expected_source) in [(&first, "api"), (&second, "cache")] {
        let replies = responses(output);
        assert_eq!(replies.len(), 1);
        let text = replies[0]["result"]["content"][0]["text"].as_str().unwrap();
        let report: Value = serde_json::from_str(text).unwrap();
        assert_eq!(report["results"]["284882215"]["source"], expected_source);
        assert_eq!(report["results"]["284882215"]["last_month_revenue"], "$5M");
    }

    assert!(cache_dir.path().join("revenue-cache.json").exists());
}
