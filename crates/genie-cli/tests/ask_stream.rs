//! Integration tests for `genie ask` against a mock agent server.


use assert_cmd::cargo::cargo_bin_cmd;
use fixtures::{SSE_QUOTA, STREAM_PATH, agent_run_sse, can_bind_localhost, sse_response};
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a temp GENIE_HOME directory for test isolation.
fn temp_genie_home() -> TempDir {
    TempDir::new().expect("create temp genie home")
}

#[tokio::test]
async fn test_ask_prints_plan_progress_and_answer() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let genie_home = temp_genie_home();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .and(body_partial_json(json!({
            "query": "cheap flights to Lisbon",
            "deepThink": 0,
            "searchEnabled": 1
        })))
        .respond_with(sse_response(&agent_run_sse("TAP 42 at 08:10, 89 EUR")))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("genie")
        .env("GENIE_HOME", genie_home.path())
        .env("GENIE_BASE_URL", server.uri())
        .env_remove("GENIE_LOG")
        .args(["ask", "--search", "cheap flights to Lisbon"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Plan:"))
        .stdout(predicate::str::contains("> 1. Search flights"))
        .stdout(predicate::str::contains("2. Compare prices"))
        .stdout(predicate::str::contains(
            "[thought] Looking at direct routes first",
        ))
        .stdout(predicate::str::contains("[action] (panel) open search page"))
        .stdout(predicate::str::contains("TAP 42 at 08:10, 89 EUR"));
}

#[tokio::test]
async fn test_ask_deep_think_moves_thoughts_to_panel() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let genie_home = temp_genie_home();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .and(body_partial_json(json!({ "deepThink": 1 })))
        .respond_with(sse_response(&agent_run_sse("done")))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("genie")
        .env("GENIE_HOME", genie_home.path())
        .env("GENIE_BASE_URL", server.uri())
        .args(["ask", "--deep-think", "plan a trip"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "[thought] (panel) Looking at direct routes first",
        ));
}

#[tokio::test]
async fn test_ask_reports_quota_notice() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let genie_home = temp_genie_home();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(sse_response(SSE_QUOTA))
        .mount(&server)
        .await;

    cargo_bin_cmd!("genie")
        .env("GENIE_HOME", genie_home.path())
        .env("GENIE_BASE_URL", server.uri())
        .args(["ask", "q"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[action] (panel) open search page"))
        .stderr(predicate::str::contains("quota"));
}

#[tokio::test]
async fn test_ask_fails_on_server_error() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let genie_home = temp_genie_home();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    cargo_bin_cmd!("genie")
        .env("GENIE_HOME", genie_home.path())
        .env("GENIE_BASE_URL", server.uri())
        .args(["ask", "q"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Request failed"))
        .stderr(predicate::str::contains("HTTP 500"));
}

#[tokio::test]
async fn test_ask_records_session_for_sessions_list() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let genie_home = temp_genie_home();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(sse_response(&agent_run_sse("done")))
        .expect(2)
        .mount(&server)
        .await;

    for query in ["weekend in Porto", "and the return trip?"] {
        cargo_bin_cmd!("genie")
            .env("GENIE_HOME", genie_home.path())
            .env("GENIE_BASE_URL", server.uri())
            .args(["ask", "--session", "s-porto", query])
            .assert()
            .success();
    }

    cargo_bin_cmd!("genie")
        .env("GENIE_HOME", genie_home.path())
        .args(["sessions", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Today (1)"))
        .stdout(predicate::str::contains("s-porto"))
        .stdout(predicate::str::contains("weekend in Porto"));

    let raw = std::fs::read_to_string(genie_home.path().join("sessions.json")).unwrap();
    let sessions: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["messageCount"], 2);
    assert_eq!(sessions[0]["lastMessage"], "and the return trip?");
}

#[test]
fn test_ask_rejects_empty_query_without_network() {
    let genie_home = temp_genie_home();

    cargo_bin_cmd!("genie")
        .env("GENIE_HOME", genie_home.path())
        .env("GENIE_BASE_URL", "http://127.0.0.1:9")
        .args(["ask", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("empty"));

    assert!(!genie_home.path().join("sessions.json").exists());
}

#[test]
fn test_ask_rejects_oversized_attachment() {
    let genie_home = temp_genie_home();
    let attachment = genie_home.path().join("big.bin");
    std::fs::write(&attachment, vec![0u8; 2048]).unwrap();
    std::fs::write(
        genie_home.path().join("config.toml"),
        "[attachments]\nmax_file_bytes = 1024\n",
    )
    .unwrap();

    cargo_bin_cmd!("genie")
        .env("GENIE_HOME", genie_home.path())
        .env("GENIE_BASE_URL", "http://127.0.0.1:9")
        .args(["ask", "--file", attachment.to_str().unwrap(), "summarize this"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("big.bin"));
}
