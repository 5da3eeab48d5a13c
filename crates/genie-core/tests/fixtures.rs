//! SSE fixture helpers for integration tests.

#![allow(dead_code)]

use genie_core::config::ServerConfig;
use genie_core::stream::StreamClient;
use wiremock::{MockServer, ResponseTemplate};

pub const SSE_PLAN_THEN_RESULT: &str = include_str!("fixtures/plan_then_result.sse");
pub const SSE_QUOTA_MID_STREAM: &str = include_str!("fixtures/quota_mid_stream.sse");
pub const SSE_CLOSED_EARLY: &str = include_str!("fixtures/closed_early.sse");

/// Plan task, heartbeat, then a finished result carrying `result`.
pub fn plan_then_result_sse(result: &str) -> String {
    SSE_PLAN_THEN_RESULT.replace("{{RESULT}}", &escape_json(result))
}

/// Wrap SSE body string in a ResponseTemplate.
pub fn sse_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body.to_string())
}

pub fn client_for(server: &MockServer) -> StreamClient {
    let config = ServerConfig {
        base_url: server.uri(),
        ..ServerConfig::default()
    };
    StreamClient::new(&config).unwrap()
}

pub fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

fn escape_json(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
