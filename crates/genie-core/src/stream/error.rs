use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Categories of stream failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamErrorKind {
    /// Non-2xx response
    HttpStatus,
    /// Request timed out
    Timeout,
    /// Could not connect
    Connect,
    /// Broken SSE framing or body read failure
    Transport,
    /// Body ended before a terminal frame
    ClosedEarly,
}

impl fmt::Display for StreamErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamErrorKind::HttpStatus => write!(f, "http_status"),
            StreamErrorKind::Timeout => write!(f, "timeout"),
            StreamErrorKind::Connect => write!(f, "connect"),
            StreamErrorKind::Transport => write!(f, "transport"),
            StreamErrorKind::ClosedEarly => write!(f, "closed_early"),
        }
    }
}

/// A fatal failure of one stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamError {
    pub kind: StreamErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional additional details (e.g., raw error body)
    pub details: Option<String>,
}

impl StreamError {
    pub fn new(kind: StreamErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Creates an HTTP status error, lifting a message out of a JSON body when there is one.
    pub fn http_status(status: u16, body: &str) -> Self {
        let details = (!body.is_empty()).then(|| body.to_string());
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .as_ref()
            .and_then(json_error_message)
            .map_or_else(|| format!("HTTP {status}"), |msg| format!("HTTP {status}: {msg}"));
        Self {
            kind: StreamErrorKind::HttpStatus,
            message,
            details,
        }
    }

    pub fn closed_early() -> Self {
        Self::new(
            StreamErrorKind::ClosedEarly,
            "Stream closed before the request finished",
        )
    }

    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::new(StreamErrorKind::Timeout, format!("Request timed out: {e}"))
        } else if e.is_connect() {
            Self::new(StreamErrorKind::Connect, format!("Connection failed: {e}"))
        } else {
            Self::new(StreamErrorKind::Transport, format!("Network error: {e}"))
        }
    }
}

fn json_error_message(json: &Value) -> Option<String> {
    json.get("error")
        .and_then(|e| e.get("message"))
        .or_else(|| json.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for StreamError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_extracts_nested_message() {
        let err = StreamError::http_status(429, r#"{"error":{"message":"slow down"}}"#);
        assert_eq!(err.kind, StreamErrorKind::HttpStatus);
        assert_eq!(err.message, "HTTP 429: slow down");
        assert!(err.details.is_some());
    }

    #[test]
    fn test_http_status_extracts_flat_message() {
        let err = StreamError::http_status(500, r#"{"code":1,"message":"boom"}"#);
        assert_eq!(err.message, "HTTP 500: boom");
    }

    #[test]
    fn test_http_status_plain_body() {
        let err = StreamError::http_status(502, "bad gateway");
        assert_eq!(err.message, "HTTP 502");
        assert_eq!(err.details.as_deref(), Some("bad gateway"));

        let empty = StreamError::http_status(503, "");
        assert!(empty.details.is_none());
    }
}
