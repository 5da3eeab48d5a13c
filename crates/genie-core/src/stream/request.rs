use serde::{Deserialize, Serialize};

use crate::chat::ModeFlags;

/// Outbound body of a streaming query.
///
/// Mode flags travel as `0` / `1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub session_id: String,
    pub request_id: String,
    pub query: String,
    pub deep_think: u8,
    pub search_enabled: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_style: Option<String>,
}

impl ChatRequest {
    pub fn new(
        session_id: impl Into<String>,
        request_id: impl Into<String>,
        query: impl Into<String>,
        mode: ModeFlags,
        output_style: Option<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            request_id: request_id.into(),
            query: query.into(),
            deep_think: u8::from(mode.deep_think),
            search_enabled: u8::from(mode.search_enabled),
            output_style,
        }
    }

    pub fn mode(&self) -> ModeFlags {
        ModeFlags {
            deep_think: self.deep_think != 0,
            search_enabled: self.search_enabled != 0,
        }
    }
}
