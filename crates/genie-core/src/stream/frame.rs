//! Frame dispatcher: sorts raw stream units into heartbeat, data or terminal.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chat::model::EventData;

pub const PACKAGE_HEARTBEAT: &str = "heartbeat";
pub const STATUS_TOKEN_USE_UP: &str = "tokenUseUp";

/// Wire shape of one stream unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_type: Option<String>,
    #[serde(default)]
    pub finished: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_map: Option<ResultMap>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMap {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_data: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    /// `finished = true` with nothing left to merge.
    Finished,
    /// `status = "tokenUseUp"`.
    QuotaExhausted,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Keep-alive, or a frame with nothing usable in it.
    Heartbeat,
    /// A payload to merge. `finished` makes it the last one.
    Data { event: EventData, finished: bool },
    Terminal(Terminal),
}

impl Frame {
    /// How the stream ends if this frame is the last one, if it is.
    pub fn terminal(&self) -> Option<Terminal> {
        match self {
            Frame::Terminal(terminal) => Some(*terminal),
            Frame::Data { finished: true, .. } => Some(Terminal::Finished),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Heartbeat => "heartbeat",
            Frame::Data { .. } => "data",
            Frame::Terminal(Terminal::Finished) => "finished",
            Frame::Terminal(Terminal::QuotaExhausted) => "quota",
        }
    }
}

impl EventFrame {
    pub fn dispatch(self) -> Frame {
        if self.status.as_deref() == Some(STATUS_TOKEN_USE_UP) {
            return Frame::Terminal(Terminal::QuotaExhausted);
        }
        if self.package_type.as_deref() == Some(PACKAGE_HEARTBEAT) {
            return if self.finished {
                Frame::Terminal(Terminal::Finished)
            } else {
                Frame::Heartbeat
            };
        }

        let payload = self.result_map.and_then(|m| m.event_data);
        let event = match payload {
            Some(value @ Value::Object(_)) => match serde_json::from_value::<EventData>(value) {
                Ok(event) => Some(event),
                Err(err) => {
                    tracing::warn!(error = %err, "Dropping malformed event payload");
                    None
                }
            },
            Some(Value::Null) | None => None,
            Some(other) => {
                tracing::warn!(payload = %other, "Dropping non-object event payload");
                None
            }
        };

        match (event, self.finished) {
            (Some(event), finished) => Frame::Data { event, finished },
            (None, true) => Frame::Terminal(Terminal::Finished),
            (None, false) => Frame::Heartbeat,
        }
    }
}

/// Parses the text of one SSE `data` field.
///
/// Unparseable input is logged and treated like a heartbeat.
pub fn parse_frame(data: &str) -> Frame {
    let data = data.trim();
    if data.is_empty() {
        return Frame::Heartbeat;
    }
    match serde_json::from_str::<EventFrame>(data) {
        Ok(frame) => frame.dispatch(),
        Err(err) => {
            tracing::warn!(error = %err, "Dropping unparseable frame");
            Frame::Heartbeat
        }
    }
}
