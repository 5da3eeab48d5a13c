//! Transcript data model: entries, tasks, plans and the event payload.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::input::InputInfo;

/// Tip shown on a freshly created entry until the server sends its own.
pub const DEFAULT_TIP: &str = "Task received, starting now...";

// ============================================================================
// Message types
// ============================================================================

/// Task message tag. Unknown tags are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageType {
    Thought,
    Action,
    Tool,
    Plan,
    File,
    Result,
    TaskSummary,
    Other(String),
}

impl MessageType {
    pub fn as_str(&self) -> &str {
        match self {
            MessageType::Thought => "thought",
            MessageType::Action => "action",
            MessageType::Tool => "tool",
            MessageType::Plan => "plan",
            MessageType::File => "file",
            MessageType::Result => "result",
            MessageType::TaskSummary => "task_summary",
            MessageType::Other(tag) => tag,
        }
    }

    /// `result` and `task_summary` belong in the chat flow; everything else
    /// is progress.
    pub fn is_result(&self) -> bool {
        matches!(self, MessageType::Result | MessageType::TaskSummary)
    }
}

impl From<String> for MessageType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "thought" => MessageType::Thought,
            "action" => MessageType::Action,
            "tool" => MessageType::Tool,
            "plan" => MessageType::Plan,
            "file" => MessageType::File,
            "result" => MessageType::Result,
            "task_summary" => MessageType::TaskSummary,
            _ => MessageType::Other(tag),
        }
    }
}

impl From<&str> for MessageType {
    fn from(tag: &str) -> Self {
        MessageType::from(tag.to_string())
    }
}

impl From<MessageType> for String {
    fn from(value: MessageType) -> Self {
        match value {
            MessageType::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Entry status
// ============================================================================

/// Entry-level status reported by the server as a small integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum TaskStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Other(i64),
}

impl From<i64> for TaskStatus {
    fn from(code: i64) -> Self {
        match code {
            0 => TaskStatus::Pending,
            1 => TaskStatus::Running,
            2 => TaskStatus::Completed,
            3 => TaskStatus::Failed,
            other => TaskStatus::Other(other),
        }
    }
}

impl From<TaskStatus> for i64 {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Pending => 0,
            TaskStatus::Running => 1,
            TaskStatus::Completed => 2,
            TaskStatus::Failed => 3,
            TaskStatus::Other(code) => code,
        }
    }
}

// ============================================================================
// Tasks and plans
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub message_type: MessageType,
    #[serde(default)]
    pub content: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl Task {
    /// Builds a task from the first payload that mentions `id`.
    ///
    /// Returns `None` when the payload does not say what kind of task it is.
    pub(crate) fn from_event(id: &str, event: &EventData) -> Option<Self> {
        let message_type = event.message_type.clone()?;
        Some(Self {
            id: id.to_string(),
            message_type,
            content: event.content.clone().unwrap_or(Value::Null),
            status: event.status.clone(),
            timestamp: event.timestamp,
        })
    }

    /// Returns a copy with the fields carried by `event` overwritten.
    pub(crate) fn patched(&self, event: &EventData) -> Self {
        let mut next = self.clone();
        if let Some(message_type) = &event.message_type {
            next.message_type = message_type.clone();
        }
        if let Some(content) = &event.content {
            next.content = content.clone();
        }
        if let Some(status) = &event.status {
            next.status = Some(status.clone());
        }
        if let Some(timestamp) = event.timestamp {
            next.timestamp = Some(timestamp);
        }
        next
    }

    /// Short human-readable summary of the content.
    pub fn summary(&self) -> String {
        content_text(&self.content)
    }
}

/// Best-effort text extraction from a task's free-form content.
pub fn content_text(content: &Value) -> String {
    match content {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Object(map) => ["text", "content", "message", "title", "name"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map_or_else(|| content.to_string(), str::to_string),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    #[serde(default, deserialize_with = "deserialize_steps")]
    pub steps: Vec<PlanStep>,
    #[serde(default)]
    pub current_step_index: usize,
}

impl Plan {
    /// Reads a plan out of a `plan` task's content.
    ///
    /// Accepts a plan object, a bare list of steps, or a JSON string holding
    /// either. Anything else yields `None`.
    pub fn from_content(content: &Value) -> Option<Self> {
        match content {
            Value::String(raw) => serde_json::from_str::<Value>(raw)
                .ok()
                .filter(|v| !v.is_string())
                .and_then(|v| Self::from_content(&v)),
            Value::Array(_) => {
                let steps = serde_json::from_value::<Vec<StepWire>>(content.clone()).ok()?;
                Some(Self {
                    steps: steps.into_iter().map(PlanStep::from).collect(),
                    current_step_index: 0,
                })
            }
            Value::Object(_) => serde_json::from_value::<Plan>(content.clone())
                .ok()
                .filter(|plan| !plan.steps.is_empty()),
            _ => None,
        }
    }

    pub fn current_step(&self) -> Option<&PlanStep> {
        self.steps.get(self.current_step_index)
    }
}

/// Steps arrive either as plain titles or as objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum StepWire {
    Title(String),
    Step {
        #[serde(alias = "name")]
        title: String,
        #[serde(default)]
        status: Option<String>,
    },
}

impl From<StepWire> for PlanStep {
    fn from(wire: StepWire) -> Self {
        match wire {
            StepWire::Title(title) => PlanStep {
                title,
                status: None,
            },
            StepWire::Step { title, status } => PlanStep { title, status },
        }
    }
}

fn deserialize_steps<'de, D>(deserializer: D) -> Result<Vec<PlanStep>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let wire = Vec::<StepWire>::deserialize(deserializer)?;
    Ok(wire.into_iter().map(PlanStep::from).collect())
}

// ============================================================================
// Incremental text
// ============================================================================

/// `thought` / `response` update. A bare string replaces the whole text; an
/// object appends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextUpdate {
    Snapshot(String),
    Delta {
        delta: String,
        /// Character position the delta starts at. Text past it is dropped
        /// before appending, so replaying a delta is harmless.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        offset: Option<usize>,
    },
}

impl TextUpdate {
    pub fn apply(&self, current: &str) -> String {
        match self {
            TextUpdate::Snapshot(text) => text.clone(),
            TextUpdate::Delta { delta, offset } => {
                let mut next = match offset {
                    Some(offset) => current.chars().take(*offset).collect(),
                    None => current.to_string(),
                };
                next.push_str(delta);
                next
            }
        }
    }
}

// ============================================================================
// Event payload
// ============================================================================

/// The `resultMap.eventData` object of a data frame.
///
/// Every field is optional; absent fields leave the accumulator untouched.
/// Identity and text fields are read strictly. The auxiliary fields accept
/// whatever JSON type the server happens to send and read as absent when
/// they cannot be interpreted, so a well-identified task is never lost to a
/// badly typed timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventData {
    /// Task id this payload describes.
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub task_id: Option<String>,
    /// Same as `task_id`; some servers send the task's own `id` key.
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_message_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub message_type: Option<MessageType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    /// Task-level status string.
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<String>,
    /// Epoch milliseconds.
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<i64>,
    /// Entry-level status.
    #[serde(
        default,
        deserialize_with = "lenient_task_status",
        skip_serializing_if = "Option::is_none"
    )]
    pub task_status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<TextUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<TextUpdate>,
    #[serde(
        default,
        deserialize_with = "lenient_plan",
        skip_serializing_if = "Option::is_none"
    )]
    pub plan: Option<Plan>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub response_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub tip: Option<String>,
}

impl EventData {
    /// The task id (`taskId`, else `id`), ignoring blank values.
    pub fn task_id(&self) -> Option<&str> {
        [self.task_id.as_deref(), self.id.as_deref()]
            .into_iter()
            .flatten()
            .find(|id| !id.trim().is_empty())
    }

    /// Whether the payload touches `thought` or `response`.
    pub fn has_text(&self) -> bool {
        self.thought.is_some() || self.response.is_some()
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_message_type<'de, D>(deserializer: D) -> Result<Option<MessageType>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?
        .filter(|tag| !tag.trim().is_empty())
        .map(MessageType::from))
}

fn lenient_task_status<'de, D>(deserializer: D) -> Result<Option<TaskStatus>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().map(TaskStatus::from),
        Value::String(s) => s.trim().parse::<i64>().ok().map(TaskStatus::from),
        _ => None,
    })
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => parse_timestamp(&s),
        _ => None,
    })
}

fn lenient_plan<'de, D>(deserializer: D) -> Result<Option<Plan>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(Plan::from_content(&value))
}

/// Epoch millis from a number string, RFC 3339, or `YYYY-MM-DD HH:MM:SS`
/// (read as UTC).
fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>()
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|t| t.timestamp_millis())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|t| t.and_utc().timestamp_millis())
        })
}

// ============================================================================
// Files
// ============================================================================

/// A file attached to a query or produced by a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    pub name: String,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl FileRef {
    pub fn new(name: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            url: None,
            mime_type: None,
        }
    }
}

// ============================================================================
// Transcript entry
// ============================================================================

/// How a transcript entry stopped loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    Finished,
    QuotaExceeded,
    Failed { message: String },
    Cancelled,
}

/// One query and everything the server streamed back for it.
///
/// Entries are immutable snapshots: merging produces a new entry, and tasks
/// are shared between snapshots through `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    pub session_id: String,
    pub request_id: String,
    pub query: String,
    pub files: Vec<FileRef>,
    pub response_type: String,
    pub loading: bool,
    pub force_stop: bool,
    pub thought: String,
    pub response: String,
    pub task_status: TaskStatus,
    pub tip: String,
    pub plan: Option<Plan>,
    pub outcome: Option<EntryOutcome>,
    pub(crate) tasks: Vec<Arc<Task>>,
    pub(crate) task_index: HashMap<String, usize>,
    /// Last payload that carried `thought`/`response`, per task id (`""`
    /// for payloads without one). A verbatim repeat is a redelivery.
    pub(crate) last_text: HashMap<String, EventData>,
}

impl TranscriptEntry {
    /// Creates the loading entry for a freshly submitted query.
    pub fn new(
        session_id: impl Into<String>,
        request_id: impl Into<String>,
        input: &InputInfo,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            request_id: request_id.into(),
            query: input.message.clone(),
            files: input.files.clone(),
            response_type: "txt".to_string(),
            loading: true,
            force_stop: false,
            thought: String::new(),
            response: String::new(),
            task_status: TaskStatus::Pending,
            tip: DEFAULT_TIP.to_string(),
            plan: None,
            outcome: None,
            tasks: Vec::new(),
            task_index: HashMap::new(),
            last_text: HashMap::new(),
        }
    }

    /// Tasks in first-seen order.
    pub fn tasks(&self) -> &[Arc<Task>] {
        &self.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Arc<Task>> {
        self.task_index.get(id).and_then(|&pos| self.tasks.get(pos))
    }

    pub fn is_finished(&self) -> bool {
        !self.loading
    }

    /// Returns a copy that is no longer loading.
    pub fn finish(&self, outcome: EntryOutcome) -> Self {
        let mut next = self.clone();
        next.loading = false;
        if outcome == EntryOutcome::Cancelled {
            next.force_stop = true;
        }
        next.outcome = Some(outcome);
        next
    }

    pub(crate) fn push_task(&mut self, task: Task) {
        self.task_index.insert(task.id.clone(), self.tasks.len());
        self.tasks.push(Arc::new(task));
    }

    pub(crate) fn replace_task(&mut self, pos: usize, task: Task) {
        if let Some(slot) = self.tasks.get_mut(pos) {
            *slot = Arc::new(task);
        }
    }
}
