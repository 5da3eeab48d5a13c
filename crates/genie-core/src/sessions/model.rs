use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::model::Task;

/// One conversation in the sidebar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub query: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<Task>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    #[serde(default)]
    pub message_count: usize,
}

impl Session {
    /// A session created by its first query; the query doubles as the title.
    pub fn new(id: impl Into<String>, query: impl Into<String>, now: DateTime<Utc>) -> Self {
        let id = id.into();
        let query = query.into();
        let trimmed = query.trim();
        let title = if trimmed.is_empty() {
            format!("Chat {id}")
        } else {
            trimmed.to_string()
        };
        Self {
            id,
            title,
            query,
            created_at: now,
            updated_at: now,
            tasks: Vec::new(),
            last_message: None,
            message_count: 0,
        }
    }
}

/// Where the session list lives between runs.
pub trait SessionStore {
    fn load(&self) -> Result<Vec<Session>>;
    fn save(&self, sessions: &[Session]) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_uses_query_as_title() {
        let now = Utc::now();
        let session = Session::new("s1", "  weekend plans ", now);

        assert_eq!(session.title, "weekend plans");
        assert_eq!(session.created_at, session.updated_at);
        assert_eq!(Session::new("s2", " ", now).title, "Chat s2");
    }

    #[test]
    fn test_parses_minimal_json() {
        let session: Session = serde_json::from_str(
            r#"{"id":"a","title":"t","createdAt":"2025-01-01T00:00:00Z","updatedAt":"2025-01-02T08:30:00Z"}"#,
        )
        .unwrap();

        assert_eq!(session.message_count, 0);
        assert!(session.tasks.is_empty());
        assert_eq!(session.updated_at.to_rfc3339(), "2025-01-02T08:30:00+00:00");
    }
}
