//! Sidebar session list with confirmed rename/delete.

use chrono::{DateTime, TimeZone, Utc};

use super::categorize::{CategorizedSessions, categorize};
use super::model::Session;

/// A destructive change waiting for the user to confirm it.
///
/// Dropping it cancels the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingMutation {
    Rename { session_id: String, title: String },
    Delete { session_id: String },
}

impl PendingMutation {
    pub fn session_id(&self) -> &str {
        match self {
            PendingMutation::Rename { session_id, .. } | PendingMutation::Delete { session_id } => {
                session_id
            }
        }
    }

    /// Question to put in front of the user.
    pub fn prompt(&self) -> String {
        match self {
            PendingMutation::Rename { title, .. } => {
                format!("Rename this conversation to \"{title}\"?")
            }
            PendingMutation::Delete { .. } => {
                "Delete this conversation? This cannot be undone.".to_string()
            }
        }
    }

    pub fn confirm(self) -> ConfirmedMutation {
        ConfirmedMutation(self)
    }
}

/// A mutation the user agreed to. Only [`PendingMutation::confirm`] makes one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedMutation(PendingMutation);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationOutcome {
    pub applied: bool,
    /// The selected session was deleted; whatever displays it should clear.
    pub deselected: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SessionList {
    sessions: Vec<Session>,
    selected: Option<String>,
}

impl SessionList {
    pub fn new(sessions: Vec<Session>) -> Self {
        Self {
            sessions,
            selected: None,
        }
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn selected(&self) -> Option<&Session> {
        self.selected.as_deref().and_then(|id| self.get(id))
    }

    pub fn select(&mut self, id: &str) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.selected = Some(id.to_string());
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Returns the session for `id`, creating it from `query` if needed.
    pub fn ensure_session(&mut self, id: &str, query: &str, now: DateTime<Utc>) -> &Session {
        let pos = match self.sessions.iter().position(|s| s.id == id) {
            Some(pos) => pos,
            None => {
                self.sessions.insert(0, Session::new(id, query, now));
                0
            }
        };
        &self.sessions[pos]
    }

    /// Records new activity on a session.
    pub fn touch(&mut self, id: &str, now: DateTime<Utc>, last_message: Option<&str>) -> bool {
        let Some(session) = self.sessions.iter_mut().find(|s| s.id == id) else {
            return false;
        };
        session.updated_at = now;
        session.message_count += 1;
        if let Some(message) = last_message {
            session.last_message = Some(message.to_string());
        }
        true
    }

    /// Starts a rename. `None` for unknown sessions or a blank title.
    pub fn request_rename(&self, id: &str, title: &str) -> Option<PendingMutation> {
        let title = title.trim();
        if title.is_empty() || self.get(id).is_none() {
            return None;
        }
        Some(PendingMutation::Rename {
            session_id: id.to_string(),
            title: title.to_string(),
        })
    }

    pub fn request_delete(&self, id: &str) -> Option<PendingMutation> {
        self.get(id).map(|_| PendingMutation::Delete {
            session_id: id.to_string(),
        })
    }

    pub fn apply(&mut self, mutation: ConfirmedMutation) -> MutationOutcome {
        match mutation.0 {
            PendingMutation::Rename { session_id, title } => {
                let Some(session) = self.sessions.iter_mut().find(|s| s.id == session_id) else {
                    return MutationOutcome::default();
                };
                session.title = title;
                MutationOutcome {
                    applied: true,
                    deselected: false,
                }
            }
            PendingMutation::Delete { session_id } => {
                let before = self.sessions.len();
                self.sessions.retain(|s| s.id != session_id);
                let applied = self.sessions.len() != before;
                let deselected = self.selected.as_deref() == Some(session_id.as_str());
                if deselected {
                    self.selected = None;
                }
                tracing::debug!(session_id = %session_id, applied, deselected, "Session deleted");
                MutationOutcome {
                    applied,
                    deselected,
                }
            }
        }
    }

    pub fn categorize<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> CategorizedSessions {
        categorize(&self.sessions, now)
    }
}
