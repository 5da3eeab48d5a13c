//! Chat view reducer.
//!
//! Owns the transcript and the action panel. Stream events go in through
//! [`ChatView::apply`]; what the renderer should do about them comes out as
//! [`ChatEffect`]s. Only the most recently started request drives the task
//! view and the panel; older requests still update their own entries.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{Result, bail};

use crate::chat::action_view::{ActionViewController, Transition};
use crate::chat::classify::{ModeFlags, TaskView, classify};
use crate::chat::merge::merge;
use crate::chat::model::{EntryOutcome, TranscriptEntry};
use crate::input::InputInfo;
use crate::stream::{ChatRequest, Frame, StreamError, StreamEvent, Terminal};

/// Notice shown when the server reports the quota as used up.
pub const QUOTA_NOTICE: &str = "Your usage quota has been used up. Please try again later.";

#[derive(Debug, Clone, PartialEq)]
pub enum ChatEffect {
    /// The entry for this request has a new snapshot.
    EntryUpdated { request_id: String },
    /// [`ChatView::task_view`] changed.
    TaskViewChanged,
    /// The action panel moved.
    ActionView(Transition),
    /// The request finished normally.
    Completed { request_id: String },
    /// Blocking notice; the request is over.
    QuotaExceeded { request_id: String, notice: String },
    /// Transport failure; the request is over.
    Failed {
        request_id: String,
        error: StreamError,
    },
}

#[derive(Debug, Default)]
pub struct ChatView {
    entries: Vec<Arc<TranscriptEntry>>,
    positions: HashMap<String, usize>,
    modes: HashMap<String, ModeFlags>,
    detached: HashSet<String>,
    current: Option<String>,
    task_view: Option<TaskView>,
    action_view: ActionViewController,
}

impl ChatView {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Read access
    // ========================================================================

    /// Transcript in submission order.
    pub fn entries(&self) -> &[Arc<TranscriptEntry>] {
        &self.entries
    }

    pub fn entry(&self, request_id: &str) -> Option<&Arc<TranscriptEntry>> {
        self.positions
            .get(request_id)
            .and_then(|&pos| self.entries.get(pos))
    }

    /// Classification of the most recent request.
    pub fn task_view(&self) -> Option<&TaskView> {
        self.task_view.as_ref()
    }

    pub fn current_request(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn action_view(&self) -> &ActionViewController {
        &self.action_view
    }

    /// User intents on the panel go straight to the controller.
    pub fn action_view_mut(&mut self) -> &mut ActionViewController {
        &mut self.action_view
    }

    /// True while some attached request is still loading.
    pub fn has_pending(&self) -> bool {
        self.entries
            .iter()
            .any(|e| e.loading && !self.detached.contains(&e.request_id))
    }

    pub fn is_detached(&self, request_id: &str) -> bool {
        self.detached.contains(request_id)
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Appends the loading entry for a new query and returns the body to send.
    pub fn begin_request(
        &mut self,
        session_id: &str,
        request_id: &str,
        input: &InputInfo,
    ) -> Result<ChatRequest> {
        if self.positions.contains_key(request_id) {
            bail!("Request {request_id} already exists");
        }

        let entry = TranscriptEntry::new(session_id, request_id, input);
        self.positions
            .insert(request_id.to_string(), self.entries.len());
        self.entries.push(Arc::new(entry));
        self.modes.insert(request_id.to_string(), input.mode());
        self.current = Some(request_id.to_string());
        self.task_view = None;
        self.action_view.begin_request();

        tracing::debug!(session_id, request_id, "Request started");

        Ok(ChatRequest::new(
            session_id,
            request_id,
            input.message.clone(),
            input.mode(),
            input.output_style.clone(),
        ))
    }

    /// Folds one stream event into the entry for `request_id`.
    ///
    /// Events for detached, unknown or already finished requests are dropped.
    pub fn apply(&mut self, request_id: &str, event: StreamEvent) -> Vec<ChatEffect> {
        if self.detached.contains(request_id) {
            tracing::trace!(request_id, "Dropping event for detached request");
            return vec![];
        }
        let Some(&pos) = self.positions.get(request_id) else {
            tracing::warn!(request_id, "Dropping event for unknown request");
            return vec![];
        };
        let entry = Arc::clone(&self.entries[pos]);
        if !entry.loading {
            tracing::debug!(request_id, "Dropping event after request ended");
            return vec![];
        }

        match event {
            StreamEvent::Frame(Frame::Heartbeat) => vec![],
            StreamEvent::Frame(Frame::Data { event, finished }) => {
                let mut next = merge(&entry, &event);
                if finished {
                    next = next.finish(EntryOutcome::Finished);
                }
                let mut effects = self.store(pos, next);
                if finished {
                    effects.push(ChatEffect::Completed {
                        request_id: request_id.to_string(),
                    });
                }
                effects
            }
            StreamEvent::Frame(Frame::Terminal(Terminal::Finished)) => {
                let mut effects = self.store(pos, entry.finish(EntryOutcome::Finished));
                effects.push(ChatEffect::Completed {
                    request_id: request_id.to_string(),
                });
                effects
            }
            StreamEvent::Frame(Frame::Terminal(Terminal::QuotaExhausted)) => {
                tracing::info!(request_id, "Quota used up");
                let mut effects = self.store(pos, entry.finish(EntryOutcome::QuotaExceeded));
                effects.push(ChatEffect::QuotaExceeded {
                    request_id: request_id.to_string(),
                    notice: QUOTA_NOTICE.to_string(),
                });
                effects
            }
            StreamEvent::Error(error) => self.fail(pos, &entry, error),
            StreamEvent::Closed => self.fail(pos, &entry, StreamError::closed_early()),
        }
    }

    /// Stops listening to `request_id`. The entry keeps whatever it had.
    ///
    /// Returns false if it was already detached or never existed.
    pub fn detach(&mut self, request_id: &str) -> bool {
        if !self.positions.contains_key(request_id) {
            return false;
        }
        self.detached.insert(request_id.to_string())
    }

    /// User stop: detaches and marks the entry as cancelled.
    pub fn stop(&mut self, request_id: &str) -> Vec<ChatEffect> {
        let Some(&pos) = self.positions.get(request_id) else {
            return vec![];
        };
        let entry = Arc::clone(&self.entries[pos]);
        self.detach(request_id);
        if !entry.loading {
            return vec![];
        }
        self.store(pos, entry.finish(EntryOutcome::Cancelled))
    }

    /// Drops the whole transcript, e.g. when the displayed session is deleted.
    /// Safe to call with nothing open.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn fail(
        &mut self,
        pos: usize,
        entry: &TranscriptEntry,
        error: StreamError,
    ) -> Vec<ChatEffect> {
        let request_id = entry.request_id.clone();
        tracing::warn!(request_id = %request_id, kind = %error.kind, error = %error, "Request failed");
        let mut effects = self.store(
            pos,
            entry.finish(EntryOutcome::Failed {
                message: error.message.clone(),
            }),
        );
        effects.push(ChatEffect::Failed { request_id, error });
        effects
    }

    /// Replaces the entry at `pos` and refreshes the task view if it is current.
    fn store(&mut self, pos: usize, entry: TranscriptEntry) -> Vec<ChatEffect> {
        let request_id = entry.request_id.clone();
        let entry = Arc::new(entry);
        self.entries[pos] = Arc::clone(&entry);

        let mut effects = vec![ChatEffect::EntryUpdated {
            request_id: request_id.clone(),
        }];
        if self.current.as_deref() != Some(request_id.as_str()) {
            return effects;
        }

        let mode = self.modes.get(&request_id).copied().unwrap_or_default();
        let view = classify(&entry, mode);
        if self.task_view.as_ref() != Some(&view) {
            if let Some(transition) = self.action_view.on_task_view(&view) {
                effects.push(ChatEffect::ActionView(transition));
            }
            self.task_view = Some(view);
            effects.push(ChatEffect::TaskViewChanged);
        }
        effects
    }
}
