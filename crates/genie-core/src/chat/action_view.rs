//! Action panel state machine.
//!
//! The panel is either closed or showing one of three views. Classifier
//! output drives the automatic transitions:
//! - `Closed → TaskFollow` the first time a request produces a progress task
//!   (auto-open). Closing the panel disarms this until the next request.
//! - `TaskFollow` whenever the active task changes while the panel is open.
//!
//! Everything else is a user intent. Request completion never moves the panel.

use std::sync::Arc;

use crate::chat::classify::TaskView;
use crate::chat::model::{FileRef, Task};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActionView {
    #[default]
    Closed,
    /// Follows the active (or user-selected) task.
    TaskFollow,
    FilePreview(FileRef),
    PlanView,
}

impl ActionView {
    /// Any open state means the renderer must allocate panel width.
    pub fn is_open(&self) -> bool {
        !matches!(self, ActionView::Closed)
    }
}

/// Target of [`ActionViewController::change_action_view`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionViewKind {
    TaskFollow,
    FilePreview,
    PlanView,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCause {
    AutoOpen,
    ActiveTaskChanged,
    TaskSelected,
    FileSelected,
    PlanOpened,
    ViewChanged,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: ActionView,
    pub to: ActionView,
    pub cause: TransitionCause,
}

#[derive(Debug, Clone)]
pub struct ActionViewController {
    view: ActionView,
    active_task: Option<Arc<Task>>,
    last_file: Option<FileRef>,
    auto_open_armed: bool,
}

impl Default for ActionViewController {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionViewController {
    pub fn new() -> Self {
        Self {
            view: ActionView::Closed,
            active_task: None,
            last_file: None,
            auto_open_armed: true,
        }
    }

    pub fn view(&self) -> &ActionView {
        &self.view
    }

    pub fn is_open(&self) -> bool {
        self.view.is_open()
    }

    /// Task the panel follows in `TaskFollow`.
    pub fn active_task(&self) -> Option<&Arc<Task>> {
        self.active_task.as_ref()
    }

    pub fn auto_open_armed(&self) -> bool {
        self.auto_open_armed
    }

    /// A new request started: auto-open may fire again.
    pub fn begin_request(&mut self) {
        self.auto_open_armed = true;
    }

    /// Reacts to fresh classifier output.
    pub fn on_task_view(&mut self, view: &TaskView) -> Option<Transition> {
        let changed = match &view.active_task {
            Some(task) => {
                let changed = self
                    .active_task
                    .as_ref()
                    .is_none_or(|current| current.id != task.id);
                self.active_task = Some(Arc::clone(task));
                changed
            }
            None => false,
        };

        if !self.is_open() {
            if self.auto_open_armed && view.has_progress() {
                self.auto_open_armed = false;
                return self.transition(ActionView::TaskFollow, TransitionCause::AutoOpen);
            }
            return None;
        }

        if changed {
            return self.follow(true, TransitionCause::ActiveTaskChanged);
        }
        None
    }

    /// User picked a task to follow.
    pub fn select_task(&mut self, task: Arc<Task>) -> Option<Transition> {
        let changed = self
            .active_task
            .as_ref()
            .is_none_or(|current| current.id != task.id);
        self.active_task = Some(task);
        self.follow(changed, TransitionCause::TaskSelected)
    }

    pub fn set_file_preview(&mut self, file: FileRef) -> Option<Transition> {
        self.last_file = Some(file.clone());
        self.transition(ActionView::FilePreview(file), TransitionCause::FileSelected)
    }

    pub fn open_plan_view(&mut self) -> Option<Transition> {
        self.transition(ActionView::PlanView, TransitionCause::PlanOpened)
    }

    /// Switches view by kind. `FilePreview` reopens the last previewed file
    /// and is a no-op when there is none.
    pub fn change_action_view(&mut self, kind: ActionViewKind) -> Option<Transition> {
        let to = match kind {
            ActionViewKind::TaskFollow => ActionView::TaskFollow,
            ActionViewKind::PlanView => ActionView::PlanView,
            ActionViewKind::FilePreview => ActionView::FilePreview(self.last_file.clone()?),
        };
        self.transition(to, TransitionCause::ViewChanged)
    }

    /// User closed the panel. Disarms auto-open for the running request.
    pub fn close(&mut self) -> Option<Transition> {
        self.auto_open_armed = false;
        self.transition(ActionView::Closed, TransitionCause::Closed)
    }

    /// Back to the initial state, e.g. when the displayed session goes away.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Moves to `TaskFollow`. Staying in `TaskFollow` still reports a
    /// transition when the followed task changed.
    fn follow(&mut self, task_changed: bool, cause: TransitionCause) -> Option<Transition> {
        if self.view == ActionView::TaskFollow {
            return task_changed.then(|| Transition {
                from: ActionView::TaskFollow,
                to: ActionView::TaskFollow,
                cause,
            });
        }
        self.transition(ActionView::TaskFollow, cause)
    }

    fn transition(&mut self, to: ActionView, cause: TransitionCause) -> Option<Transition> {
        if self.view == to {
            return None;
        }
        let from = std::mem::replace(&mut self.view, to.clone());
        Some(Transition { from, to, cause })
    }
}
