//! Display classification of merged tasks.

use std::sync::Arc;

use crate::chat::model::{MessageType, Plan, Task, TranscriptEntry};

/// Per-request mode switches chosen in the composer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeFlags {
    pub deep_think: bool,
    pub search_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskCategory {
    /// Intermediate work: thoughts, actions, tool calls, plans.
    Progress,
    /// `result` / `task_summary`.
    Result,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Rendered in the chat flow.
    Inline,
    /// Rendered in the action panel.
    Panel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedTask {
    pub task: Arc<Task>,
    pub category: TaskCategory,
    pub placement: Placement,
}

/// Display-ready view of one transcript entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskView {
    pub task_list: Vec<ClassifiedTask>,
    pub plan: Option<Plan>,
    /// Last task when it is a progress task.
    pub active_task: Option<Arc<Task>>,
    pub mode: ModeFlags,
}

impl TaskView {
    pub fn has_progress(&self) -> bool {
        self.task_list
            .iter()
            .any(|t| t.category == TaskCategory::Progress)
    }

    pub fn inline(&self) -> impl Iterator<Item = &ClassifiedTask> {
        self.task_list
            .iter()
            .filter(|t| t.placement == Placement::Inline)
    }

    pub fn panel(&self) -> impl Iterator<Item = &ClassifiedTask> {
        self.task_list
            .iter()
            .filter(|t| t.placement == Placement::Panel)
    }

    pub fn task(&self, id: &str) -> Option<&Arc<Task>> {
        self.task_list
            .iter()
            .find(|t| t.task.id == id)
            .map(|t| &t.task)
    }
}

/// Classifies every task of `acc` in stable order and extracts the plan.
pub fn classify(acc: &TranscriptEntry, mode: ModeFlags) -> TaskView {
    let task_list: Vec<ClassifiedTask> = acc
        .tasks()
        .iter()
        .map(|task| {
            let category = if task.message_type.is_result() {
                TaskCategory::Result
            } else {
                TaskCategory::Progress
            };
            ClassifiedTask {
                task: Arc::clone(task),
                category,
                placement: placement(&task.message_type, category, mode),
            }
        })
        .collect();

    let active_task = task_list
        .last()
        .filter(|t| t.category == TaskCategory::Progress)
        .map(|t| Arc::clone(&t.task));

    TaskView {
        task_list,
        plan: acc.plan.clone(),
        active_task,
        mode,
    }
}

fn placement(kind: &MessageType, category: TaskCategory, mode: ModeFlags) -> Placement {
    match (category, kind) {
        (TaskCategory::Result, _) => Placement::Inline,
        (TaskCategory::Progress, MessageType::Thought) if !mode.deep_think => Placement::Inline,
        (TaskCategory::Progress, _) => Placement::Panel,
    }
}
