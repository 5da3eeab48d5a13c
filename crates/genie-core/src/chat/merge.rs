//! Folds one data-frame payload into a transcript entry.

use crate::chat::model::{EventData, MessageType, Plan, Task, TranscriptEntry};

/// Returns `acc` with `event` applied. `acc` itself is left untouched.
///
/// - A task id already present patches that task where it stands; a new id
///   is appended. Payloads without a task id or (for new ids) without a
///   message type add no task.
/// - `thought` / `response` follow [`TextUpdate`](crate::chat::model::TextUpdate).
///   A payload identical to the last text-carrying payload for the same task
///   is a redelivery and leaves the text alone.
/// - `taskStatus`, `plan`, `responseType` and `tip` are last-write-wins.
/// - A payload `plan` wins over one read from a `plan` task. A `plan` task
///   whose content holds no steps still gives the entry an (empty) plan if it
///   has none yet.
///
/// Applying the same payload twice gives the same result as applying it once.
pub fn merge(acc: &TranscriptEntry, event: &EventData) -> TranscriptEntry {
    let mut next = acc.clone();

    let mut plan_from_task = None;
    if let Some(id) = event.task_id() {
        let merged = match next.task_index.get(id).copied() {
            Some(pos) => {
                let patched = next.tasks[pos].patched(event);
                next.replace_task(pos, patched.clone());
                Some(patched)
            }
            None => Task::from_event(id, event).inspect(|task| next.push_task(task.clone())),
        };
        if let Some(task) = merged.filter(|t| t.message_type == MessageType::Plan) {
            plan_from_task = Plan::from_content(&task.content)
                .or_else(|| next.plan.is_none().then(Plan::default));
        }
    }

    if event.has_text() {
        let key = event.task_id().unwrap_or_default().to_string();
        if next.last_text.get(&key) == Some(event) {
            tracing::trace!(task_id = %key, "Skipping redelivered text update");
        } else {
            if let Some(update) = &event.thought {
                next.thought = update.apply(&next.thought);
            }
            if let Some(update) = &event.response {
                next.response = update.apply(&next.response);
            }
            next.last_text.insert(key, event.clone());
        }
    }
    if let Some(status) = event.task_status {
        next.task_status = status;
    }
    if let Some(plan) = event.plan.clone().or(plan_from_task) {
        next.plan = Some(plan);
    }
    if let Some(response_type) = &event.response_type {
        next.response_type.clone_from(response_type);
    }
    if let Some(tip) = &event.tip {
        next.tip.clone_from(tip);
    }

    next
}
