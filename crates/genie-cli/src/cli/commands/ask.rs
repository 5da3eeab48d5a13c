//! Ask command: stream one query and print the transcript as it grows.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use genie_core::chat::{
    ActionView, ChatEffect, ChatRuntime, ChatView, FileRef, MessageType, Placement, Plan,
    TaskCategory,
};
use genie_core::config::Config;
use genie_core::input::InputInfo;
use genie_core::sessions::{JsonFileStore, SessionList, SessionStore};
use genie_core::stream::StreamClient;

pub struct AskOptions {
    pub query: String,
    pub deep_think: bool,
    pub search: bool,
    pub output_style: Option<String>,
    pub session: Option<String>,
    pub files: Vec<PathBuf>,
    pub sessions: PathBuf,
}

pub async fn run(opts: AskOptions, config: &Config) -> Result<()> {
    let client = StreamClient::new(&config.server).context("create stream client")?;
    let mut runtime = ChatRuntime::new(client, config.attachments);

    let mut input = InputInfo::with_defaults(opts.query, &config.chat);
    input.deep_think |= opts.deep_think;
    input.search_enabled |= opts.search;
    if opts.output_style.is_some() {
        input.output_style = opts.output_style;
    }
    input.files = attachments(&opts.files)?;
    let query = input.message.clone();

    let session_id = opts
        .session
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let request_id = runtime.send_message(&session_id, &input)?;
    tracing::info!(session_id = %session_id, request_id = %request_id, "Streaming query");
    record_session(&opts.sessions, &session_id, &query)?;

    let mut printer = TranscriptPrinter::default();
    runtime
        .run_until_idle(|view, effect| printer.on_effect(view, effect))
        .await;

    match printer.failure {
        Some(message) => Err(anyhow!("Request failed: {message}")),
        None => Ok(()),
    }
}

/// Puts the session at the top of the list (creating it on first use) and
/// counts the submitted message.
fn record_session(file: &Path, session_id: &str, query: &str) -> Result<()> {
    let store = JsonFileStore::new(file);
    let sessions = store
        .load()
        .with_context(|| format!("load sessions from {}", file.display()))?;
    let mut list = SessionList::new(sessions);

    let now = Utc::now();
    list.ensure_session(session_id, query, now);
    list.touch(session_id, now, Some(query));
    store.save(list.sessions()).context("save sessions")
}

fn attachments(paths: &[PathBuf]) -> Result<Vec<FileRef>> {
    paths
        .iter()
        .map(|path| {
            let meta = fs::metadata(path)
                .with_context(|| format!("read attachment {}", path.display()))?;
            let name = path
                .file_name()
                .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().to_string());
            Ok(FileRef::new(name, meta.len()))
        })
        .collect()
}

/// Prints tasks the first time they appear, the plan whenever it changes, and
/// the answer at the end.
#[derive(Default)]
struct TranscriptPrinter {
    seen: HashSet<String>,
    plan: Option<Plan>,
    failure: Option<String>,
}

impl TranscriptPrinter {
    fn on_effect(&mut self, view: &ChatView, effect: &ChatEffect) {
        match effect {
            ChatEffect::TaskViewChanged => self.print_progress(view),
            ChatEffect::ActionView(transition) => {
                if transition.to == ActionView::TaskFollow {
                    tracing::debug!(cause = ?transition.cause, "Following active task");
                }
            }
            ChatEffect::Completed { request_id } => {
                if let Some(entry) = view.entry(request_id) {
                    let answer = if entry.response.trim().is_empty() {
                        view.task_view()
                            .into_iter()
                            .flat_map(|tv| tv.task_list.iter())
                            .filter(|t| t.category == TaskCategory::Result)
                            .map(|t| t.task.summary())
                            .collect::<Vec<_>>()
                            .join("\n")
                    } else {
                        entry.response.clone()
                    };
                    println!();
                    println!("{answer}");
                }
            }
            ChatEffect::QuotaExceeded { notice, .. } => eprintln!("{notice}"),
            ChatEffect::Failed { error, .. } => self.failure = Some(error.to_string()),
            ChatEffect::EntryUpdated { .. } => {}
        }
    }

    fn print_progress(&mut self, view: &ChatView) {
        let Some(task_view) = view.task_view() else {
            return;
        };

        let has_steps = task_view.plan.as_ref().is_some_and(|p| !p.steps.is_empty());
        if has_steps && task_view.plan != self.plan {
            self.plan.clone_from(&task_view.plan);
            if let Some(plan) = &self.plan {
                println!("Plan:");
                for (i, step) in plan.steps.iter().enumerate() {
                    let marker = if i == plan.current_step_index { '>' } else { ' ' };
                    println!("{marker} {}. {}", i + 1, step.title);
                }
            }
        }

        for classified in &task_view.task_list {
            let task = &classified.task;
            if classified.category == TaskCategory::Result || task.message_type == MessageType::Plan
            {
                continue;
            }
            if !self.seen.insert(task.id.clone()) {
                continue;
            }
            let panel_tag = match classified.placement {
                Placement::Inline => "",
                Placement::Panel => " (panel)",
            };
            println!("[{}]{panel_tag} {}", task.message_type, task.summary());
        }
    }
}
