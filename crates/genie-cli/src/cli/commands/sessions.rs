//! Session list command handlers.

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Local;
use genie_core::sessions::{
    JsonFileStore, PendingMutation, SessionList, SessionStore, format_relative,
};

pub fn list(file: &Path) -> Result<()> {
    let list = load(file)?;
    if list.sessions().is_empty() {
        println!("No sessions found.");
        return Ok(());
    }

    let now = Local::now();
    let groups = list.categorize(&now);
    for (bucket, sessions) in groups.non_empty() {
        println!("{} ({})", bucket.title(), sessions.len());
        for session in sessions {
            println!(
                "  {}  {}  {}",
                format_relative(session.updated_at, &now),
                session.id,
                session.title
            );
        }
    }
    Ok(())
}

pub fn rename(file: &Path, id: &str, title: &str, yes: bool) -> Result<()> {
    let store = JsonFileStore::new(file);
    let list = load(file)?;
    if list.get(id).is_none() {
        bail!("Session '{id}' not found");
    }
    let Some(pending) = list.request_rename(id, title) else {
        bail!("Title cannot be empty");
    };
    commit(&store, list, pending, yes)
}

pub fn delete(file: &Path, id: &str, yes: bool) -> Result<()> {
    let store = JsonFileStore::new(file);
    let list = load(file)?;
    let Some(pending) = list.request_delete(id) else {
        bail!("Session '{id}' not found");
    };
    commit(&store, list, pending, yes)
}

fn load(file: &Path) -> Result<SessionList> {
    let sessions = JsonFileStore::new(file)
        .load()
        .with_context(|| format!("load sessions from {}", file.display()))?;
    Ok(SessionList::new(sessions))
}

fn commit(
    store: &JsonFileStore,
    mut list: SessionList,
    pending: PendingMutation,
    yes: bool,
) -> Result<()> {
    if !yes && !ask(&pending.prompt())? {
        println!("Cancelled.");
        return Ok(());
    }

    let summary = match &pending {
        PendingMutation::Rename { session_id, title } => {
            format!("Renamed session {session_id} → {title}")
        }
        PendingMutation::Delete { session_id } => format!("Deleted session {session_id}"),
    };
    let outcome = list.apply(pending.confirm());
    if !outcome.applied {
        bail!("Session list changed while confirming; nothing saved");
    }
    store.save(list.sessions()).context("save sessions")?;
    println!("{summary}");
    Ok(())
}

/// `[y/N]` prompt on stdin. Anything but y/yes (including EOF) declines.
fn ask(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush().context("flush stdout")?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("read confirmation")?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
