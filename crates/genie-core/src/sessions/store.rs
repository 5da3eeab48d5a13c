use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::model::{Session, SessionStore};

/// Session list kept as one pretty-printed JSON array on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for JsonFileStore {
    /// A missing file is an empty list.
    fn load(&self) -> Result<Vec<Session>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("read sessions from {}", self.path.display()))?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&contents)
            .with_context(|| format!("parse sessions in {}", self.path.display()))
    }

    fn save(&self, sessions: &[Session]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(sessions).context("serialize sessions")?;
        fs::write(&self.path, json)
            .with_context(|| format!("write sessions to {}", self.path.display()))
    }
}
