//! Configuration management for genie.
//!
//! Loads configuration from ${GENIE_HOME}/config.toml with sensible defaults.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable that overrides `server.base_url`.
pub const BASE_URL_ENV: &str = "GENIE_BASE_URL";

/// Agent server connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Scheme, host and port of the agent server.
    pub base_url: String,
    /// Path of the streaming query endpoint.
    pub stream_path: String,
    /// Whole-request timeout in seconds. Unset means the stream may run indefinitely.
    pub timeout_secs: Option<u64>,
    /// Extra headers sent with every request.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl ServerConfig {
    pub const DEFAULT_BASE_URL: &'static str = "http://127.0.0.1:8080";
    pub const DEFAULT_STREAM_PATH: &'static str = "/web/api/v1/gpt/queryAgentStreamIncr";

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Resolves the base URL with precedence: env > config > default.
    pub fn resolve_base_url(&self) -> Result<String> {
        pick_base_url(std::env::var(BASE_URL_ENV).ok(), &self.base_url)
    }

    /// Full URL of the streaming endpoint.
    pub fn endpoint(&self) -> Result<String> {
        let base = self.resolve_base_url()?;
        join_endpoint(&base, &self.stream_path)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            stream_path: Self::DEFAULT_STREAM_PATH.to_string(),
            timeout_secs: None,
            headers: BTreeMap::new(),
        }
    }
}

fn pick_base_url(env_value: Option<String>, configured: &str) -> Result<String> {
    let candidate = env_value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            let trimmed = configured.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| ServerConfig::DEFAULT_BASE_URL.to_string());

    let parsed =
        url::Url::parse(&candidate).with_context(|| format!("Invalid base URL: {candidate}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("Invalid base URL scheme '{}': {candidate}", parsed.scheme());
    }

    Ok(candidate.trim_end_matches('/').to_string())
}

fn join_endpoint(base: &str, path: &str) -> Result<String> {
    let path = path.trim();
    if path.is_empty() {
        return Ok(base.to_string());
    }
    let joined = if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    };
    url::Url::parse(&joined).with_context(|| format!("Invalid stream endpoint: {joined}"))?;
    Ok(joined)
}

/// Defaults applied to every query sent from the composer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Requested output style (e.g. "html", "docs"). Sent verbatim.
    pub output_style: Option<String>,
    /// Deep-think mode: thought tasks move to the action panel.
    pub deep_think: bool,
    /// Ask the agent to use web search.
    pub search_enabled: bool,
}

/// Composer attachment limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachmentsConfig {
    pub max_files: usize,
    pub max_file_bytes: u64,
}

impl AttachmentsConfig {
    pub const DEFAULT_MAX_FILES: usize = 5;
    pub const DEFAULT_MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;
}

impl Default for AttachmentsConfig {
    fn default() -> Self {
        Self {
            max_files: Self::DEFAULT_MAX_FILES,
            max_file_bytes: Self::DEFAULT_MAX_FILE_BYTES,
        }
    }
}

/// Tracing output settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `GENIE_LOG` is unset (e.g. "info", "genie_core=debug").
    pub level: Option<String>,
    /// Write logs to this file instead of stderr.
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub chat: ChatConfig,
    pub attachments: AttachmentsConfig,
    pub logging: LoggingConfig,
}

pub mod paths {
    //! Path resolution for genie configuration.
    //!
    //! GENIE_HOME resolution order:
    //! 1. GENIE_HOME environment variable (if set)
    //! 2. ~/.config/genie (default)

    use std::path::PathBuf;

    use anyhow::{Context, Result};

    /// Returns the genie home directory.
    pub fn genie_home() -> Result<PathBuf> {
        if let Ok(home) = std::env::var("GENIE_HOME") {
            return Ok(PathBuf::from(home));
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("genie"))
            .context("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> Result<PathBuf> {
        Ok(genie_home()?.join("config.toml"))
    }

    /// Returns the default session list file.
    pub fn sessions_path() -> Result<PathBuf> {
        Ok(genie_home()?.join("sessions.json"))
    }
}

impl Config {
    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path()?)
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Writes this configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        write_config(path, &contents)
    }

    /// Creates a default config file. Fails if one already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Config::default().save_to(path)
    }
}

fn write_config(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
    }
    fs::write(path, contents)
        .with_context(|| format!("Failed to write config to {}", path.display()))
}
