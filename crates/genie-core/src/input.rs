//! Composer input and its validation.

use std::fmt;

use crate::chat::ModeFlags;
use crate::chat::model::FileRef;
use crate::config::{AttachmentsConfig, ChatConfig};

/// What the user submitted from the composer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputInfo {
    pub message: String,
    pub files: Vec<FileRef>,
    pub deep_think: bool,
    pub search_enabled: bool,
    pub output_style: Option<String>,
}

impl InputInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Input carrying the configured composer defaults.
    pub fn with_defaults(message: impl Into<String>, chat: &ChatConfig) -> Self {
        Self {
            message: message.into(),
            files: Vec::new(),
            deep_think: chat.deep_think,
            search_enabled: chat.search_enabled,
            output_style: chat.output_style.clone(),
        }
    }

    #[must_use]
    pub fn with_files(mut self, files: Vec<FileRef>) -> Self {
        self.files = files;
        self
    }

    pub fn mode(&self) -> ModeFlags {
        ModeFlags {
            deep_think: self.deep_think,
            search_enabled: self.search_enabled,
        }
    }

    /// Checks the message and attachments against the composer limits.
    pub fn validate(&self, limits: &AttachmentsConfig) -> Result<(), InputError> {
        if self.message.trim().is_empty() {
            return Err(InputError::EmptyMessage);
        }
        if self.files.len() > limits.max_files {
            return Err(InputError::TooManyFiles {
                count: self.files.len(),
                max: limits.max_files,
            });
        }
        if let Some(file) = self
            .files
            .iter()
            .find(|f| f.size_bytes > limits.max_file_bytes)
        {
            return Err(InputError::FileTooLarge {
                name: file.name.clone(),
                size_bytes: file.size_bytes,
                max_bytes: limits.max_file_bytes,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    EmptyMessage,
    TooManyFiles {
        count: usize,
        max: usize,
    },
    FileTooLarge {
        name: String,
        size_bytes: u64,
        max_bytes: u64,
    },
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::EmptyMessage => write!(f, "Message is empty"),
            InputError::TooManyFiles { count, max } => {
                write!(f, "Too many attachments: {count} (at most {max})")
            }
            InputError::FileTooLarge {
                name,
                size_bytes,
                max_bytes,
            } => write!(
                f,
                "Attachment '{name}' is {} (limit {})",
                format_size(*size_bytes),
                format_size(*max_bytes)
            ),
        }
    }
}

impl std::error::Error for InputError {}

/// Formats a byte count as `B`, `KB` or `MB` with two decimals.
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;

    let value = bytes as f64;
    if value < KB {
        format!("{bytes}B")
    } else if value < MB {
        format!("{:.2}KB", value / KB)
    } else {
        format!("{:.2}MB", value / MB)
    }
}
