//! Error types and handling for the CLI

use std::io;
use std::path::PathBuf;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for CLI operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error from the binding library
    #[error("{0}")]
    Core(#[from] dtobind_core::Error),

    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Source document that is not valid JSON
    #[error("Invalid JSON in {}: {}", path.display(), source)]
    InvalidSource {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    /// Some mapped types failed inspection
    #[error("{failed} of {total} mapped types failed inspection")]
    CheckFailed { failed: usize, total: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{message}")]
    Other { message: String },
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io(_) => 1,
            Self::Core(e) if e.is_configuration() => 5,
            Self::Core(_) => 2,
            Self::FileNotFound { .. } => 3,
            Self::InvalidSource { .. } => 4,
            Self::Config(_) => 5,
            Self::CheckFailed { .. } => 6,
            Self::Json(_) => 12,
            Self::Other { .. } => 99,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::other(format!("{:#}", err))
    }
}

/// Render an error for stderr, walking its source chain
pub fn format_error(error: &Error, use_color: bool) -> String {
    let mut rendered = if use_color {
        use colored::Colorize;
        format!("{} {}", "Error:".red().bold(), error)
    } else {
        format!("Error: {}", error)
    };

    let mut cause = std::error::Error::source(error);
    // Core errors display their own text; skip the duplicate first link.
    if matches!(error, Error::Core(_)) {
        cause = cause.and_then(std::error::Error::source);
    }
    while let Some(err) = cause {
        rendered.push_str(&format!("\n  caused by: {}", err));
        cause = err.source();
    }
    rendered
}
