/// Build pipeline error types
use modkit_config::ConfigError;
use modkit_syntax::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid module metadata in {path}: {reason}")]
    InvalidMetadata { path: PathBuf, reason: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Syntax validation failed for module '{module}': {count} problem(s) found")]
    Validation {
        module: String,
        count: usize,
        diagnostics: Vec<Diagnostic>,
    },

    #[error("Field '{field}' not found in {path}")]
    FieldNotFound { field: String, path: PathBuf },

    #[error("Field '{field}' occurs more than once in {path}")]
    AmbiguousField { field: String, path: PathBuf },

    #[error("Invalid file pattern: {0}")]
    Pattern(String),

    #[error("{tool} failed: {message}")]
    Tool { tool: String, message: String },

    #[error("{failed} test(s) failed for module '{module}'")]
    TestsFailed { module: String, failed: usize },

    #[error("Package error: {0}")]
    Package(String),

    #[error("Build failed: {0}")]
    BuildFailed(String),
}

impl BuildError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Create an invalid metadata error
    pub fn invalid_metadata(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::InvalidMetadata {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an external tool error
    pub fn tool(tool: impl Into<String>, message: impl ToString) -> Self {
        Self::Tool {
            tool: tool.into(),
            message: message.to_string(),
        }
    }
}
