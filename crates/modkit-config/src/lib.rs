//! modkit Configuration System
//!
//! Provides per-project build settings for module projects:
//! - Project configuration (`buildConfig.toml` next to the module manifest)
//! - Environment variable overrides (`MODKIT_*`)
//! - Built-in defaults
//!
//! # Configuration Hierarchy
//!
//! Each setting is resolved independently; the first source that provides a
//! value wins:
//! 1. Environment variables (`MODKIT_*`)
//! 2. Project config (`buildConfig.toml`)
//! 3. Defaults
//!
//! # Example
//!
//! ```no_run
//! use modkit_config::ConfigLoader;
//! use std::path::Path;
//!
//! let loader = ConfigLoader::new();
//! let settings = loader.load_for_project(Path::new("src")).unwrap();
//! println!("coverage target: {}", settings.code_coverage_threshold);
//! ```

pub mod build_config;
pub mod loader;
pub mod settings;

use std::path::PathBuf;
use thiserror::Error;

/// File name of the per-project configuration
pub const BUILD_CONFIG_FILE: &str = "buildConfig.toml";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid value in environment variable {var}: {reason}")]
    InvalidEnv { var: String, reason: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

pub use build_config::BuildConfig;
pub use loader::{ConfigLoader, EnvOverrides};
pub use settings::BuildSettings;
