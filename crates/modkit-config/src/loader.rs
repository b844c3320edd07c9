//! Configuration Loader
//!
//! Finds `buildConfig.toml` for a module project and merges it with
//! environment overrides and defaults.

use crate::build_config::BuildConfig;
use crate::settings::BuildSettings;
use crate::{ConfigResult, BUILD_CONFIG_FILE};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ENV_COVERAGE: &str = "MODKIT_CODE_COVERAGE_THRESHOLD";
pub const ENV_EOL: &str = "MODKIT_EOL";
pub const ENV_LICENSE: &str = "MODKIT_LICENSE";

/// Raw environment override values, unparsed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvOverrides {
    pub code_coverage_threshold: Option<String>,
    pub line_ending: Option<String>,
    pub license: Option<String>,
}

impl EnvOverrides {
    /// Read `MODKIT_*` variables from the process environment
    pub fn from_env() -> Self {
        Self {
            code_coverage_threshold: env::var(ENV_COVERAGE).ok(),
            line_ending: env::var(ENV_EOL).ok(),
            license: env::var(ENV_LICENSE).ok(),
        }
    }
}

/// Configuration loader
///
/// Settings are resolved per field with this precedence:
/// 1. Environment variables (`MODKIT_*`) - highest priority
/// 2. Project config (`buildConfig.toml` in the module source directory)
/// 3. Defaults
pub struct ConfigLoader {
    /// Fixed overrides; when unset the process environment is read on load
    env: Option<EnvOverrides>,
}

impl ConfigLoader {
    /// Create a loader that reads the process environment
    pub fn new() -> Self {
        Self { env: None }
    }

    /// Create a loader with fixed overrides instead of the process environment
    pub fn with_env(env: EnvOverrides) -> Self {
        Self { env: Some(env) }
    }

    /// Path of the project config for a module source directory
    pub fn config_path(source_dir: &Path) -> PathBuf {
        source_dir.join(BUILD_CONFIG_FILE)
    }

    /// Load the project file, if any. A missing file is not an error.
    pub fn load_project_config(&self, source_dir: &Path) -> ConfigResult<BuildConfig> {
        let path = Self::config_path(source_dir);
        if !path.is_file() {
            debug!(path = %path.display(), "no project config, using defaults");
            return Ok(BuildConfig::default());
        }
        debug!(path = %path.display(), "loading project config");
        BuildConfig::load_from_file(&path)
    }

    /// Resolve settings for the module whose sources live in `source_dir`
    pub fn load_for_project(&self, source_dir: &Path) -> ConfigResult<BuildSettings> {
        let file = self.load_project_config(source_dir)?;
        let env = match &self.env {
            Some(env) => env.clone(),
            None => EnvOverrides::from_env(),
        };
        BuildSettings::resolve(&env, &file)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_env(EnvOverrides::default());
        let settings = loader.load_for_project(temp.path()).unwrap();
        assert_eq!(settings, BuildSettings::default());
    }

    #[test]
    fn test_file_values_used() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(BUILD_CONFIG_FILE),
            "CodeCoverageThreshold = 0.25\nLicense = \"BSD-3-Clause\"\n",
        )
        .unwrap();
        let loader = ConfigLoader::with_env(EnvOverrides::default());
        let settings = loader.load_for_project(temp.path()).unwrap();
        assert_eq!(settings.code_coverage_threshold, 0.25);
        assert_eq!(settings.license, "BSD-3-Clause");
    }
}
