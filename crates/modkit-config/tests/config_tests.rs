//! Configuration loading and precedence tests

use modkit_config::loader::{ENV_COVERAGE, ENV_EOL, ENV_LICENSE};
use modkit_config::{BuildSettings, ConfigError, ConfigLoader, BUILD_CONFIG_FILE};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn create_config_file(dir: &Path, content: &str) {
    fs::write(dir.join(BUILD_CONFIG_FILE), content).unwrap();
}

fn clear_env() {
    env::remove_var(ENV_COVERAGE);
    env::remove_var(ENV_EOL);
    env::remove_var(ENV_LICENSE);
}

// ============================================================================
// Precedence
// ============================================================================

#[test]
#[serial]
fn test_env_overrides_file() {
    clear_env();
    let temp = TempDir::new().unwrap();
    create_config_file(temp.path(), "CodeCoverageThreshold = 0.5\nLicense = \"MIT\"\n");

    env::set_var(ENV_COVERAGE, "0.95");
    let settings = ConfigLoader::new().load_for_project(temp.path()).unwrap();
    clear_env();

    assert_eq!(settings.code_coverage_threshold, 0.95);
    assert_eq!(settings.license, "MIT");
}

#[test]
#[serial]
fn test_env_applies_without_file() {
    clear_env();
    let temp = TempDir::new().unwrap();

    env::set_var(ENV_LICENSE, "None");
    env::set_var(ENV_EOL, "LF");
    let settings = ConfigLoader::new().load_for_project(temp.path()).unwrap();
    clear_env();

    assert_eq!(settings.license, "None");
    assert_eq!(settings.line_ending, "\n");
    assert_eq!(settings.license_uri(), None);
}

#[test]
#[serial]
fn test_no_sources_gives_defaults() {
    clear_env();
    let temp = TempDir::new().unwrap();
    let settings = ConfigLoader::new().load_for_project(temp.path()).unwrap();
    assert_eq!(settings, BuildSettings::default());
}

#[test]
#[serial]
fn test_invalid_env_value_is_an_error() {
    clear_env();
    let temp = TempDir::new().unwrap();

    env::set_var(ENV_EOL, "tab");
    let result = ConfigLoader::new().load_for_project(temp.path());
    clear_env();

    assert!(matches!(result, Err(ConfigError::InvalidEnv { ref var, .. }) if var == ENV_EOL));
}

// ============================================================================
// File validation
// ============================================================================

#[rstest]
#[case::unknown_key("Licence = \"MIT\"")]
#[case::wrong_type("CodeCoverageThreshold = \"high\"")]
#[case::bad_syntax("CodeCoverageThreshold = ")]
#[case::negative_threshold("CodeCoverageThreshold = -0.1")]
#[case::empty_license("License = \"  \"")]
#[serial]
fn test_invalid_files_rejected(#[case] content: &str) {
    clear_env();
    let temp = TempDir::new().unwrap();
    create_config_file(temp.path(), content);
    assert!(ConfigLoader::new().load_for_project(temp.path()).is_err());
}

#[test]
#[serial]
fn test_crlf_from_file() {
    clear_env();
    let temp = TempDir::new().unwrap();
    create_config_file(temp.path(), "EndOfLineChar = \"\\r\\n\"\n");
    let settings = ConfigLoader::new().load_for_project(temp.path()).unwrap();
    assert_eq!(settings.line_ending, "\r\n");
}
