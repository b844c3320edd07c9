//! Project Configuration (buildConfig.toml)
//!
//! Optional file in the module source directory. Every key is optional;
//! unknown keys are rejected so typos surface instead of silently falling
//! back to defaults.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Raw contents of buildConfig.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "PascalCase")]
pub struct BuildConfig {
    /// Minimum fraction of commands that tests must cover (0.0 - 1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_coverage_threshold: Option<f64>,

    /// Line ending used when writing the merged module
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_of_line_char: Option<String>,

    /// License identifier, used to build the license URI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
}

impl BuildConfig {
    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|error| ConfigError::IoError {
            path: path.to_path_buf(),
            error,
        })?;
        Self::parse(&content, path)
    }

    /// Parse configuration text; `file` is used in error messages
    pub fn parse(content: &str, file: &Path) -> ConfigResult<Self> {
        let config: BuildConfig =
            toml::from_str(content).map_err(|error| ConfigError::TomlParseError {
                file: file.to_path_buf(),
                error,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(threshold) = self.code_coverage_threshold {
            validate_threshold(threshold)?;
        }

        if let Some(eol) = &self.end_of_line_char {
            normalize_line_ending(eol).ok_or_else(|| ConfigError::InvalidValue {
                field: "EndOfLineChar".to_string(),
                reason: format!(
                    "'{}' is not a line ending (use LF or CRLF)",
                    eol.escape_default()
                ),
            })?;
        }

        if let Some(license) = &self.license {
            if license.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "License".to_string(),
                    reason: "license cannot be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

pub(crate) fn validate_threshold(threshold: f64) -> ConfigResult<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(ConfigError::InvalidValue {
            field: "CodeCoverageThreshold".to_string(),
            reason: format!("{} is outside 0.0..=1.0", threshold),
        });
    }
    Ok(())
}

/// Map a configured line ending to the actual characters. Accepts the
/// characters themselves or the names `LF` / `CRLF`.
pub fn normalize_line_ending(value: &str) -> Option<&'static str> {
    match value {
        "\n" => Some("\n"),
        "\r\n" => Some("\r\n"),
        v if v.eq_ignore_ascii_case("lf") || v == "\\n" => Some("\n"),
        v if v.eq_ignore_ascii_case("crlf") || v == "\\r\\n" => Some("\r\n"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(content: &str) -> ConfigResult<BuildConfig> {
        BuildConfig::parse(content, &PathBuf::from("buildConfig.toml"))
    }

    #[test]
    fn test_parse_all_keys() {
        let config = parse(
            r#"
CodeCoverageThreshold = 0.65
EndOfLineChar = "CRLF"
License = "Apache-2.0"
"#,
        )
        .unwrap();
        assert_eq!(config.code_coverage_threshold, Some(0.65));
        assert_eq!(config.end_of_line_char.as_deref(), Some("CRLF"));
        assert_eq!(config.license.as_deref(), Some("Apache-2.0"));
    }

    #[test]
    fn test_empty_file_is_all_defaults() {
        assert_eq!(parse("").unwrap(), BuildConfig::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = parse("CoverageThreshold = 0.5").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParseError { .. }));
    }

    #[test]
    fn test_threshold_out_of_range() {
        let err = parse("CodeCoverageThreshold = 1.5").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, .. } if field == "CodeCoverageThreshold"
        ));
    }

    #[test]
    fn test_bad_line_ending() {
        let err = parse("EndOfLineChar = \"\\t\"").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, .. } if field == "EndOfLineChar"
        ));
    }

    #[test]
    fn test_normalize_line_ending() {
        assert_eq!(normalize_line_ending("\r\n"), Some("\r\n"));
        assert_eq!(normalize_line_ending("lf"), Some("\n"));
        assert_eq!(normalize_line_ending("\\r\\n"), Some("\r\n"));
        assert_eq!(normalize_line_ending("CR"), None);
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = BuildConfig {
            code_coverage_threshold: Some(0.9),
            end_of_line_char: None,
            license: Some("MIT".to_string()),
        };
        let text = config.to_toml().unwrap();
        assert!(text.contains("CodeCoverageThreshold = 0.9"));
        assert_eq!(parse(&text).unwrap(), config);
    }
}
