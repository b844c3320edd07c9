//! Resolved build settings
//!
//! `BuildSettings` is what the build actually uses: every field has a value.
//! Each field is chosen on its own from the environment override, then the
//! project file, then the default.

use crate::build_config::{normalize_line_ending, validate_threshold, BuildConfig};
use crate::loader::EnvOverrides;
use crate::{ConfigError, ConfigResult};
use serde::Serialize;

pub const DEFAULT_COVERAGE_THRESHOLD: f64 = 0.8;
pub const DEFAULT_LICENSE: &str = "MIT";

/// License value that suppresses the license URI
pub const NO_LICENSE: &str = "None";

const LICENSE_URI_BASE: &str = "https://opensource.org/licenses/";

/// Line ending of the platform the build runs on
pub fn platform_line_ending() -> &'static str {
    if cfg!(windows) {
        "\r\n"
    } else {
        "\n"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildSettings {
    pub code_coverage_threshold: f64,
    /// Actual line-ending characters, never a name like `CRLF`
    pub line_ending: String,
    pub license: String,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            code_coverage_threshold: DEFAULT_COVERAGE_THRESHOLD,
            line_ending: platform_line_ending().to_string(),
            license: DEFAULT_LICENSE.to_string(),
        }
    }
}

impl BuildSettings {
    /// Combine environment overrides, file values and defaults
    pub fn resolve(env: &EnvOverrides, file: &BuildConfig) -> ConfigResult<Self> {
        let defaults = Self::default();

        let code_coverage_threshold = match &env.code_coverage_threshold {
            Some(raw) => {
                let value: f64 = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                    var: crate::loader::ENV_COVERAGE.to_string(),
                    reason: format!("'{}' is not a number", raw),
                })?;
                validate_threshold(value).map_err(|_| ConfigError::InvalidEnv {
                    var: crate::loader::ENV_COVERAGE.to_string(),
                    reason: format!("{} is outside 0.0..=1.0", value),
                })?;
                value
            }
            None => file
                .code_coverage_threshold
                .unwrap_or(defaults.code_coverage_threshold),
        };

        let line_ending = match (&env.line_ending, &file.end_of_line_char) {
            (Some(raw), _) => normalize_line_ending(raw)
                .ok_or_else(|| ConfigError::InvalidEnv {
                    var: crate::loader::ENV_EOL.to_string(),
                    reason: format!("'{}' is not a line ending", raw.escape_default()),
                })?
                .to_string(),
            (None, Some(raw)) => normalize_line_ending(raw)
                .map(str::to_string)
                .unwrap_or(defaults.line_ending),
            (None, None) => defaults.line_ending,
        };

        let license = env
            .license
            .clone()
            .filter(|l| !l.trim().is_empty())
            .or_else(|| file.license.clone())
            .unwrap_or(defaults.license);

        Ok(Self {
            code_coverage_threshold,
            line_ending,
            license,
        })
    }

    /// `https://opensource.org/licenses/<License>`, or `None` when the
    /// license is `None`
    pub fn license_uri(&self) -> Option<String> {
        if self.license.eq_ignore_ascii_case(NO_LICENSE) {
            None
        } else {
            Some(format!("{}{}", LICENSE_URI_BASE, self.license))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = BuildSettings::resolve(&EnvOverrides::default(), &BuildConfig::default())
            .unwrap();
        assert_eq!(settings.code_coverage_threshold, 0.8);
        assert_eq!(settings.line_ending, platform_line_ending());
        assert_eq!(settings.license, "MIT");
    }

    #[test]
    fn test_each_field_resolved_independently() {
        let env = EnvOverrides {
            license: Some("GPL-3.0".to_string()),
            ..Default::default()
        };
        let file = BuildConfig {
            code_coverage_threshold: Some(0.5),
            end_of_line_char: None,
            license: Some("Apache-2.0".to_string()),
        };
        let settings = BuildSettings::resolve(&env, &file).unwrap();
        assert_eq!(settings.code_coverage_threshold, 0.5);
        assert_eq!(settings.line_ending, platform_line_ending());
        assert_eq!(settings.license, "GPL-3.0");
    }

    #[test]
    fn test_env_line_ending_by_name() {
        let env = EnvOverrides {
            line_ending: Some("CRLF".to_string()),
            ..Default::default()
        };
        let file = BuildConfig {
            end_of_line_char: Some("\n".to_string()),
            ..Default::default()
        };
        let settings = BuildSettings::resolve(&env, &file).unwrap();
        assert_eq!(settings.line_ending, "\r\n");
    }

    #[test]
    fn test_invalid_env_threshold() {
        let env = EnvOverrides {
            code_coverage_threshold: Some("most".to_string()),
            ..Default::default()
        };
        let err = BuildSettings::resolve(&env, &BuildConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn test_license_uri() {
        let mut settings = BuildSettings::default();
        assert_eq!(
            settings.license_uri().as_deref(),
            Some("https://opensource.org/licenses/MIT")
        );
        settings.license = "None".to_string();
        assert_eq!(settings.license_uri(), None);
    }
}
