//! CLI configuration via environment variables
//!
//! External tools are configured with command lines in the environment.
//! Build settings themselves come from `buildConfig.toml` and the
//! `MODKIT_*` overrides read by `modkit-config`.

use modkit_build::{
    BuildResult, CommandLinter, CommandPublisher, CommandTestRunner, DirectoryPublisher,
    ExternalCommand, LintFinding, Linter, Publisher, TestRunner, TestSummary,
};
use std::env;
use std::path::Path;

pub const ENV_JSON: &str = "MODKIT_JSON";
pub const ENV_LINT_COMMAND: &str = "MODKIT_LINT_COMMAND";
pub const ENV_TEST_COMMAND: &str = "MODKIT_TEST_COMMAND";
pub const ENV_PUBLISH_COMMAND: &str = "MODKIT_PUBLISH_COMMAND";
pub const ENV_PUBLISH_PATH: &str = "MODKIT_PUBLISH_PATH";

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Default to JSON output (MODKIT_JSON=1)
    pub default_json: bool,
    /// Disable colored output (NO_COLOR=1)
    pub no_color: bool,
    pub lint_command: Option<ExternalCommand>,
    pub test_command: Option<ExternalCommand>,
    pub publish_command: Option<ExternalCommand>,
    /// Default publish destination (MODKIT_PUBLISH_PATH=/path/to/dir)
    pub publish_path: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let command = |var: &str| env::var(var).ok().and_then(|v| ExternalCommand::parse(&v));
        Self {
            default_json: env::var(ENV_JSON)
                .map(|v| {
                    let lower = v.to_lowercase();
                    lower == "1" || lower == "true" || lower == "json"
                })
                .unwrap_or(false),
            no_color: env::var_os("NO_COLOR").is_some(),
            lint_command: command(ENV_LINT_COMMAND),
            test_command: command(ENV_TEST_COMMAND),
            publish_command: command(ENV_PUBLISH_COMMAND),
            publish_path: env::var(ENV_PUBLISH_PATH)
                .ok()
                .filter(|v| !v.trim().is_empty()),
        }
    }

    pub fn linter(&self) -> Box<dyn Linter> {
        match &self.lint_command {
            Some(command) => Box::new(CommandLinter::new(command.clone())),
            None => Box::new(Unconfigured(ENV_LINT_COMMAND)),
        }
    }

    pub fn test_runner(&self) -> Box<dyn TestRunner> {
        match &self.test_command {
            Some(command) => Box::new(CommandTestRunner::new(command.clone())),
            None => Box::new(Unconfigured(ENV_TEST_COMMAND)),
        }
    }

    /// The publish command when configured, otherwise a directory copy
    pub fn publisher(&self) -> Box<dyn Publisher> {
        match &self.publish_command {
            Some(command) => Box::new(CommandPublisher::new(command.clone())),
            None => Box::new(DirectoryPublisher),
        }
    }
}

/// Stand-in for a tool whose command line is not set; never available
struct Unconfigured(&'static str);

impl Linter for Unconfigured {
    fn name(&self) -> &str {
        self.0
    }

    fn is_available(&self) -> bool {
        false
    }

    fn lint(&self, _path: &Path) -> BuildResult<Vec<LintFinding>> {
        Ok(Vec::new())
    }
}

impl TestRunner for Unconfigured {
    fn name(&self) -> &str {
        self.0
    }

    fn is_available(&self) -> bool {
        false
    }

    fn run(&self, _unit: &Path, _coverage_target: f64) -> BuildResult<TestSummary> {
        Ok(TestSummary::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [
            ENV_JSON,
            ENV_LINT_COMMAND,
            ENV_TEST_COMMAND,
            ENV_PUBLISH_COMMAND,
            ENV_PUBLISH_PATH,
            "NO_COLOR",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_config_defaults() {
        clear_env();
        let config = Config::from_env();
        assert!(!config.default_json);
        assert!(!config.no_color);
        assert!(config.lint_command.is_none());
        assert!(config.publish_path.is_none());
        assert!(!config.linter().is_available());
        assert!(!config.test_runner().is_available());
        assert_eq!(config.publisher().name(), "directory");
    }

    #[test]
    #[serial]
    fn test_config_commands() {
        clear_env();
        env::set_var(ENV_TEST_COMMAND, "pwsh -NoProfile -File run-tests.ps1");
        env::set_var(ENV_PUBLISH_PATH, "/tmp/modules");
        let config = Config::from_env();
        clear_env();

        let command = config.test_command.unwrap();
        assert_eq!(command.program, "pwsh");
        assert_eq!(command.args, vec!["-NoProfile", "-File", "run-tests.ps1"]);
        assert_eq!(config.publish_path.as_deref(), Some("/tmp/modules"));
    }

    #[test]
    #[serial]
    fn test_blank_command_is_unset() {
        clear_env();
        env::set_var(ENV_LINT_COMMAND, "   ");
        let config = Config::from_env();
        clear_env();
        assert!(config.lint_command.is_none());
    }

    #[test]
    #[serial]
    fn test_config_json_and_color() {
        clear_env();
        env::set_var(ENV_JSON, "1");
        env::set_var("NO_COLOR", "1");
        let config = Config::from_env();
        clear_env();
        assert!(config.default_json);
        assert!(config.no_color);
    }
}
