//! External collaborators
//!
//! Linting, testing, packaging and publishing are done by other programs.
//! Each concern is a narrow trait; the pipeline only sees the trait, and a
//! stage whose tool is unavailable is skipped.

use crate::error::{BuildError, BuildResult};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tar::Builder as TarBuilder;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Environment variable carrying the coverage target to test commands
pub const ENV_COVERAGE_TARGET: &str = "MODKIT_COVERAGE_TARGET";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintFinding {
    pub rule: String,
    #[serde(default = "default_severity")]
    pub severity: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

fn default_severity() -> String {
    "warning".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TestSummary {
    pub passed: usize,
    pub failed: usize,
    /// Fraction of commands covered (0.0 - 1.0), when measured
    #[serde(default)]
    pub coverage: Option<f64>,
}

pub trait Linter {
    fn name(&self) -> &str;
    fn is_available(&self) -> bool;
    /// Findings for the module at `path`; findings are advisory
    fn lint(&self, path: &Path) -> BuildResult<Vec<LintFinding>>;
}

pub trait TestRunner {
    fn name(&self) -> &str;
    fn is_available(&self) -> bool;
    fn run(&self, unit: &Path, coverage_target: f64) -> BuildResult<TestSummary>;
}

pub trait Packager {
    fn name(&self) -> &str;
    fn is_available(&self) -> bool;
    /// Package `module_dir` into `package_dir`, returning the package path
    fn package(&self, module_dir: &Path, package_dir: &Path) -> BuildResult<PathBuf>;
}

pub trait Publisher {
    fn name(&self) -> &str;
    fn is_available(&self) -> bool;
    fn publish(&self, path: &Path, destination: &str) -> BuildResult<()>;
}

/// A program and its leading arguments, parsed from a command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ExternalCommand {
    /// Split a whitespace-separated command line. Returns `None` when empty.
    ///
    /// Quotes are not interpreted, so a program or argument containing spaces
    /// has to go behind a wrapper script.
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    /// Whether the program exists, either as a path or on `PATH`
    pub fn is_available(&self) -> bool {
        let program = Path::new(&self.program);
        if program.components().count() > 1 {
            return program.is_file();
        }
        let Some(paths) = env::var_os("PATH") else {
            return false;
        };
        env::split_paths(&paths).any(|dir| {
            let candidate = dir.join(&self.program);
            candidate.is_file() || (cfg!(windows) && candidate.with_extension("exe").is_file())
        })
    }

    /// Run with `extra` appended to the arguments and return stdout. A
    /// failed exit is an error only when stdout is empty, since tools
    /// commonly exit non-zero after reporting findings.
    fn run(&self, tool: &str, extra: &[&Path], envs: &[(&str, String)]) -> BuildResult<String> {
        debug!(tool, program = %self.program, "running external command");
        let output = Command::new(&self.program)
            .args(&self.args)
            .args(extra)
            .envs(envs.iter().map(|(k, v)| (*k, v.as_str())))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BuildError::tool(tool, e))?
            .wait_with_output()
            .map_err(|e| BuildError::tool(tool, e))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if !stderr.trim().is_empty() {
            eprintln!("{}", stderr.trim_end());
        }
        if !output.status.success() && stdout.trim().is_empty() {
            return Err(BuildError::tool(
                tool,
                format!(
                    "exited with status {}",
                    output.status.code().unwrap_or(1)
                ),
            ));
        }
        Ok(stdout)
    }
}

/// Linter run as an external program that prints a JSON array of findings
pub struct CommandLinter {
    command: ExternalCommand,
}

impl CommandLinter {
    pub fn new(command: ExternalCommand) -> Self {
        Self { command }
    }
}

impl Linter for CommandLinter {
    fn name(&self) -> &str {
        &self.command.program
    }

    fn is_available(&self) -> bool {
        self.command.is_available()
    }

    fn lint(&self, path: &Path) -> BuildResult<Vec<LintFinding>> {
        let stdout = self.command.run("linter", &[path], &[])?;
        if stdout.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&stdout)
            .map_err(|e| BuildError::tool("linter", format!("invalid JSON output: {}", e)))
    }
}

/// Test runner run as an external program that prints a JSON summary
pub struct CommandTestRunner {
    command: ExternalCommand,
}

impl CommandTestRunner {
    pub fn new(command: ExternalCommand) -> Self {
        Self { command }
    }
}

impl TestRunner for CommandTestRunner {
    fn name(&self) -> &str {
        &self.command.program
    }

    fn is_available(&self) -> bool {
        self.command.is_available()
    }

    fn run(&self, unit: &Path, coverage_target: f64) -> BuildResult<TestSummary> {
        let stdout = self.command.run(
            "test runner",
            &[unit],
            &[(ENV_COVERAGE_TARGET, coverage_target.to_string())],
        )?;
        serde_json::from_str(&stdout)
            .map_err(|e| BuildError::tool("test runner", format!("invalid JSON output: {}", e)))
    }
}

/// Writes `<Module>.<version>.tar.gz` from a `build/<Module>/<version>`
/// directory
pub struct TarballPackager {
    level: u32,
}

impl TarballPackager {
    pub fn new() -> Self {
        Self { level: 6 }
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level.min(9);
        self
    }
}

impl Default for TarballPackager {
    fn default() -> Self {
        Self::new()
    }
}

impl Packager for TarballPackager {
    fn name(&self) -> &str {
        "tarball"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn package(&self, module_dir: &Path, package_dir: &Path) -> BuildResult<PathBuf> {
        let (module, version) = module_and_version(module_dir)?;
        fs::create_dir_all(package_dir).map_err(|e| BuildError::io(package_dir, e))?;
        let package_path = package_dir.join(format!("{}.{}.tar.gz", module, version));

        let file = File::create(&package_path).map_err(|e| BuildError::io(&package_path, e))?;
        let encoder = GzEncoder::new(file, Compression::new(self.level));
        let mut builder = TarBuilder::new(encoder);
        builder
            .append_dir_all(&module, module_dir)
            .map_err(|e| BuildError::Package(format!("{}: {}", module_dir.display(), e)))?;
        let encoder = builder
            .into_inner()
            .map_err(|e| BuildError::Package(format!("finishing archive: {}", e)))?;
        encoder
            .finish()
            .map_err(|e| BuildError::Package(format!("finishing compression: {}", e)))?;

        Ok(package_path)
    }
}

/// Copies the module to `<destination>/<Module>/<version>`
pub struct DirectoryPublisher;

impl Publisher for DirectoryPublisher {
    fn name(&self) -> &str {
        "directory"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn publish(&self, path: &Path, destination: &str) -> BuildResult<()> {
        let (module, version) = module_and_version(path)?;
        let target = Path::new(destination).join(&module).join(&version);
        if target.exists() {
            warn!(target = %target.display(), "replacing published module");
            fs::remove_dir_all(&target).map_err(|e| BuildError::io(&target, e))?;
        }
        copy_dir_all(path, &target)
    }
}

/// Publisher run as an external program with the module path and
/// destination as its last arguments
pub struct CommandPublisher {
    command: ExternalCommand,
}

impl CommandPublisher {
    pub fn new(command: ExternalCommand) -> Self {
        Self { command }
    }
}

impl Publisher for CommandPublisher {
    fn name(&self) -> &str {
        &self.command.program
    }

    fn is_available(&self) -> bool {
        self.command.is_available()
    }

    fn publish(&self, path: &Path, destination: &str) -> BuildResult<()> {
        self.command
            .run("publisher", &[path, Path::new(destination)], &[])?;
        Ok(())
    }
}

/// Module name and version from a `<Module>/<version>` directory
fn module_and_version(module_dir: &Path) -> BuildResult<(String, String)> {
    let name_of = |path: Option<&Path>| {
        path.and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .map(str::to_string)
    };
    let version = name_of(Some(module_dir));
    let module = name_of(module_dir.parent());
    match (module, version) {
        (Some(module), Some(version)) => Ok((module, version)),
        _ => Err(BuildError::Package(format!(
            "{} is not a <module>/<version> directory",
            module_dir.display()
        ))),
    }
}

/// Recursively copy `source` into `target`
pub(crate) fn copy_dir_all(source: &Path, target: &Path) -> BuildResult<()> {
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_default();
            BuildError::io(path, e.into())
        })?;
        let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let dest = target.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).map_err(|e| BuildError::io(&dest, e))?;
        } else {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
            }
            fs::copy(entry.path(), &dest).map_err(|e| BuildError::io(entry.path(), e))?;
        }
    }
    Ok(())
}
