//! Per-project build information
//!
//! A `BuildInfo` is created once per discovered module project and passed
//! explicitly to every stage. It is never mutated after construction.

use crate::error::{BuildError, BuildResult};
use modkit_config::{BuildSettings, ConfigLoader};
use semver::Version;
use serde::Serialize;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

/// Where the build runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BuildSystem {
    Desktop,
    AzurePipelines,
    GitHubActions,
}

impl BuildSystem {
    /// Detect the build system from the process environment
    pub fn detect() -> Self {
        Self::detect_with(|name| env::var(name).ok())
    }

    /// Detect the build system using `lookup` for environment variables
    pub fn detect_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let is_set = |name: &str| {
            lookup(name).is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1")
        };
        if is_set("TF_BUILD") {
            BuildSystem::AzurePipelines
        } else if is_set("GITHUB_ACTIONS") {
            BuildSystem::GitHubActions
        } else {
            BuildSystem::Desktop
        }
    }

    /// Projects run as isolated parallel tasks on a desktop and inline on CI
    pub fn execution_strategy(self) -> ExecutionStrategy {
        match self {
            BuildSystem::Desktop => ExecutionStrategy::Isolated,
            BuildSystem::AzurePipelines | BuildSystem::GitHubActions => ExecutionStrategy::Inline,
        }
    }
}

impl fmt::Display for BuildSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildSystem::Desktop => write!(f, "desktop"),
            BuildSystem::AzurePipelines => write!(f, "azure-pipelines"),
            BuildSystem::GitHubActions => write!(f, "github-actions"),
        }
    }
}

/// How multiple projects are run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExecutionStrategy {
    /// One independent task per project, in parallel
    Isolated,
    /// One project after another on the current thread
    Inline,
}

/// Source and output locations of a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildPaths {
    pub project_root: PathBuf,
    pub source_module_dir: PathBuf,
    pub source_manifest_file: PathBuf,
    pub build_module_dir: PathBuf,
    pub build_manifest_file: PathBuf,
    pub build_root_unit_file: PathBuf,
    pub build_output_dir: PathBuf,
    pub build_package_dir: PathBuf,
}

impl BuildPaths {
    pub fn new(
        project_root: &Path,
        source_module_dir: &Path,
        module_name: &str,
        version: &Version,
    ) -> Self {
        let build_root = project_root.join("build");
        let build_module_dir = build_root.join(module_name).join(version.to_string());
        Self {
            project_root: project_root.to_path_buf(),
            source_module_dir: source_module_dir.to_path_buf(),
            source_manifest_file: source_module_dir.join(format!("{}.psd1", module_name)),
            build_manifest_file: build_module_dir.join(format!("{}.psd1", module_name)),
            build_root_unit_file: build_module_dir.join(format!("{}.psm1", module_name)),
            build_module_dir,
            build_output_dir: build_root.join("output").join(module_name),
            build_package_dir: build_root.join("packages"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildInfo {
    pub module_name: String,
    pub version: Version,
    pub settings: BuildSettings,
    pub paths: BuildPaths,
    pub build_system: BuildSystem,
}

impl BuildInfo {
    /// Build info for the manifest at `manifest`, whose version has already
    /// been read. The project root is the parent of the source directory.
    pub fn new(
        manifest: &Path,
        version: Version,
        loader: &ConfigLoader,
        build_system: BuildSystem,
    ) -> BuildResult<Self> {
        let module_name = manifest
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| BuildError::invalid_metadata(manifest, "manifest has no file name"))?
            .to_string();
        let source_module_dir = manifest.parent().ok_or_else(|| {
            BuildError::BuildFailed(format!("{} has no parent directory", manifest.display()))
        })?;
        let project_root = source_module_dir.parent().ok_or_else(|| {
            BuildError::BuildFailed(format!(
                "{} has no parent directory",
                source_module_dir.display()
            ))
        })?;

        let settings = loader.load_for_project(source_module_dir)?;
        let paths = BuildPaths::new(project_root, source_module_dir, &module_name, &version);

        Ok(Self {
            module_name,
            version,
            settings,
            paths,
            build_system,
        })
    }

    pub fn execution_strategy(&self) -> ExecutionStrategy {
        self.build_system.execution_strategy()
    }
}

/// Parse a `ModuleVersion` value. `1.2` is read as `1.2.0`; four-part and
/// pre-release forms are rejected.
pub fn parse_module_version(raw: &str) -> Result<Version, String> {
    let raw = raw.trim();
    let parts: Vec<&str> = raw.split('.').collect();
    if !(2..=3).contains(&parts.len())
        || parts
            .iter()
            .any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()))
    {
        return Err(format!("'{}' is not a valid module version", raw));
    }

    let padded = if parts.len() == 2 {
        format!("{}.0", raw)
    } else {
        raw.to_string()
    };
    Version::parse(&padded).map_err(|e| format!("'{}' is not a valid module version: {}", raw, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use modkit_config::EnvOverrides;
    use rstest::rstest;

    #[rstest]
    #[case("1.2.3", Some(Version::new(1, 2, 3)))]
    #[case("1.2", Some(Version::new(1, 2, 0)))]
    #[case(" 0.10.0 ", Some(Version::new(0, 10, 0)))]
    #[case("1.2.3.4", None)]
    #[case("1", None)]
    #[case("1.x.0", None)]
    #[case("1.0.0-beta", None)]
    fn test_parse_module_version(#[case] raw: &str, #[case] expected: Option<Version>) {
        assert_eq!(parse_module_version(raw).ok(), expected);
    }

    #[test]
    fn test_detect_build_system() {
        let none = BuildSystem::detect_with(|_| None);
        assert_eq!(none, BuildSystem::Desktop);

        let azure =
            BuildSystem::detect_with(|name| (name == "TF_BUILD").then(|| "True".to_string()));
        assert_eq!(azure, BuildSystem::AzurePipelines);
        assert_eq!(azure.execution_strategy(), ExecutionStrategy::Inline);

        let github =
            BuildSystem::detect_with(|name| (name == "GITHUB_ACTIONS").then(|| "true".to_string()));
        assert_eq!(github, BuildSystem::GitHubActions);
    }

    #[test]
    fn test_paths_layout() {
        let paths = BuildPaths::new(
            Path::new("/repo"),
            Path::new("/repo/Widgets"),
            "Widgets",
            &Version::new(1, 0, 0),
        );
        assert_eq!(paths.build_module_dir, PathBuf::from("/repo/build/Widgets/1.0.0"));
        assert_eq!(
            paths.build_root_unit_file,
            PathBuf::from("/repo/build/Widgets/1.0.0/Widgets.psm1")
        );
        assert_eq!(paths.build_output_dir, PathBuf::from("/repo/build/output/Widgets"));
        assert_eq!(paths.build_package_dir, PathBuf::from("/repo/build/packages"));
        assert_eq!(
            paths.source_manifest_file,
            PathBuf::from("/repo/Widgets/Widgets.psd1")
        );
    }

    #[test]
    fn test_new_uses_manifest_stem() {
        let loader = ConfigLoader::with_env(EnvOverrides::default());
        let info = BuildInfo::new(
            Path::new("/repo/src/Widgets.psd1"),
            Version::new(2, 1, 0),
            &loader,
            BuildSystem::Desktop,
        )
        .unwrap();
        assert_eq!(info.module_name, "Widgets");
        assert_eq!(info.paths.project_root, PathBuf::from("/repo"));
        assert_eq!(info.execution_strategy(), ExecutionStrategy::Isolated);
    }
}
