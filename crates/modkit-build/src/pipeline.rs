//! Build pipeline
//!
//! `Builder` drives one project through clean, select, validate, merge,
//! static copy and patch, then hands the output to the test, pack and
//! publish collaborators. `run_all` runs a closure over many projects.

use crate::build_info::{BuildInfo, ExecutionStrategy};
use crate::error::{BuildError, BuildResult};
use crate::merger::merge;
use crate::metadata::{MetadataPatcher, PatchReport};
use crate::selector::{select_items, Purpose, SelectOptions, SourceItem};
use crate::tools::{copy_dir_all, LintFinding, Linter, Packager, Publisher, TestRunner, TestSummary};
use crate::validate::SyntaxValidator;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const LINT_RESULTS_FILE: &str = "lint-results.json";
pub const TEST_RESULTS_FILE: &str = "test-results.json";

/// Build statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildStats {
    /// Fragments merged into the root unit
    pub merged_files: usize,
    /// Top-level entries copied unchanged
    pub static_items: usize,
    pub validation_time: Duration,
    pub merge_time: Duration,
    pub total_time: Duration,
}

/// Result of a successful build
#[derive(Debug, Clone, Serialize)]
pub struct BuildContext {
    pub info: BuildInfo,
    pub merged_items: Vec<SourceItem>,
    pub exported_functions: Vec<String>,
    pub patch: PatchReport,
    pub stats: BuildStats,
}

/// What the test stage ran; `None` for a skipped tool
#[derive(Debug, Clone, Default, Serialize)]
pub struct TestOutcome {
    pub findings: Option<Vec<LintFinding>>,
    pub summary: Option<TestSummary>,
}

/// Drives one project through the pipeline
pub struct Builder {
    info: BuildInfo,
    options: SelectOptions,
    validator: SyntaxValidator,
}

impl Builder {
    pub fn new(info: BuildInfo) -> Self {
        Self {
            info,
            options: SelectOptions::default(),
            validator: SyntaxValidator::new(),
        }
    }

    pub fn with_options(mut self, options: SelectOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_validator(mut self, validator: SyntaxValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn info(&self) -> &BuildInfo {
        &self.info
    }

    /// Build the module into `build/<Module>/<version>`
    pub fn build(&self) -> BuildResult<BuildContext> {
        let build_start = Instant::now();
        let info = &self.info;
        info!(module = %info.module_name, version = %info.version, "building module");

        clean(info)?;

        let items = select_items(info, Purpose::ShouldMerge, self.options)?;
        debug!(count = items.len(), "selected fragments");

        let validate_start = Instant::now();
        self.validator.check(info, &items)?;
        let validation_time = validate_start.elapsed();

        let merge_start = Instant::now();
        let unit = merge(info, &items)?;
        unit.write_to(&info.paths.build_root_unit_file)?;
        let merge_time = merge_start.elapsed();

        let statics = select_items(info, Purpose::Static, SelectOptions::default())?;
        copy_static_items(info, &statics)?;

        let patch = MetadataPatcher::new(info).patch(&items, &info.paths.build_root_unit_file)?;

        let stats = BuildStats {
            merged_files: items.len(),
            static_items: statics.len(),
            validation_time,
            merge_time,
            total_time: build_start.elapsed(),
        };
        info!(
            module = %info.module_name,
            files = stats.merged_files,
            elapsed_ms = stats.total_time.as_millis() as u64,
            "built module"
        );

        Ok(BuildContext {
            info: info.clone(),
            merged_items: items,
            exported_functions: patch.exported_functions.clone(),
            patch,
            stats,
        })
    }

    /// Lint and test the built module. Lint findings are advisory; failed
    /// tests are an error.
    pub fn test(&self, runner: &dyn TestRunner, linter: &dyn Linter) -> BuildResult<TestOutcome> {
        let info = &self.info;
        self.require_built()?;
        let mut outcome = TestOutcome::default();

        if linter.is_available() {
            let findings = linter.lint(&info.paths.build_module_dir)?;
            write_report(&info.paths.build_output_dir.join(LINT_RESULTS_FILE), &findings)?;
            if !findings.is_empty() {
                warn!(module = %info.module_name, count = findings.len(), "lint findings");
            }
            outcome.findings = Some(findings);
        } else {
            info!(linter = linter.name(), "linter not available, skipping");
        }

        if runner.is_available() {
            let threshold = info.settings.code_coverage_threshold;
            let summary = runner.run(&info.paths.build_root_unit_file, threshold)?;
            write_report(&info.paths.build_output_dir.join(TEST_RESULTS_FILE), &summary)?;

            if let Some(coverage) = summary.coverage {
                if coverage < threshold {
                    warn!(
                        module = %info.module_name,
                        coverage,
                        threshold,
                        "code coverage below threshold"
                    );
                }
            }
            if summary.failed > 0 {
                return Err(BuildError::TestsFailed {
                    module: info.module_name.clone(),
                    failed: summary.failed,
                });
            }
            info!(module = %info.module_name, passed = summary.passed, "tests passed");
            outcome.summary = Some(summary);
        } else {
            info!(runner = runner.name(), "test runner not available, skipping");
        }

        Ok(outcome)
    }

    /// Package the built module; `None` when the packager is unavailable
    pub fn pack(&self, packager: &dyn Packager) -> BuildResult<Option<PathBuf>> {
        self.require_built()?;
        if !packager.is_available() {
            info!(packager = packager.name(), "packager not available, skipping");
            return Ok(None);
        }
        let paths = &self.info.paths;
        let package = packager.package(&paths.build_module_dir, &paths.build_package_dir)?;
        info!(package = %package.display(), "created package");
        Ok(Some(package))
    }

    /// Publish the built module; `false` when the publisher is unavailable
    pub fn publish(&self, publisher: &dyn Publisher, destination: &str) -> BuildResult<bool> {
        self.require_built()?;
        if !publisher.is_available() {
            info!(publisher = publisher.name(), "publisher not available, skipping");
            return Ok(false);
        }
        publisher.publish(&self.info.paths.build_module_dir, destination)?;
        info!(module = %self.info.module_name, destination, "published module");
        Ok(true)
    }

    fn require_built(&self) -> BuildResult<()> {
        if self.info.paths.build_manifest_file.is_file() {
            Ok(())
        } else {
            Err(BuildError::BuildFailed(format!(
                "module '{}' has not been built",
                self.info.module_name
            )))
        }
    }
}

/// Remove previous output for the project and recreate the output
/// directories
pub fn clean(info: &BuildInfo) -> BuildResult<()> {
    let paths = &info.paths;
    for dir in [&paths.build_module_dir, &paths.build_output_dir] {
        if dir.exists() {
            debug!(dir = %dir.display(), "removing previous output");
            fs::remove_dir_all(dir).map_err(|e| BuildError::io(dir, e))?;
        }
    }
    for dir in [
        &paths.build_module_dir,
        &paths.build_output_dir,
        &paths.build_package_dir,
    ] {
        fs::create_dir_all(dir).map_err(|e| BuildError::io(dir, e))?;
    }
    Ok(())
}

/// Copy static entries into the build module directory, then the source
/// manifest to the build manifest path
pub fn copy_static_items(info: &BuildInfo, items: &[SourceItem]) -> BuildResult<()> {
    let target_dir = &info.paths.build_module_dir;
    fs::create_dir_all(target_dir).map_err(|e| BuildError::io(target_dir, e))?;

    for item in items {
        let Some(name) = item.path.file_name() else {
            continue;
        };
        let dest = target_dir.join(name);
        if item.path.is_dir() {
            copy_dir_all(&item.path, &dest)?;
        } else {
            fs::copy(&item.path, &dest).map_err(|e| BuildError::io(&item.path, e))?;
        }
        debug!(item = %item.path.display(), "copied static item");
    }

    let manifest = &info.paths.source_manifest_file;
    fs::copy(manifest, &info.paths.build_manifest_file).map_err(|e| BuildError::io(manifest, e))?;
    Ok(())
}

/// Run `f` for every project. A failure or panic in one project is
/// reported in its own result and does not stop the others.
pub fn run_all<T, F>(
    infos: Vec<BuildInfo>,
    strategy: ExecutionStrategy,
    f: F,
) -> Vec<(BuildInfo, BuildResult<T>)>
where
    T: Send,
    F: Fn(&BuildInfo) -> BuildResult<T> + Sync + Send,
{
    let run_one = |info: BuildInfo| {
        let result = catch_unwind(AssertUnwindSafe(|| f(&info))).unwrap_or_else(|_| {
            Err(BuildError::BuildFailed(format!(
                "build of '{}' panicked",
                info.module_name
            )))
        });
        (info, result)
    };

    match strategy {
        ExecutionStrategy::Isolated => infos.into_par_iter().map(run_one).collect(),
        ExecutionStrategy::Inline => infos.into_iter().map(run_one).collect(),
    }
}

fn write_report<T: Serialize + ?Sized>(path: &Path, value: &T) -> BuildResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).map_err(|e| BuildError::io(path, e))
}
