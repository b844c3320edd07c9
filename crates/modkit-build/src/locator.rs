//! Project discovery
//!
//! Scans the immediate subdirectories of a root for module manifests and
//! produces one `BuildInfo` per project.

use crate::build_info::{BuildInfo, BuildSystem};
use crate::error::{BuildError, BuildResult};
use crate::metadata::MetadataDocument;
use modkit_config::ConfigLoader;
use semver::Version;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directory names that hold a module regardless of the manifest name
const SOURCE_DIR_NAMES: &[&str] = &["src", "source"];

pub struct ProjectLocator {
    loader: ConfigLoader,
    build_system: BuildSystem,
}

impl ProjectLocator {
    /// Locator reading the process environment for settings and build system
    pub fn new() -> Self {
        Self {
            loader: ConfigLoader::new(),
            build_system: BuildSystem::detect(),
        }
    }

    pub fn with_loader(mut self, loader: ConfigLoader) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_build_system(mut self, build_system: BuildSystem) -> Self {
        self.build_system = build_system;
        self
    }

    /// Find every module project directly under `root`, sorted by manifest
    /// path. Directories without a valid manifest, or with more than one,
    /// are skipped. A project whose build info cannot be created is
    /// reported as an `Err` item.
    pub fn locate(&self, root: &Path) -> Vec<BuildResult<BuildInfo>> {
        let dirs = match sorted_subdirectories(root) {
            Ok(dirs) => dirs,
            Err(e) => return vec![Err(e)],
        };

        let mut results = Vec::new();
        for dir in dirs {
            let candidates = match manifest_candidates(&dir) {
                Ok(candidates) => candidates,
                Err(e) => {
                    debug!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                    continue;
                }
            };

            let valid: Vec<(PathBuf, Version)> = candidates
                .into_iter()
                .filter_map(|path| match read_manifest_version(&path) {
                    Ok(version) => Some((path, version)),
                    Err(e) => {
                        debug!(path = %path.display(), error = %e, "skipping invalid manifest");
                        None
                    }
                })
                .collect();

            match valid.as_slice() {
                [] => {}
                [(path, version)] => {
                    debug!(path = %path.display(), %version, "found module project");
                    results.push(BuildInfo::new(
                        path,
                        version.clone(),
                        &self.loader,
                        self.build_system,
                    ));
                }
                _ => {
                    warn!(
                        dir = %dir.display(),
                        count = valid.len(),
                        "more than one module manifest, skipping directory"
                    );
                }
            }
        }
        results
    }
}

impl Default for ProjectLocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Locate projects using the process environment
pub fn locate(root: &Path) -> Vec<BuildResult<BuildInfo>> {
    ProjectLocator::new().locate(root)
}

fn sorted_subdirectories(root: &Path) -> BuildResult<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(root).map_err(|e| BuildError::io(root, e))? {
        let entry = entry.map_err(|e| BuildError::io(root, e))?;
        if entry.path().is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// `.psd1` files in `dir` that could be the module manifest
fn manifest_candidates(dir: &Path) -> BuildResult<Vec<PathBuf>> {
    let dir_name = dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let is_source_dir = SOURCE_DIR_NAMES
        .iter()
        .any(|name| dir_name.eq_ignore_ascii_case(name));

    let mut candidates = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| BuildError::io(dir, e))? {
        let path = entry.map_err(|e| BuildError::io(dir, e))?.path();
        let is_manifest = path.is_file()
            && path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("psd1"));
        if !is_manifest {
            continue;
        }
        let stem_matches = path
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|stem| stem.eq_ignore_ascii_case(dir_name));
        if stem_matches || is_source_dir {
            candidates.push(path);
        }
    }
    candidates.sort();
    Ok(candidates)
}

fn read_manifest_version(path: &Path) -> BuildResult<Version> {
    MetadataDocument::load(path)?.module_version()
}
