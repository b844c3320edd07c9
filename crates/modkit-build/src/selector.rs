//! Source item selection
//!
//! Splits a module's source directory into mergeable fragments and static
//! entries that are copied to the build output unchanged.

use crate::build_info::BuildInfo;
use crate::error::{BuildError, BuildResult};
use glob::{MatchOptions, Pattern};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// File whose presence adds the initialization call to the merged unit
pub const INITIALIZATION_FILE: &str = "InitializeModule.ps1";

/// Command appended to the merged unit when initialization is present
pub const INITIALIZATION_COMMAND: &str = "InitializeModule";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Source category; fragments are merged in this order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Category {
    Enum,
    Class,
    Private,
    Public,
    Initialization,
    Static,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Enum => write!(f, "enum"),
            Category::Class => write!(f, "class"),
            Category::Private => write!(f, "private"),
            Category::Public => write!(f, "public"),
            Category::Initialization => write!(f, "initialization"),
            Category::Static => write!(f, "static"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceItem {
    pub path: PathBuf,
    pub category: Category,
}

impl SourceItem {
    pub fn new(path: impl Into<PathBuf>, category: Category) -> Self {
        Self {
            path: path.into(),
            category,
        }
    }

    pub fn is_mergeable(&self) -> bool {
        self.category != Category::Static
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    /// Fragments concatenated into the merged unit
    ShouldMerge,
    /// Top-level entries copied as-is
    Static,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectOptions {
    /// Leave class fragments out of the selection
    pub exclude_class: bool,
}

/// Select the source items of a project
pub fn select_items(
    info: &BuildInfo,
    purpose: Purpose,
    options: SelectOptions,
) -> BuildResult<Vec<SourceItem>> {
    select_from_dir(
        &info.paths.source_module_dir,
        &info.module_name,
        purpose,
        options,
    )
}

/// Select the source items under `source_dir` for module `module_name`
pub fn select_from_dir(
    source_dir: &Path,
    module_name: &str,
    purpose: Purpose,
    options: SelectOptions,
) -> BuildResult<Vec<SourceItem>> {
    match purpose {
        Purpose::ShouldMerge => mergeable_items(source_dir, options),
        Purpose::Static => static_items(source_dir, module_name),
    }
}

fn pattern(text: &str) -> BuildResult<Pattern> {
    Pattern::new(text).map_err(|e| BuildError::Pattern(format!("'{}': {}", text, e)))
}

fn category_patterns() -> BuildResult<Vec<(Pattern, Category)>> {
    Ok(vec![
        (pattern("enum*")?, Category::Enum),
        (pattern("class*")?, Category::Class),
        (pattern("priv*")?, Category::Private),
        (pattern("pub*")?, Category::Public),
    ])
}

fn static_exclusions(module_name: &str) -> BuildResult<Vec<Pattern>> {
    let mut patterns = Vec::new();
    for text in [
        "enum*",
        "class*",
        "priv*",
        "pub*",
        INITIALIZATION_FILE,
        "buildConfig*",
        "*.build.ps1",
        "build.ps1",
        "test*",
        "doc*",
        "help",
    ] {
        patterns.push(pattern(text)?);
    }
    let escaped = Pattern::escape(module_name);
    patterns.push(pattern(&format!("{}.psd1", escaped))?);
    patterns.push(pattern(&format!("{}.psm1", escaped))?);
    Ok(patterns)
}

fn mergeable_items(source_dir: &Path, options: SelectOptions) -> BuildResult<Vec<SourceItem>> {
    let categories = category_patterns()?;
    let mut items = Vec::new();

    for entry in WalkDir::new(source_dir).min_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_default();
            BuildError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() || !has_extension(entry.path(), "ps1") {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .unwrap_or(entry.path());
        let category = match fragment_category(relative, &categories) {
            Some(category) => category,
            None => continue,
        };
        if category == Category::Class && options.exclude_class {
            continue;
        }
        if is_empty_file(entry.path())? {
            debug!(path = %entry.path().display(), "skipping empty fragment");
            continue;
        }
        items.push(SourceItem::new(entry.path(), category));
    }

    if let Some(init) = initialization_file(source_dir)? {
        items.push(SourceItem::new(init, Category::Initialization));
    }

    items.sort_by(|a, b| (a.category, &a.path).cmp(&(b.category, &b.path)));
    Ok(items)
}

/// Category of the innermost matching ancestor directory, if any
fn fragment_category(relative: &Path, categories: &[(Pattern, Category)]) -> Option<Category> {
    let parent = relative.parent()?;
    parent
        .components()
        .rev()
        .filter_map(|c| c.as_os_str().to_str())
        .find_map(|dir| {
            categories
                .iter()
                .find(|(pattern, _)| pattern.matches_with(dir, MATCH_OPTIONS))
                .map(|(_, category)| *category)
        })
}

fn initialization_file(source_dir: &Path) -> BuildResult<Option<PathBuf>> {
    for entry in fs::read_dir(source_dir).map_err(|e| BuildError::io(source_dir, e))? {
        let path = entry.map_err(|e| BuildError::io(source_dir, e))?.path();
        let is_init = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.eq_ignore_ascii_case(INITIALIZATION_FILE));
        if is_init && path.is_file() {
            if is_empty_file(&path)? {
                debug!(path = %path.display(), "skipping empty initialization file");
                return Ok(None);
            }
            return Ok(Some(path));
        }
    }
    Ok(None)
}

fn static_items(source_dir: &Path, module_name: &str) -> BuildResult<Vec<SourceItem>> {
    let exclusions = static_exclusions(module_name)?;
    let mut items = Vec::new();

    for entry in fs::read_dir(source_dir).map_err(|e| BuildError::io(source_dir, e))? {
        let path = entry.map_err(|e| BuildError::io(source_dir, e))?.path();
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => continue,
        };
        if exclusions
            .iter()
            .any(|pattern| pattern.matches_with(name, MATCH_OPTIONS))
        {
            continue;
        }
        items.push(SourceItem::new(path, Category::Static));
    }

    items.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(items)
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn is_empty_file(path: &Path) -> BuildResult<bool> {
    let metadata = fs::metadata(path).map_err(|e| BuildError::io(path, e))?;
    Ok(metadata.len() == 0)
}
