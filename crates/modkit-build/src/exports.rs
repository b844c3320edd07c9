//! Export discovery
//!
//! Finds what the metadata document should advertise: public functions and
//! their aliases, DSC resource classes, and resource files shipped with the
//! module.

use crate::error::{BuildError, BuildResult};
use crate::selector::{Category, SourceItem};
use glob::{MatchOptions, Pattern};
use modkit_syntax::visit::{function_aliases, top_level_classes, top_level_functions};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Functions and aliases exported by the public fragments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleExports {
    pub functions: Vec<String>,
    pub aliases: Vec<String>,
}

/// Files under the source directory that the manifest references
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceFiles {
    /// `lib/*.dll`, relative to the module directory
    pub required_assemblies: Vec<String>,
    pub formats: Vec<String>,
    pub types: Vec<String>,
}

/// Top-level functions of the public fragments, in merge order, and the
/// aliases declared on them
pub fn discover_exports(items: &[SourceItem]) -> BuildResult<ModuleExports> {
    let mut exports = ModuleExports::default();

    let mut public: Vec<&SourceItem> = items
        .iter()
        .filter(|i| i.category == Category::Public)
        .collect();
    public.sort_by(|a, b| a.path.cmp(&b.path));

    for item in public {
        let source = fs::read_to_string(&item.path).map_err(|e| BuildError::io(&item.path, e))?;
        let (script, diagnostics) = modkit_syntax::parse(&source);
        if diagnostics.iter().any(|d| d.is_error()) {
            warn!(
                path = %item.path.display(),
                "public fragment has syntax errors; exports may be incomplete"
            );
        }

        for function in top_level_functions(&script) {
            push_unique(&mut exports.functions, function.unqualified_name());
            for alias in function_aliases(function) {
                push_unique(&mut exports.aliases, &alias);
            }
        }
    }

    debug!(
        functions = exports.functions.len(),
        aliases = exports.aliases.len(),
        "discovered exports"
    );
    Ok(exports)
}

/// Classes in the merged unit carrying `[DscResource()]`
pub fn discover_dsc_resources(merged_unit: &str) -> Vec<String> {
    let (script, _) = modkit_syntax::parse(merged_unit);
    let mut resources = Vec::new();
    for class in top_level_classes(&script) {
        if class.has_attribute("DscResource") {
            push_unique(&mut resources, &class.name);
        }
    }
    resources
}

/// Assemblies, format files and type files in `source_dir`
pub fn discover_resource_files(source_dir: &Path) -> BuildResult<ResourceFiles> {
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };
    let dll = pattern("*.dll")?;
    let format = pattern("*.Format.ps1xml")?;
    let types = pattern("*.Types.ps1xml")?;

    let mut files = ResourceFiles::default();

    let lib_dir = source_dir.join("lib");
    if lib_dir.is_dir() {
        for name in file_names(&lib_dir)? {
            if dll.matches_with(&name, options) {
                files.required_assemblies.push(format!("lib/{}", name));
            }
        }
    }

    for name in file_names(source_dir)? {
        if format.matches_with(&name, options) {
            files.formats.push(name);
        } else if types.matches_with(&name, options) {
            files.types.push(name);
        }
    }

    Ok(files)
}

fn pattern(text: &str) -> BuildResult<Pattern> {
    Pattern::new(text).map_err(|e| BuildError::Pattern(format!("'{}': {}", text, e)))
}

/// Sorted names of the regular files directly in `dir`
fn file_names(dir: &Path) -> BuildResult<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| BuildError::io(dir, e))? {
        let path = entry.map_err(|e| BuildError::io(dir, e))?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v.eq_ignore_ascii_case(value)) {
        list.push(value.to_string());
    }
}
