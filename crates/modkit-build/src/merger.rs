//! Module merging
//!
//! Concatenates the project's fragments into the single root unit. Import
//! directives must precede everything else in the unit, so they are lifted
//! out of every fragment and written once at the top.

use crate::build_info::BuildInfo;
use crate::error::{BuildError, BuildResult};
use crate::selector::{Category, SourceItem, INITIALIZATION_COMMAND};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::debug;

static IMPORT_DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*using\s+(module|assembly)\s+").unwrap());

/// The merged root unit of a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedUnit {
    /// Unique import lines, sorted
    pub imports: Vec<String>,
    /// Fragment bodies, each followed by one line ending
    pub body: String,
    pub has_initialization: bool,
    pub line_ending: String,
}

impl MergedUnit {
    /// Full text of the unit
    pub fn render(&self) -> String {
        let eol = self.line_ending.as_str();
        let mut out = String::new();
        if !self.imports.is_empty() {
            out.push_str(&self.imports.join(eol));
            out.push_str(eol);
            out.push_str(eol);
        }
        out.push_str(&self.body);
        if self.has_initialization {
            out.push_str(INITIALIZATION_COMMAND);
            out.push_str(eol);
        }
        out
    }

    /// Write the unit, creating parent directories. The file is flushed to
    /// disk before this returns.
    pub fn write_to(&self, path: &Path) -> BuildResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }
        let mut file = File::create(path).map_err(|e| BuildError::io(path, e))?;
        file.write_all(self.render().as_bytes())
            .map_err(|e| BuildError::io(path, e))?;
        file.sync_all().map_err(|e| BuildError::io(path, e))?;
        debug!(path = %path.display(), imports = self.imports.len(), "wrote merged unit");
        Ok(())
    }
}

/// Merge a project's fragments using its configured line ending
pub fn merge(info: &BuildInfo, items: &[SourceItem]) -> BuildResult<MergedUnit> {
    merge_items(items, &info.settings.line_ending)
}

/// Merge fragments in category order, then path order. Static items are
/// ignored.
pub fn merge_items(items: &[SourceItem], line_ending: &str) -> BuildResult<MergedUnit> {
    let mut ordered: Vec<&SourceItem> = items.iter().filter(|i| i.is_mergeable()).collect();
    ordered.sort_by(|a, b| (a.category, &a.path).cmp(&(b.category, &b.path)));

    let mut imports = BTreeSet::new();
    let mut body = String::new();
    let mut has_initialization = false;

    for item in ordered {
        if item.category == Category::Initialization {
            has_initialization = true;
        }
        let text = fs::read_to_string(&item.path).map_err(|e| BuildError::io(&item.path, e))?;

        let mut kept = Vec::new();
        for line in text.lines() {
            if IMPORT_DIRECTIVE.is_match(line) {
                imports.insert(line.trim().to_string());
            } else {
                kept.push(line.trim_end());
            }
        }

        let fragment = kept.join(line_ending);
        let fragment = fragment.trim();
        if !fragment.is_empty() {
            body.push_str(fragment);
            body.push_str(line_ending);
        }
    }

    Ok(MergedUnit {
        imports: imports.into_iter().collect(),
        body,
        has_initialization,
        line_ending: line_ending.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_pattern() {
        assert!(IMPORT_DIRECTIVE.is_match("using module ./Helpers.psm1"));
        assert!(IMPORT_DIRECTIVE.is_match("  USING Assembly System.Web"));
        assert!(!IMPORT_DIRECTIVE.is_match("using namespace System.IO"));
        assert!(!IMPORT_DIRECTIVE.is_match("# using module Foo"));
        assert!(!IMPORT_DIRECTIVE.is_match("usingmodule Foo"));
    }

    #[test]
    fn test_render_layout() {
        let unit = MergedUnit {
            imports: vec!["using module A".to_string()],
            body: "function F {}\n".to_string(),
            has_initialization: true,
            line_ending: "\n".to_string(),
        };
        assert_eq!(unit.render(), "using module A\n\nfunction F {}\nInitializeModule\n");
    }

    #[test]
    fn test_empty_unit_renders_empty() {
        let unit = merge_items(&[], "\n").unwrap();
        assert_eq!(unit.render(), "");
    }
}
