//! Metadata documents
//!
//! A `.psd1` file is a single hashtable literal. The document keeps the raw
//! text and edits it in place by byte range, so comments, ordering and
//! layout outside the touched values survive a rewrite.

use crate::build_info::parse_module_version;
use crate::error::{BuildError, BuildResult};
use crate::metadata::value::{key_text, MetadataValue};
use modkit_syntax::ast::{Element, ElementKind, HashEntry, Item};
use modkit_syntax::Span;
use once_cell::unsync::OnceCell;
use regex::Regex;
use semver::Version;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One `Key = value` entry of the document, at any nesting depth
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    pub key: String,
    pub key_span: Span,
    /// Byte range replaced by `set_field`
    pub value_span: Span,
    pub value: MetadataValue,
    /// 0 for top-level keys
    pub depth: usize,
}

#[derive(Debug)]
pub struct MetadataDocument {
    path: PathBuf,
    text: String,
    entries: OnceCell<Vec<FieldEntry>>,
}

impl MetadataDocument {
    /// Read and parse a document from disk
    pub fn load(path: &Path) -> BuildResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
        Self::from_text(path, text)
    }

    /// Parse document text; `path` is used for errors and `save`
    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> BuildResult<Self> {
        let doc = Self {
            path: path.into(),
            text: text.into(),
            entries: OnceCell::new(),
        };
        doc.entries()?;
        Ok(doc)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    fn entries(&self) -> BuildResult<&[FieldEntry]> {
        self.entries
            .get_or_try_init(|| {
                parse_entries(&self.text)
                    .map_err(|reason| BuildError::invalid_metadata(&self.path, reason))
            })
            .map(Vec::as_slice)
    }

    /// Every active entry named `name` (case-insensitive, any depth)
    pub fn fields(&self, name: &str) -> BuildResult<Vec<&FieldEntry>> {
        Ok(self
            .entries()?
            .iter()
            .filter(|entry| entry.key.eq_ignore_ascii_case(name))
            .collect())
    }

    /// Entries a field name addresses: the top-level ones when the manifest
    /// has any, otherwise nested ones such as `PrivateData.PSData.LicenseUri`
    pub fn addressed_fields(&self, name: &str) -> BuildResult<Vec<&FieldEntry>> {
        Ok(addressed(self.entries()?, name))
    }

    /// Value of a field that occurs exactly once
    pub fn get(&self, name: &str) -> BuildResult<Option<&MetadataValue>> {
        let fields = self.addressed_fields(name)?;
        match fields.as_slice() {
            [field] => Ok(Some(&field.value)),
            [] => Ok(None),
            _ => Err(BuildError::AmbiguousField {
                field: name.to_string(),
                path: self.path.clone(),
            }),
        }
    }

    /// Top-level `ModuleVersion`, the marker of a module manifest
    pub fn module_version(&self) -> BuildResult<Version> {
        let versions: Vec<&FieldEntry> = self
            .fields("ModuleVersion")?
            .into_iter()
            .filter(|entry| entry.depth == 0)
            .collect();

        let raw = match versions.as_slice() {
            [entry] => entry.value.as_str().ok_or_else(|| {
                BuildError::invalid_metadata(&self.path, "ModuleVersion is not a string")
            })?,
            [] => {
                return Err(BuildError::invalid_metadata(
                    &self.path,
                    "no top-level ModuleVersion",
                ))
            }
            _ => {
                return Err(BuildError::invalid_metadata(
                    &self.path,
                    "ModuleVersion is set more than once",
                ))
            }
        };

        parse_module_version(raw).map_err(|reason| BuildError::invalid_metadata(&self.path, reason))
    }

    /// Make a field active. Returns `true` if the field is now active
    /// exactly once; otherwise logs a warning and leaves the text alone.
    pub fn enable_field(&mut self, name: &str) -> bool {
        match self.addressed_fields(name).map(|fields| fields.len()) {
            Ok(0) => {}
            Ok(1) => return true,
            Ok(count) => {
                warn!(
                    field = name,
                    count,
                    path = %self.path.display(),
                    "field is active more than once"
                );
                return false;
            }
            Err(e) => {
                warn!(field = name, error = %e, "cannot enable field");
                return false;
            }
        }

        let pattern = match disabled_field_pattern(name) {
            Ok(pattern) => pattern,
            Err(e) => {
                warn!(field = name, error = %e, "cannot enable field");
                return false;
            }
        };
        let markers: Vec<usize> = pattern
            .find_iter(&self.text)
            .filter_map(|m| m.as_str().find('#').map(|offset| m.start() + offset))
            .collect();

        let hash = match markers.as_slice() {
            [hash] => *hash,
            [] => {
                warn!(
                    field = name,
                    path = %self.path.display(),
                    "field is neither active nor disabled"
                );
                return false;
            }
            _ => {
                warn!(
                    field = name,
                    count = markers.len(),
                    path = %self.path.display(),
                    "field is disabled more than once, not enabling"
                );
                return false;
            }
        };

        let mut end = hash + 1;
        if self.text[end..].starts_with(' ') {
            end += 1;
        }
        let mut text = self.text.clone();
        text.replace_range(hash..end, "");

        match parse_entries(&text) {
            Ok(entries) if addressed(&entries, name).len() == 1 => {
                debug!(field = name, "enabled field");
                self.text = text;
                self.entries = OnceCell::from(entries);
                true
            }
            Ok(_) => {
                warn!(field = name, "uncommented line did not produce the field");
                false
            }
            Err(reason) => {
                warn!(field = name, %reason, "enabling field would break the document");
                false
            }
        }
    }

    /// Replace the value of an active field
    pub fn set_field(&mut self, name: &str, value: &MetadataValue) -> BuildResult<()> {
        let span = {
            let fields = self.addressed_fields(name)?;
            match fields.as_slice() {
                [field] => field.value_span,
                [] => {
                    return Err(BuildError::FieldNotFound {
                        field: name.to_string(),
                        path: self.path.clone(),
                    })
                }
                _ => {
                    return Err(BuildError::AmbiguousField {
                        field: name.to_string(),
                        path: self.path.clone(),
                    })
                }
            }
        };

        self.text.replace_range(span.start..span.end, &value.render());
        self.entries = OnceCell::new();
        debug!(field = name, value = %value, "set field");
        Ok(())
    }

    /// Write the document back to the path it was loaded from
    pub fn save(&self) -> BuildResult<()> {
        self.save_to(&self.path)
    }

    pub fn save_to(&self, path: &Path) -> BuildResult<()> {
        fs::write(path, &self.text).map_err(|e| BuildError::io(path, e))
    }
}

fn addressed<'a>(entries: &'a [FieldEntry], name: &str) -> Vec<&'a FieldEntry> {
    let matching = entries
        .iter()
        .filter(|entry| entry.key.eq_ignore_ascii_case(name));
    let top: Vec<&FieldEntry> = matching.clone().filter(|entry| entry.depth == 0).collect();
    if top.is_empty() {
        matching.collect()
    } else {
        top
    }
}

/// `# Name =` at the start of a line
fn disabled_field_pattern(name: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"(?im)^[ \t]*#[ \t]*{}[ \t]*=",
        regex::escape(name)
    ))
}

fn parse_entries(text: &str) -> Result<Vec<FieldEntry>, String> {
    let (script, diagnostics) = modkit_syntax::parse(text);
    if let Some(diag) = diagnostics.iter().find(|d| d.is_error()) {
        return Err(format!("{}:{}: {}", diag.line, diag.column, diag.message));
    }

    let table = script
        .items
        .iter()
        .find_map(|item| match item {
            Item::Statement(stmt) => match stmt.elements.as_slice() {
                [Element {
                    kind: ElementKind::Hashtable(entries),
                    ..
                }] => Some(entries),
                _ => None,
            },
            _ => None,
        })
        .ok_or_else(|| "document is not a hashtable literal".to_string())?;

    let mut entries = Vec::new();
    collect_entries(table, text, 0, &mut entries);
    Ok(entries)
}

fn collect_entries(table: &[HashEntry], text: &str, depth: usize, out: &mut Vec<FieldEntry>) {
    for entry in table {
        let key_span = match (entry.key.first(), entry.key.last()) {
            (Some(first), Some(last)) => first.span.merge(last.span),
            _ => entry.span,
        };
        out.push(FieldEntry {
            key: key_text(&entry.key, text),
            key_span,
            value_span: entry.value.span,
            value: MetadataValue::from_elements(&entry.value.elements, text),
            depth,
        });

        if let [Element {
            kind: ElementKind::Hashtable(nested),
            ..
        }] = entry.value.elements.as_slice()
        {
            collect_entries(nested, text, depth + 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MANIFEST: &str = "@{
    RootModule = 'Widgets.psm1'
    ModuleVersion = '1.2.0'
    # FunctionsToExport = @()
    PrivateData = @{
        PSData = @{
            Tags = @('widgets', 'demo')
            # LicenseUri = ''
        }
    }
}
";

    fn doc(text: &str) -> MetadataDocument {
        MetadataDocument::from_text("Widgets.psd1", text).unwrap()
    }

    #[test]
    fn test_reads_fields_at_any_depth() {
        let doc = doc(MANIFEST);
        assert_eq!(
            doc.get("rootmodule").unwrap(),
            Some(&MetadataValue::string("Widgets.psm1"))
        );
        assert_eq!(
            doc.get("Tags").unwrap(),
            Some(&MetadataValue::string_list(["widgets", "demo"]))
        );
        assert_eq!(doc.fields("Tags").unwrap()[0].depth, 2);
        assert_eq!(doc.get("LicenseUri").unwrap(), None);
    }

    #[test]
    fn test_top_level_field_wins_over_nested() {
        let mut doc = doc("@{
    ModuleVersion = '1.0.0'
    RequiredModules = @{ ModuleName = 'Dep'; ModuleVersion = '2.0.0' }
}
");
        assert_eq!(doc.fields("ModuleVersion").unwrap().len(), 2);
        assert_eq!(
            doc.get("ModuleVersion").unwrap(),
            Some(&MetadataValue::string("1.0.0"))
        );
        assert!(doc.enable_field("ModuleVersion"));

        doc.set_field("ModuleVersion", &MetadataValue::string("1.1.0"))
            .unwrap();
        assert!(doc.text().contains("    ModuleVersion = '1.1.0'\n"));
        assert!(doc.text().contains("ModuleVersion = '2.0.0' }"));
    }

    #[test]
    fn test_module_version() {
        assert_eq!(doc(MANIFEST).module_version().unwrap(), Version::new(1, 2, 0));
    }

    #[test]
    fn test_not_a_hashtable() {
        let err = MetadataDocument::from_text("x.psd1", "Get-Item foo").unwrap_err();
        assert!(matches!(err, BuildError::InvalidMetadata { .. }));
    }

    #[test]
    fn test_enable_nested_field() {
        let mut doc = doc(MANIFEST);
        assert!(doc.enable_field("LicenseUri"));
        assert!(doc.text().contains("            LicenseUri = ''\n"));
        assert_eq!(doc.get("LicenseUri").unwrap(), Some(&MetadataValue::string("")));
    }

    #[test]
    fn test_set_replaces_only_the_value() {
        let mut doc = doc(MANIFEST);
        doc.set_field("ModuleVersion", &MetadataValue::string("2.0.0"))
            .unwrap();
        assert!(doc.text().contains("    ModuleVersion = '2.0.0'\n"));
        assert!(doc.text().contains("    # FunctionsToExport = @()\n"));
        assert_eq!(doc.module_version().unwrap(), Version::new(2, 0, 0));
    }

    #[test]
    fn test_set_missing_field() {
        let mut doc = doc(MANIFEST);
        let err = doc
            .set_field("FunctionsToExport", &MetadataValue::string_list(["A"]))
            .unwrap_err();
        assert!(matches!(err, BuildError::FieldNotFound { .. }));
    }
}
