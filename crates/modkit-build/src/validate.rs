//! Syntax and attribute validation
//!
//! Every mergeable fragment is parsed before anything is written. All
//! diagnostics are collected first and reported together, so one build run
//! shows every problem instead of stopping at the first.

use crate::build_info::BuildInfo;
use crate::error::{BuildError, BuildResult};
use crate::selector::{Category, SourceItem};
use modkit_syntax::error_codes;
use modkit_syntax::visit::{collect_attributes, top_level_classes};
use modkit_syntax::{Diagnostic, ScriptFile};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Built-in attribute types and their settable properties
///
/// The list is fixed. Attributes outside it, such as
/// `System.ComponentModel.Description`, are reported as MK3001 unless the
/// module declares an attribute class with that name.
const BUILTIN_ATTRIBUTES: &[(&str, &[&str])] = &[
    (
        "System.Management.Automation.CmdletBindingAttribute",
        &[
            "ConfirmImpact",
            "DefaultParameterSetName",
            "HelpUri",
            "PositionalBinding",
            "RemotingCapability",
            "SupportsPaging",
            "SupportsShouldProcess",
            "SupportsTransactions",
        ],
    ),
    (
        "System.Management.Automation.ParameterAttribute",
        &[
            "DontShow",
            "HelpMessage",
            "HelpMessageBaseName",
            "HelpMessageResourceId",
            "Mandatory",
            "ParameterSetName",
            "Position",
            "ValueFromPipeline",
            "ValueFromPipelineByPropertyName",
            "ValueFromRemainingArguments",
        ],
    ),
    ("System.Management.Automation.AliasAttribute", &[]),
    (
        "System.Management.Automation.OutputTypeAttribute",
        &["ParameterSetName", "ProviderCmdlet"],
    ),
    ("System.Management.Automation.AllowNullAttribute", &[]),
    ("System.Management.Automation.AllowEmptyStringAttribute", &[]),
    ("System.Management.Automation.AllowEmptyCollectionAttribute", &[]),
    ("System.Management.Automation.ValidateNotNullAttribute", &[]),
    ("System.Management.Automation.ValidateNotNullOrEmptyAttribute", &[]),
    ("System.Management.Automation.ValidateNotNullOrWhiteSpaceAttribute", &[]),
    (
        "System.Management.Automation.ValidateSetAttribute",
        &["ErrorMessage", "IgnoreCase"],
    ),
    (
        "System.Management.Automation.ValidatePatternAttribute",
        &["ErrorMessage", "Options"],
    ),
    ("System.Management.Automation.ValidateScriptAttribute", &["ErrorMessage"]),
    ("System.Management.Automation.ValidateRangeAttribute", &[]),
    ("System.Management.Automation.ValidateLengthAttribute", &[]),
    ("System.Management.Automation.ValidateCountAttribute", &[]),
    ("System.Management.Automation.ValidateDriveAttribute", &[]),
    ("System.Management.Automation.ValidateUserDriveAttribute", &[]),
    ("System.Management.Automation.ValidateTrustedDataAttribute", &[]),
    ("System.Management.Automation.ValidateArgumentsAttribute", &[]),
    ("System.Management.Automation.ValidateEnumeratedArgumentsAttribute", &[]),
    ("System.Management.Automation.ArgumentTransformationAttribute", &[]),
    ("System.Management.Automation.ArgumentCompleterAttribute", &[]),
    ("System.Management.Automation.ArgumentCompletionsAttribute", &[]),
    ("System.Management.Automation.SupportsWildcardsAttribute", &[]),
    ("System.Management.Automation.CredentialAttribute", &[]),
    (
        "System.Management.Automation.PSDefaultValueAttribute",
        &["Help", "Value"],
    ),
    ("System.Management.Automation.PSTypeNameAttribute", &[]),
    ("System.Management.Automation.HiddenAttribute", &[]),
    ("System.Management.Automation.NoRunspaceAffinityAttribute", &[]),
    ("System.Management.Automation.DscResourceAttribute", &["RunAsCredential"]),
    (
        "System.Management.Automation.DscPropertyAttribute",
        &["Key", "Mandatory", "NotConfigurable"],
    ),
    ("System.Management.Automation.DscLocalConfigurationManagerAttribute", &[]),
    (
        "System.Diagnostics.CodeAnalysis.SuppressMessageAttribute",
        &["Category", "CheckId", "Justification", "MessageId", "Scope", "Target"],
    ),
    ("System.ObsoleteAttribute", &["DiagnosticId", "UrlFormat"]),
    ("System.FlagsAttribute", &[]),
    ("System.Attribute", &[]),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeType {
    /// Full name, namespace included when known
    pub name: String,
    pub properties: Vec<String>,
}

impl AttributeType {
    pub fn new(name: impl Into<String>, properties: Vec<String>) -> Self {
        Self {
            name: name.into(),
            properties,
        }
    }

    pub fn has_property(&self, property: &str) -> bool {
        self.properties
            .iter()
            .any(|p| p.eq_ignore_ascii_case(property))
    }

    /// Whether `candidate` names this type, fully or by namespace suffix
    fn is_named(&self, candidate: &str) -> bool {
        if self.name.eq_ignore_ascii_case(candidate) {
            return true;
        }
        let full = self.name.to_ascii_lowercase();
        let suffix = format!(".{}", candidate.to_ascii_lowercase());
        full.ends_with(&suffix)
    }
}

/// Known attribute types
#[derive(Debug, Clone, Default)]
pub struct AttributeCatalog {
    types: Vec<AttributeType>,
}

impl AttributeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog of the attribute types available to every script. Only the
    /// fixed `BUILTIN_ATTRIBUTES` list; module attribute classes are added
    /// per module.
    pub fn builtin() -> Self {
        let types = BUILTIN_ATTRIBUTES
            .iter()
            .map(|(name, properties)| {
                AttributeType::new(*name, properties.iter().map(|p| p.to_string()).collect())
            })
            .collect();
        Self { types }
    }

    pub fn add(&mut self, ty: AttributeType) {
        self.types.push(ty);
    }

    /// Add the attribute classes declared in `parsed`
    pub fn with_declared(mut self, parsed: &[ParsedItem]) -> Self {
        for ty in declared_attribute_types(parsed, &self) {
            debug!(attribute = %ty.name, "found declared attribute class");
            self.add(ty);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Resolve an attribute name as written: first literally, then with an
    /// `Attribute` suffix
    pub fn resolve(&self, name: &str) -> Option<&AttributeType> {
        let suffixed = format!("{}Attribute", name);
        let found = [name, suffixed.as_str()]
            .into_iter()
            .find_map(|candidate| self.types.iter().find(|ty| ty.is_named(candidate)));
        found
    }
}

/// A fragment with its parse result
#[derive(Debug, Clone)]
pub struct ParsedItem {
    pub item: SourceItem,
    /// Path shown in diagnostics
    pub file: String,
    pub source: String,
    pub script: ScriptFile,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse one fragment. Diagnostics name the file relative to `root` when
/// one is given.
pub fn parse_item(item: &SourceItem, root: Option<&Path>) -> BuildResult<ParsedItem> {
    let source = fs::read_to_string(&item.path).map_err(|e| BuildError::io(&item.path, e))?;
    let shown = root
        .and_then(|root| item.path.strip_prefix(root).ok())
        .unwrap_or(&item.path);
    let file = shown.display().to_string();
    let (script, diagnostics) = modkit_syntax::parse_file(&file, &source);

    Ok(ParsedItem {
        item: item.clone(),
        file,
        source,
        script,
        diagnostics,
    })
}

pub fn parse_items(items: &[SourceItem], root: Option<&Path>) -> BuildResult<Vec<ParsedItem>> {
    items
        .iter()
        .filter(|item| item.is_mergeable())
        .map(|item| parse_item(item, root))
        .collect()
}

/// Parse every non-class mergeable item and return all lexer and parser
/// diagnostics
pub fn validate_syntax(items: &[SourceItem]) -> BuildResult<Vec<Diagnostic>> {
    let parsed = parse_items(&without_classes(items), None)?;
    Ok(parsed.into_iter().flat_map(|p| p.diagnostics).collect())
}

/// Check every attribute against `catalog`
pub fn validate_annotations(parsed: &[ParsedItem], catalog: &AttributeCatalog) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for item in parsed {
        for attribute in collect_attributes(&item.script) {
            let name = attribute.name.base_name();
            let Some(ty) = catalog.resolve(name) else {
                diagnostics.push(
                    Diagnostic::error_with_code(
                        error_codes::UNKNOWN_ATTRIBUTE,
                        format!("Unknown attribute '{}'", name),
                        attribute.name.span,
                    )
                    .with_label("not a known attribute type")
                    .with_note(
                        "attribute types resolve against the built-in catalog and \
                         attribute classes declared in this module",
                    )
                    .with_file(&item.file)
                    .with_source(&item.source),
                );
                continue;
            };

            for (arg, span) in attribute.named_args() {
                if ty.has_property(arg) {
                    continue;
                }
                let mut diagnostic = Diagnostic::error_with_code(
                    error_codes::UNKNOWN_ATTRIBUTE_ARGUMENT,
                    format!("Unknown argument '{}' for attribute '{}'", arg, name),
                    span,
                )
                .with_label("not a property of this attribute")
                .with_file(&item.file)
                .with_source(&item.source);
                if !ty.properties.is_empty() {
                    diagnostic = diagnostic
                        .with_help(format!("valid arguments: {}", ty.properties.join(", ")));
                }
                diagnostics.push(diagnostic);
            }
        }
    }

    diagnostics
}

/// Classes deriving from an attribute type, with their own properties plus
/// those of a known base
fn declared_attribute_types(parsed: &[ParsedItem], known: &AttributeCatalog) -> Vec<AttributeType> {
    let mut types = Vec::new();
    for item in parsed {
        for class in top_level_classes(&item.script) {
            let attribute_bases: Vec<&str> = class
                .base_types
                .iter()
                .map(|ty| ty.base_name())
                .filter(|base| base.to_ascii_lowercase().ends_with("attribute"))
                .collect();
            if attribute_bases.is_empty() {
                continue;
            }

            let mut properties: Vec<String> =
                class.property_names().map(str::to_string).collect();
            for base in attribute_bases {
                if let Some(base_ty) = known.resolve(base) {
                    properties.extend(base_ty.properties.iter().cloned());
                }
            }
            types.push(AttributeType::new(class.name.clone(), properties));
        }
    }
    types
}

fn without_classes(items: &[SourceItem]) -> Vec<SourceItem> {
    items
        .iter()
        .filter(|item| item.category != Category::Class)
        .cloned()
        .collect()
}

/// Validation gate run before a project is merged
pub struct SyntaxValidator {
    catalog: AttributeCatalog,
}

impl SyntaxValidator {
    pub fn new() -> Self {
        Self {
            catalog: AttributeCatalog::builtin(),
        }
    }

    pub fn with_catalog(catalog: AttributeCatalog) -> Self {
        Self { catalog }
    }

    /// Every syntax and attribute problem in the project's fragments
    pub fn diagnose(&self, info: &BuildInfo, items: &[SourceItem]) -> BuildResult<Vec<Diagnostic>> {
        let root = info.paths.source_module_dir.as_path();
        let all = parse_items(items, Some(root))?;
        let catalog = self.catalog.clone().with_declared(&all);

        let checked: Vec<ParsedItem> = all
            .into_iter()
            .filter(|p| p.item.category != Category::Class)
            .collect();

        let mut diagnostics: Vec<Diagnostic> = checked
            .iter()
            .flat_map(|p| p.diagnostics.iter().cloned())
            .collect();
        diagnostics.extend(validate_annotations(&checked, &catalog));
        Ok(diagnostics)
    }

    /// Print every problem and fail if there were any
    pub fn check(&self, info: &BuildInfo, items: &[SourceItem]) -> BuildResult<()> {
        let diagnostics = self.diagnose(info, items)?;
        if diagnostics.is_empty() {
            info!(module = %info.module_name, files = items.len(), "syntax check passed");
            return Ok(());
        }

        for diagnostic in &diagnostics {
            eprint!("{}", diagnostic.to_human_string());
        }
        Err(BuildError::Validation {
            module: info.module_name.clone(),
            count: diagnostics.len(),
            diagnostics,
        })
    }
}

impl Default for SyntaxValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_short_and_full_names() {
        let catalog = AttributeCatalog::builtin();
        assert!(catalog.resolve("Parameter").is_some());
        assert!(catalog.resolve("parameter").is_some());
        assert!(catalog.resolve("ParameterAttribute").is_some());
        assert!(catalog
            .resolve("System.Management.Automation.ParameterAttribute")
            .is_some());
        assert!(catalog.resolve("Diagnostics.CodeAnalysis.SuppressMessage").is_some());
        assert!(catalog.resolve("Paramter").is_none());
    }

    #[test]
    fn test_suffix_match_requires_namespace_boundary() {
        let catalog = AttributeCatalog::builtin();
        // "Null" must not match "...AllowNullAttribute"
        assert!(catalog.resolve("Null").is_none());
    }

    #[test]
    fn test_properties_are_case_insensitive() {
        let catalog = AttributeCatalog::builtin();
        let parameter = catalog.resolve("Parameter").unwrap();
        assert!(parameter.has_property("mandatory"));
        assert!(!parameter.has_property("Mandatroy"));
    }

    #[test]
    fn test_catalog_is_fixed() {
        let catalog = AttributeCatalog::builtin();
        assert!(catalog
            .resolve("System.ComponentModel.Description")
            .is_none());
    }
}
