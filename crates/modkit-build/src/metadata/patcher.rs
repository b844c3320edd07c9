//! Manifest patching
//!
//! Rewrites the build copy of the module manifest so it matches what was
//! built: version, root unit, exports and shipped resources. Every change is
//! made in memory and the document is written once, only if all steps
//! succeed.

use crate::build_info::BuildInfo;
use crate::error::{BuildError, BuildResult};
use crate::exports::{
    discover_dsc_resources, discover_exports, discover_resource_files, ModuleExports,
    ResourceFiles,
};
use crate::metadata::{MetadataDocument, MetadataValue};
use crate::selector::SourceItem;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Fields touched by a patch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PatchReport {
    pub updated: Vec<String>,
    /// Optional fields that could not be enabled
    pub skipped: Vec<String>,
    pub exported_functions: Vec<String>,
}

impl PatchReport {
    fn updated(&mut self, field: &str) {
        self.updated.push(field.to_string());
    }

    fn skipped(&mut self, field: &str) {
        self.skipped.push(field.to_string());
    }
}

/// Everything the patch steps write, gathered up front
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchInputs {
    pub exports: ModuleExports,
    pub dsc_resources: Vec<String>,
    pub resources: ResourceFiles,
}

pub struct MetadataPatcher<'a> {
    info: &'a BuildInfo,
}

impl<'a> MetadataPatcher<'a> {
    pub fn new(info: &'a BuildInfo) -> Self {
        Self { info }
    }

    /// Patch the build manifest of the project. `merged_unit` is the written
    /// root unit, read back for DSC resource discovery.
    pub fn patch(&self, items: &[SourceItem], merged_unit: &Path) -> BuildResult<PatchReport> {
        let unit_text =
            fs::read_to_string(merged_unit).map_err(|e| BuildError::io(merged_unit, e))?;
        let inputs = PatchInputs {
            exports: discover_exports(items)?,
            dsc_resources: discover_dsc_resources(&unit_text),
            resources: discover_resource_files(&self.info.paths.source_module_dir)?,
        };

        let mut doc = MetadataDocument::load(&self.info.paths.build_manifest_file)?;
        let report = self.apply(&mut doc, &inputs)?;
        doc.save()?;

        info!(
            module = %self.info.module_name,
            fields = report.updated.len(),
            "patched module manifest"
        );
        Ok(report)
    }

    /// Apply every patch step to `doc` in memory
    pub fn apply(
        &self,
        doc: &mut MetadataDocument,
        inputs: &PatchInputs,
    ) -> BuildResult<PatchReport> {
        let mut report = PatchReport {
            exported_functions: inputs.exports.functions.clone(),
            ..Default::default()
        };

        doc.set_field(
            "ModuleVersion",
            &MetadataValue::string(self.info.version.to_string()),
        )?;
        report.updated("ModuleVersion");

        let root_unit_set = doc.get("RootModule")?.is_some_and(|v| !v.is_empty());
        if !root_unit_set {
            let root_unit = MetadataValue::string(format!("{}.psm1", self.info.module_name));
            set_optional(doc, "RootModule", &root_unit, &mut report)?;
        }

        set_list(doc, "FunctionsToExport", &inputs.exports.functions, &mut report)?;
        set_list(doc, "AliasesToExport", &inputs.exports.aliases, &mut report)?;
        set_list(doc, "DscResourcesToExport", &inputs.dsc_resources, &mut report)?;
        set_list(
            doc,
            "RequiredAssemblies",
            &inputs.resources.required_assemblies,
            &mut report,
        )?;
        set_list(doc, "FormatsToProcess", &inputs.resources.formats, &mut report)?;
        set_list(doc, "TypesToProcess", &inputs.resources.types, &mut report)?;

        if let Some(uri) = self.info.settings.license_uri() {
            set_optional(doc, "LicenseUri", &MetadataValue::string(uri), &mut report)?;
        }

        Ok(report)
    }
}

fn set_list(
    doc: &mut MetadataDocument,
    field: &str,
    values: &[String],
    report: &mut PatchReport,
) -> BuildResult<()> {
    if values.is_empty() {
        debug!(field, "nothing to set");
        return Ok(());
    }
    set_optional(doc, field, &MetadataValue::string_list(values), report)
}

/// Enable `field` if needed and set it; skipped when it cannot be enabled
fn set_optional(
    doc: &mut MetadataDocument,
    field: &str,
    value: &MetadataValue,
    report: &mut PatchReport,
) -> BuildResult<()> {
    if !doc.enable_field(field) {
        report.skipped(field);
        return Ok(());
    }
    doc.set_field(field, value)?;
    report.updated(field);
    Ok(())
}
