//! Build command - validate, merge and patch each module

use super::{run_stage, StageReport};
use crate::ProjectArgs;
use anyhow::Result;
use modkit_build::{BuildContext, BuildResult, Builder};
use serde_json::json;

pub fn run(args: &ProjectArgs) -> Result<()> {
    run_stage("build", args, build_stage)
}

pub(crate) fn build_stage(builder: &Builder) -> BuildResult<StageReport> {
    let context = builder.build()?;
    Ok(StageReport {
        summary: describe(&context),
        details: details(&context),
    })
}

pub(crate) fn describe(context: &BuildContext) -> String {
    format!(
        "built {} files, {} exported functions ({}ms)",
        context.stats.merged_files,
        context.exported_functions.len(),
        context.stats.total_time.as_millis()
    )
}

pub(crate) fn details(context: &BuildContext) -> serde_json::Value {
    json!({
        "output": context.info.paths.build_module_dir,
        "merged_files": context.stats.merged_files,
        "static_items": context.stats.static_items,
        "exported_functions": context.exported_functions,
        "updated_fields": context.patch.updated,
        "skipped_fields": context.patch.skipped,
        "elapsed_ms": context.stats.total_time.as_millis() as u64,
    })
}
