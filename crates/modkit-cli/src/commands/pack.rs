//! Pack command - archive built modules

use super::{run_stage, StageReport};
use crate::ProjectArgs;
use anyhow::Result;
use modkit_build::{BuildResult, Builder, TarballPackager};
use serde_json::json;

pub fn run(args: &ProjectArgs) -> Result<()> {
    run_stage("pack", args, pack_stage)
}

pub(crate) fn pack_stage(builder: &Builder) -> BuildResult<StageReport> {
    let package = builder.pack(&TarballPackager::new())?;
    let summary = match &package {
        Some(path) => format!("packed {}", path.display()),
        None => "packaging skipped".to_string(),
    };
    Ok(StageReport {
        summary,
        details: json!({ "package": package }),
    })
}
