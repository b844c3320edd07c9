//! Default command - setup, build, test and pack in order

use super::{build, pack, run_stage, setup, test, StageReport};
use crate::config::Config;
use crate::ProjectArgs;
use anyhow::Result;
use serde_json::json;

/// A project stops at its first failing stage; other projects continue.
pub fn run(args: &ProjectArgs, config: &Config) -> Result<()> {
    setup::log_environment(config);

    run_stage("default", args, |builder| {
        let built = build::build_stage(builder)?;
        let tested = test::test_stage(builder, config)?;
        let packed = pack::pack_stage(builder)?;
        Ok(StageReport {
            summary: format!("{}; {}; {}", built.summary, tested.summary, packed.summary),
            details: json!({
                "build": built.details,
                "test": tested.details,
                "pack": packed.details,
            }),
        })
    })
}
