//! Test command - lint and test built modules

use super::{run_stage, StageReport};
use crate::config::Config;
use crate::ProjectArgs;
use anyhow::Result;
use modkit_build::{BuildResult, Builder, TestOutcome};
use serde_json::json;

pub fn run(args: &ProjectArgs, config: &Config) -> Result<()> {
    run_stage("test", args, |builder| test_stage(builder, config))
}

pub(crate) fn test_stage(builder: &Builder, config: &Config) -> BuildResult<StageReport> {
    let linter = config.linter();
    let runner = config.test_runner();
    let outcome = builder.test(runner.as_ref(), linter.as_ref())?;
    Ok(StageReport {
        summary: describe(&outcome),
        details: json!({
            "lint": outcome.findings,
            "tests": outcome.summary,
        }),
    })
}

pub(crate) fn describe(outcome: &TestOutcome) -> String {
    let lint = match &outcome.findings {
        Some(findings) => format!("{} lint findings", findings.len()),
        None => "lint skipped".to_string(),
    };
    let tests = match &outcome.summary {
        Some(summary) => match summary.coverage {
            Some(coverage) => format!(
                "{} tests passed, {:.1}% coverage",
                summary.passed,
                coverage * 100.0
            ),
            None => format!("{} tests passed", summary.passed),
        },
        None => "tests skipped".to_string(),
    };
    format!("{}, {}", lint, tests)
}
