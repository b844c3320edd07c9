//! Stage commands
//!
//! Each stage locates the module projects under `--path`, runs itself for
//! every project through `run_all`, and reports one line (or one JSON
//! entry) per project. The process fails if any project failed.

pub mod build;
pub mod default;
pub mod pack;
pub mod publish;
pub mod setup;
pub mod test;

use crate::ProjectArgs;
use anyhow::{bail, Context, Result};
use colored::Colorize;
use modkit_build::{
    run_all, BuildError, BuildInfo, BuildResult, BuildSystem, Builder, ProjectLocator,
};
use serde_json::{json, Value};
use tracing::warn;

/// What a stage reports for one project
pub struct StageReport {
    /// Human-readable status after the module name
    pub summary: String,
    pub details: Value,
}

/// Projects found under the root, plus projects whose build info could not
/// be created
pub struct Located {
    pub infos: Vec<BuildInfo>,
    pub errors: Vec<String>,
}

pub fn locate_projects(args: &ProjectArgs) -> Result<Located> {
    if !args.path.is_dir() {
        bail!("{} is not a directory", args.path.display());
    }

    let mut infos = Vec::new();
    let mut errors = Vec::new();
    for result in ProjectLocator::new().locate(&args.path) {
        match result {
            Ok(info) => infos.push(info),
            Err(e) => errors.push(e.to_string()),
        }
    }

    if let Some(name) = &args.module {
        infos.retain(|info| info.module_name.eq_ignore_ascii_case(name));
        if infos.is_empty() && errors.is_empty() {
            bail!(
                "no module project named '{}' under {}",
                name,
                args.path.display()
            );
        }
    }

    if infos.is_empty() && errors.is_empty() {
        warn!(root = %args.path.display(), "no module projects found");
    }
    Ok(Located { infos, errors })
}

/// Run `stage` for every located project and report the outcomes
pub fn run_stage<F>(command: &str, args: &ProjectArgs, stage: F) -> Result<()>
where
    F: Fn(&Builder) -> BuildResult<StageReport> + Sync + Send,
{
    let located = locate_projects(args)?;
    let strategy = BuildSystem::detect().execution_strategy();
    let results = run_all(located.infos, strategy, |info| {
        stage(&Builder::new(info.clone()))
    });

    let mut failed = located.errors.len();
    let mut projects = Vec::new();
    for (info, result) in &results {
        match result {
            Ok(report) => {
                if !args.json {
                    println!(
                        "{} {} {} {}",
                        "✓".green(),
                        info.module_name.bold(),
                        info.version,
                        report.summary
                    );
                }
                projects.push(json!({
                    "module": info.module_name,
                    "version": info.version.to_string(),
                    "success": true,
                    "details": report.details,
                }));
            }
            Err(e) => {
                failed += 1;
                if !args.json {
                    eprintln!(
                        "{} {} {} {}",
                        "✗".red(),
                        info.module_name.bold(),
                        info.version,
                        e.to_string().red()
                    );
                }
                let mut entry = json!({
                    "module": info.module_name,
                    "version": info.version.to_string(),
                    "success": false,
                    "error": e.to_string(),
                });
                if let BuildError::Validation { diagnostics, .. } = e {
                    entry["diagnostics"] = json!(diagnostics);
                }
                projects.push(entry);
            }
        }
    }

    if !args.json {
        for error in &located.errors {
            eprintln!("{} {}", "✗".red(), error.red());
        }
    }

    let total = results.len() + located.errors.len();
    if args.json {
        let output = json!({
            "command": command,
            "success": failed == 0,
            "projects": projects,
            "errors": located.errors,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialize output")?
        );
    }

    if failed > 0 {
        bail!("{} of {} module projects failed", failed, total);
    }
    Ok(())
}
