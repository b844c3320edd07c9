//! Setup command - list module projects and check the tool environment

use super::locate_projects;
use crate::config::Config;
use crate::ProjectArgs;
use anyhow::{bail, Context, Result};
use colored::Colorize;
use modkit_build::{BuildSystem, Packager, TarballPackager};
use serde_json::{json, Value};
use tracing::info;

pub fn run(args: &ProjectArgs, config: &Config) -> Result<()> {
    let located = locate_projects(args)?;
    let build_system = BuildSystem::detect();
    let tools = tool_status(config);

    if args.json {
        let projects: Vec<Value> = located
            .infos
            .iter()
            .map(|info| {
                json!({
                    "module": info.module_name,
                    "version": info.version.to_string(),
                    "source": info.paths.source_module_dir,
                    "output": info.paths.build_module_dir,
                    "settings": info.settings,
                })
            })
            .collect();
        let output = json!({
            "command": "setup",
            "success": located.errors.is_empty(),
            "build_system": build_system.to_string(),
            "projects": projects,
            "tools": tools,
            "errors": located.errors,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialize output")?
        );
    } else {
        println!("{} {}", "Build system:".bold(), build_system);
        for info in &located.infos {
            println!(
                "{} {} {} -> {}",
                "✓".green(),
                info.module_name.bold(),
                info.version,
                info.paths.build_module_dir.display()
            );
            println!(
                "    coverage threshold {}, license {}, line ending {:?}",
                info.settings.code_coverage_threshold,
                info.settings.license,
                info.settings.line_ending
            );
        }
        for error in &located.errors {
            eprintln!("{} {}", "✗".red(), error.red());
        }
        println!("{}", "Tools:".bold());
        for (stage, status) in tools.as_object().into_iter().flatten() {
            let name = status["name"].as_str().unwrap_or_default();
            let marker = if status["available"].as_bool() == Some(true) {
                "available".green()
            } else {
                "not available".yellow()
            };
            println!("    {:<8} {} ({})", stage, name, marker);
        }
    }

    if !located.errors.is_empty() {
        bail!("{} module projects could not be loaded", located.errors.len());
    }
    Ok(())
}

/// Log the tool environment; used by stages that run setup first
pub fn log_environment(config: &Config) {
    info!(build_system = %BuildSystem::detect(), "build environment");
    for (stage, status) in tool_status(config).as_object().into_iter().flatten() {
        info!(
            stage = stage.as_str(),
            tool = status["name"].as_str().unwrap_or_default(),
            available = status["available"].as_bool().unwrap_or(false),
            "tool"
        );
    }
}

fn tool_status(config: &Config) -> Value {
    let linter = config.linter();
    let runner = config.test_runner();
    let packager = TarballPackager::new();
    let publisher = config.publisher();
    json!({
        "lint": { "name": linter.name(), "available": linter.is_available() },
        "test": { "name": runner.name(), "available": runner.is_available() },
        "pack": { "name": packager.name(), "available": packager.is_available() },
        "publish": { "name": publisher.name(), "available": publisher.is_available() },
    })
}
