use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;
mod config;

/// Build, test and publish script modules.
///
/// Every directory under the project root that holds a module manifest
/// (`<Name>/<Name>.psd1`) is a module project. Fragments are validated,
/// merged into `<Name>.psm1`, and the manifest is patched with the
/// discovered exports under `build/<Name>/<version>`.
///
/// EXAMPLES:
///     modkit build                      Build every module under .
///     modkit build --module Widgets     Build one module
///     modkit test --json                Lint and test, JSON summary
///     modkit publish --destination out  Copy built modules to out/
///     modkit                            Setup, build, test and pack
///
/// ENVIRONMENT VARIABLES:
///     MODKIT_JSON                       Set to '1' for JSON output by default
///     MODKIT_LINT_COMMAND               Linter command line
///     MODKIT_TEST_COMMAND               Test runner command line
///     MODKIT_PUBLISH_COMMAND            Publisher command line
///     MODKIT_PUBLISH_PATH               Default publish destination
///     MODKIT_CODE_COVERAGE_THRESHOLD    Overrides CodeCoverageThreshold
///     MODKIT_EOL                        Overrides EndOfLineChar (LF or CRLF)
///     MODKIT_LICENSE                    Overrides License
///     NO_COLOR                          Set to disable colored output
///
/// Tool command lines are split on whitespace; quoting is not supported.
/// Use a wrapper script for paths that contain spaces.
#[derive(Parser)]
#[command(name = "modkit")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options shared by every stage
#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Directory containing the module projects
    #[arg(long, short = 'p', default_value = ".")]
    pub path: PathBuf,
    /// Only run for the module with this name
    #[arg(long, short = 'm')]
    pub module: Option<String>,
    /// Output a JSON summary instead of status lines
    #[arg(long, env = "MODKIT_JSON")]
    pub json: bool,
    /// Debug logging
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl Default for ProjectArgs {
    fn default() -> Self {
        Self {
            path: PathBuf::from("."),
            module: None,
            json: false,
            verbose: false,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Locate module projects and check the build environment
    ///
    /// Lists every module project found, its resolved settings, and
    /// whether the configured lint, test and publish tools are available.
    ///
    /// EXAMPLES:
    ///     modkit setup
    ///     modkit setup --path src --json
    Setup(ProjectArgs),

    /// Validate and merge each module into the build directory
    ///
    /// EXAMPLES:
    ///     modkit build
    ///     modkit build --module Widgets --verbose
    #[command(visible_alias = "b")]
    Build(ProjectArgs),

    /// Lint and test built modules
    ///
    /// Runs MODKIT_LINT_COMMAND and MODKIT_TEST_COMMAND against the build
    /// output. Unset tools are skipped. Failed tests fail the project.
    ///
    /// EXAMPLES:
    ///     modkit test
    ///     MODKIT_TEST_COMMAND="pwsh -File run-tests.ps1" modkit test
    #[command(visible_alias = "t")]
    Test(ProjectArgs),

    /// Package built modules as `<Name>.<version>.tar.gz`
    ///
    /// EXAMPLES:
    ///     modkit pack
    Pack(ProjectArgs),

    /// Publish built modules
    ///
    /// Uses MODKIT_PUBLISH_COMMAND when set, otherwise copies each module
    /// to `<destination>/<Name>/<version>`.
    ///
    /// EXAMPLES:
    ///     modkit publish --destination ~/modules
    ///     MODKIT_PUBLISH_PATH=/opt/modules modkit publish
    Publish {
        #[command(flatten)]
        project: ProjectArgs,
        /// Publish destination (local directory or feed)
        #[arg(long, short = 'd')]
        destination: Option<String>,
    },

    /// Setup, build, test and pack in order
    Default(ProjectArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cli_config = config::Config::from_env();

    if cli_config.no_color {
        colored::control::set_override(false);
    }

    let command = cli.command.unwrap_or_else(|| {
        Commands::Default(ProjectArgs {
            json: cli_config.default_json,
            ..ProjectArgs::default()
        })
    });
    let verbose = match &command {
        Commands::Setup(args)
        | Commands::Build(args)
        | Commands::Test(args)
        | Commands::Pack(args)
        | Commands::Default(args) => args.verbose,
        Commands::Publish { project, .. } => project.verbose,
    };

    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    match command {
        Commands::Setup(args) => commands::setup::run(&args, &cli_config),
        Commands::Build(args) => commands::build::run(&args),
        Commands::Test(args) => commands::test::run(&args, &cli_config),
        Commands::Pack(args) => commands::pack::run(&args),
        Commands::Publish {
            project,
            destination,
        } => {
            // Command-line flag overrides environment variable
            let destination = destination.or_else(|| cli_config.publish_path.clone());
            commands::publish::run(&project, &cli_config, destination)
        }
        Commands::Default(args) => commands::default::run(&args, &cli_config),
    }
}
