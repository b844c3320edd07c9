//! modkit build pipeline
//!
//! Turns a module source tree into a deployable module:
//! - Project discovery and per-project build info
//! - Fragment selection and the syntax/attribute validation gate
//! - Merging fragments into the root unit
//! - Rewriting the module manifest in place
//! - Lint, test, pack and publish through external collaborators

pub mod build_info;
pub mod error;
pub mod exports;
pub mod locator;
pub mod merger;
pub mod metadata;
pub mod pipeline;
pub mod selector;
pub mod tools;
pub mod validate;

// Re-export main types
pub use build_info::{BuildInfo, BuildPaths, BuildSystem, ExecutionStrategy};
pub use error::{BuildError, BuildResult};
pub use exports::{ModuleExports, ResourceFiles};
pub use locator::{locate, ProjectLocator};
pub use merger::{merge, MergedUnit};
pub use metadata::{MetadataDocument, MetadataPatcher, MetadataValue, PatchReport};
pub use pipeline::{
    clean, copy_static_items, run_all, BuildContext, BuildStats, Builder, TestOutcome,
};
pub use selector::{select_items, Category, Purpose, SelectOptions, SourceItem};
pub use tools::{
    CommandLinter, CommandPublisher, CommandTestRunner, DirectoryPublisher, ExternalCommand,
    LintFinding, Linter, Packager, Publisher, TarballPackager, TestRunner, TestSummary,
};
pub use validate::{validate_annotations, validate_syntax, AttributeCatalog, SyntaxValidator};

// Re-export configuration types for convenience
pub use modkit_config::BuildSettings;
