//! Poe Mutations - Declarative configuration mutation engine
//!
//! This crate applies ordered, idempotent mutations (merge, prune,
//! transform, template render, file lifecycle) to JSON and TOML
//! configuration files under a home directory, with dry-run diffs,
//! secret redaction, and observer hooks.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

pub mod diff;
pub mod engine;
pub mod error;
pub mod format;
pub mod fs;
pub mod mutation;
pub mod observer;
pub mod path;
pub mod template;

pub use engine::{
    run_mutation, run_mutations, Action, BatchOutcome, FileChange, MutationContext,
    MutationOutcome,
};
pub use error::{MutationError, MutationResult};
pub use format::{get_config_format, ConfigObject, ConfigValue, FormatKind};
pub use fs::{FileSystem, MemoryFileSystem, OsFileSystem, StagedFileSystem};
pub use mutation::{config, file, template as template_mutation, Dynamic, Manifest, Mutation, MutationKind};
pub use observer::{MutationDetails, MutationObserver, TracingObserver};
pub use path::{expand_home, resolve_path, IsolatedRoot, PathMapper};
pub use template::{Renderer, StaticTemplates, TemplateLoader, TemplateValue, TemplateVars};
