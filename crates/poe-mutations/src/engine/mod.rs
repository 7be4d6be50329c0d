//! Mutation execution
//!
//! Each mutation is planned into a [`FileChange`] and then applied. In a dry
//! run the change is applied to a [`StagedFileSystem`] wrapped around the
//! injected filesystem, so the batch behaves exactly like a real run while
//! the real filesystem is never written.

mod apply;
mod plan;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::error::{MutationError, MutationResult};
use crate::fs::{FileSystem, StagedFileSystem};
use crate::mutation::{Mutation, MutationKind, RuntimeOptions};
use crate::observer::{MutationDetails, MutationObserver};
use crate::path::{resolve_path, PathMapper};
use crate::template::{Renderer, TemplateLoader};

pub use plan::{FileChange, PlannedChange};

/// Everything a batch of mutations runs against
#[derive(Clone)]
pub struct MutationContext {
    fs: Arc<dyn FileSystem>,
    home_dir: PathBuf,
    dry_run: bool,
    observers: Vec<Arc<dyn MutationObserver>>,
    path_mapper: Option<Arc<dyn PathMapper>>,
    templates: Option<Arc<dyn TemplateLoader>>,
    renderer: Renderer,
    options: RuntimeOptions,
}

impl fmt::Debug for MutationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationContext")
            .field("home_dir", &self.home_dir)
            .field("dry_run", &self.dry_run)
            .field("observers", &self.observers.len())
            .field("path_mapper", &self.path_mapper.is_some())
            .field("templates", &self.templates.is_some())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl MutationContext {
    pub fn new(fs: Arc<dyn FileSystem>, home_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            home_dir: home_dir.into(),
            dry_run: false,
            observers: Vec::new(),
            path_mapper: None,
            templates: None,
            renderer: Renderer::new(),
            options: RuntimeOptions::new(),
        }
    }

    /// Simulate instead of writing
    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: impl MutationObserver + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Reroute target directories, e.g. into an isolated root
    #[must_use]
    pub fn with_path_mapper(mut self, mapper: impl PathMapper + 'static) -> Self {
        self.path_mapper = Some(Arc::new(mapper));
        self
    }

    #[must_use]
    pub fn with_templates(mut self, loader: impl TemplateLoader + 'static) -> Self {
        self.templates = Some(Arc::new(loader));
        self
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Set one runtime option seen by resolver functions
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: RuntimeOptions) -> Self {
        self.options.extend(options);
        self
    }

    #[must_use]
    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }

    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    #[must_use]
    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    /// Resolve a raw `~` target the way the engine will
    ///
    /// # Errors
    /// Returns `InvalidPath` for invalid targets
    pub fn resolve(&self, raw: &str) -> MutationResult<PathBuf> {
        resolve_path(raw, &self.home_dir, self.path_mapper.as_deref())
    }

    /// Render a path for humans, relative to home when possible
    #[must_use]
    pub fn display_path(&self, path: &Path) -> String {
        match path.strip_prefix(&self.home_dir) {
            Ok(relative) if relative.as_os_str().is_empty() => "~".to_string(),
            Ok(relative) => format!("~/{}", relative.display()),
            Err(_) => path.display().to_string(),
        }
    }
}

/// What a mutation did (or would do) to the filesystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    None,
    CreateDirectory,
    CreateFile,
    UpdateFile,
    DeleteFile,
    RemoveDirectory,
    SetMode,
}

impl Action {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "unchanged",
            Self::CreateDirectory => "mkdir",
            Self::CreateFile => "create",
            Self::UpdateFile => "update",
            Self::DeleteFile => "delete",
            Self::RemoveDirectory => "rmdir",
            Self::SetMode => "chmod",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationOutcome {
    pub index: usize,
    pub kind: MutationKind,
    pub label: String,
    /// Path the change applies to (the `.bak` sibling for backups)
    pub path: PathBuf,
    pub action: Action,
    pub changed: bool,
    /// Redacted unified diff for content changes
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diff: Vec<String>,
}

/// Result of a whole batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    /// Whether any mutation changed (or would change) something
    pub changed: bool,
    pub dry_run: bool,
    pub outcomes: Vec<MutationOutcome>,
}

impl BatchOutcome {
    /// Outcomes that changed something
    pub fn changes(&self) -> impl Iterator<Item = &MutationOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.changed)
    }
}

/// Run mutations in order
///
/// Mutation N+1 starts only after mutation N has been fully applied (or
/// staged, in a dry run). The first error aborts the batch; earlier changes
/// are not rolled back.
///
/// # Errors
/// Returns the first mutation's error, after observers are told about it
pub async fn run_mutations(
    mutations: &[Mutation],
    context: &MutationContext,
) -> MutationResult<BatchOutcome> {
    let staged;
    let fs: &dyn FileSystem = if context.dry_run {
        staged = StagedFileSystem::new(Arc::clone(&context.fs));
        &staged
    } else {
        context.fs.as_ref()
    };

    let mut outcomes = Vec::with_capacity(mutations.len());
    for (index, mutation) in mutations.iter().enumerate() {
        outcomes.push(run_one(index, mutation, fs, context).await?);
    }

    Ok(BatchOutcome {
        changed: outcomes.iter().any(|outcome| outcome.changed),
        dry_run: context.dry_run,
        outcomes,
    })
}

async fn run_one(
    index: usize,
    mutation: &Mutation,
    fs: &dyn FileSystem,
    context: &MutationContext,
) -> MutationResult<MutationOutcome> {
    let raw = mutation.target().resolve(&context.options);
    let label = mutation.display_label(&raw);
    let resolved = context.resolve(&raw);

    let details = MutationDetails {
        index,
        kind: mutation.kind(),
        label: label.clone(),
        path: resolved.as_ref().ok().cloned(),
        dry_run: context.dry_run,
    };
    for observer in &context.observers {
        observer.on_start(&details);
    }

    let result = match resolved {
        Ok(path) => execute(index, mutation, &raw, &path, &label, fs, context).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(outcome) => {
            for observer in &context.observers {
                observer.on_complete(&details, &outcome);
            }
            Ok(outcome)
        }
        Err(err) => {
            for observer in &context.observers {
                observer.on_error(&details, &err);
            }
            Err(err)
        }
    }
}

async fn execute(
    index: usize,
    mutation: &Mutation,
    raw: &str,
    path: &Path,
    label: &str,
    fs: &dyn FileSystem,
    context: &MutationContext,
) -> MutationResult<MutationOutcome> {
    let target = plan::Target { raw, path, label };
    let planned = plan::plan_mutation(mutation, &target, fs, context).await?;
    apply::apply_change(fs, &planned, label).await?;

    let action = planned.change.action();
    let diff = planned.change.diff(&context.display_path(&planned.path));
    Ok(MutationOutcome {
        index,
        kind: mutation.kind(),
        label: label.to_string(),
        path: planned.path,
        action,
        changed: action != Action::None,
        diff,
    })
}

/// Convenience for callers holding a single mutation
///
/// # Errors
/// Returns the mutation's error
pub async fn run_mutation(
    mutation: impl Into<Mutation>,
    context: &MutationContext,
) -> MutationResult<MutationOutcome> {
    let batch = run_mutations(&[mutation.into()], context).await?;
    batch
        .outcomes
        .into_iter()
        .next()
        .ok_or_else(|| MutationError::InvalidValue {
            label: "run_mutation".to_string(),
            message: "batch produced no outcome".to_string(),
        })
}
