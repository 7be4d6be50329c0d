//! Mutation descriptors
//!
//! A [`Mutation`] is pure data: it describes one filesystem or document
//! change and does nothing until the engine runs it. Descriptors are built
//! with the functions in [`file`], [`config`] and [`template`].

pub mod config;
pub mod file;
pub mod template;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::format::ConfigObject;

pub use config::{ConfigMerge, ConfigPrune, ConfigTransform, Guard, TransformContext, TransformFn, TransformOutcome};
pub use file::{Backup, Chmod, EnsureDirectory, RemoveDirectory, RemoveFile};
pub use template::{TemplateMerge, TemplateWrite};

/// Free-form options available to resolver functions
pub type RuntimeOptions = ConfigObject;

/// A field that is either fixed or computed from runtime options
pub enum Dynamic<T> {
    Static(T),
    Resolve(Arc<dyn Fn(&RuntimeOptions) -> T + Send + Sync>),
}

impl<T> Dynamic<T> {
    /// A value computed when the mutation runs
    pub fn from_fn(f: impl Fn(&RuntimeOptions) -> T + Send + Sync + 'static) -> Self {
        Self::Resolve(Arc::new(f))
    }

    /// The fixed value, if there is one
    pub fn as_static(&self) -> Option<&T> {
        match self {
            Self::Static(value) => Some(value),
            Self::Resolve(_) => None,
        }
    }
}

impl<T: Clone> Dynamic<T> {
    /// Produce the value for this run
    pub fn resolve(&self, options: &RuntimeOptions) -> T {
        match self {
            Self::Static(value) => value.clone(),
            Self::Resolve(f) => f(options),
        }
    }
}

impl<T: Clone> Clone for Dynamic<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Static(value) => Self::Static(value.clone()),
            Self::Resolve(f) => Self::Resolve(Arc::clone(f)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Dynamic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(value) => value.fmt(f),
            Self::Resolve(_) => f.write_str("<resolver>"),
        }
    }
}

impl<T> From<T> for Dynamic<T> {
    fn from(value: T) -> Self {
        Self::Static(value)
    }
}

impl From<&str> for Dynamic<String> {
    fn from(value: &str) -> Self {
        Self::Static(value.to_string())
    }
}

/// Discriminant of [`Mutation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MutationKind {
    EnsureDirectory,
    RemoveFile,
    RemoveDirectory,
    Chmod,
    Backup,
    ConfigMerge,
    ConfigPrune,
    ConfigTransform,
    TemplateWrite,
    TemplateMergeJson,
    TemplateMergeToml,
}

impl MutationKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EnsureDirectory => "ensure-directory",
            Self::RemoveFile => "remove-file",
            Self::RemoveDirectory => "remove-directory",
            Self::Chmod => "chmod",
            Self::Backup => "backup",
            Self::ConfigMerge => "merge",
            Self::ConfigPrune => "prune",
            Self::ConfigTransform => "transform",
            Self::TemplateWrite => "template-write",
            Self::TemplateMergeJson => "template-merge-json",
            Self::TemplateMergeToml => "template-merge-toml",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declarative change
#[derive(Debug, Clone)]
pub enum Mutation {
    EnsureDirectory(EnsureDirectory),
    RemoveFile(RemoveFile),
    RemoveDirectory(RemoveDirectory),
    Chmod(Chmod),
    Backup(Backup),
    ConfigMerge(ConfigMerge),
    ConfigPrune(ConfigPrune),
    ConfigTransform(ConfigTransform),
    TemplateWrite(TemplateWrite),
    TemplateMergeJson(TemplateMerge),
    TemplateMergeToml(TemplateMerge),
}

impl Mutation {
    #[must_use]
    pub fn kind(&self) -> MutationKind {
        match self {
            Self::EnsureDirectory(_) => MutationKind::EnsureDirectory,
            Self::RemoveFile(_) => MutationKind::RemoveFile,
            Self::RemoveDirectory(_) => MutationKind::RemoveDirectory,
            Self::Chmod(_) => MutationKind::Chmod,
            Self::Backup(_) => MutationKind::Backup,
            Self::ConfigMerge(_) => MutationKind::ConfigMerge,
            Self::ConfigPrune(_) => MutationKind::ConfigPrune,
            Self::ConfigTransform(_) => MutationKind::ConfigTransform,
            Self::TemplateWrite(_) => MutationKind::TemplateWrite,
            Self::TemplateMergeJson(_) => MutationKind::TemplateMergeJson,
            Self::TemplateMergeToml(_) => MutationKind::TemplateMergeToml,
        }
    }

    /// The target (or directory path) of this mutation
    #[must_use]
    pub fn target(&self) -> &Dynamic<String> {
        match self {
            Self::EnsureDirectory(m) => &m.path,
            Self::RemoveDirectory(m) => &m.path,
            Self::RemoveFile(m) => &m.target,
            Self::Chmod(m) => &m.target,
            Self::Backup(m) => &m.target,
            Self::ConfigMerge(m) => &m.target,
            Self::ConfigPrune(m) => &m.target,
            Self::ConfigTransform(m) => &m.target,
            Self::TemplateWrite(m) => &m.target,
            Self::TemplateMergeJson(m) | Self::TemplateMergeToml(m) => &m.target,
        }
    }

    /// The explicit label, if one was given
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        let label = match self {
            Self::EnsureDirectory(m) => &m.label,
            Self::RemoveDirectory(m) => &m.label,
            Self::RemoveFile(m) => &m.label,
            Self::Chmod(m) => &m.label,
            Self::Backup(m) => &m.label,
            Self::ConfigMerge(m) => &m.label,
            Self::ConfigPrune(m) => &m.label,
            Self::ConfigTransform(m) => &m.label,
            Self::TemplateWrite(m) => &m.label,
            Self::TemplateMergeJson(m) | Self::TemplateMergeToml(m) => &m.label,
        };
        label.as_deref()
    }

    /// The label used in outcomes: explicit, or `"<kind> <target>"`
    #[must_use]
    pub fn display_label(&self, raw_target: &str) -> String {
        self.label()
            .map_or_else(|| format!("{} {raw_target}", self.kind()), str::to_string)
    }
}

/// An ordered list of mutations making up one logical operation
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    mutations: Vec<Mutation>,
}

impl Manifest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a mutation
    #[must_use]
    pub fn push(mut self, mutation: impl Into<Mutation>) -> Self {
        self.mutations.push(mutation.into());
        self
    }

    /// Append every mutation of another manifest
    #[must_use]
    pub fn then(mut self, other: Manifest) -> Self {
        self.mutations.extend(other.mutations);
        self
    }

    #[must_use]
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }
}

impl FromIterator<Mutation> for Manifest {
    fn from_iter<I: IntoIterator<Item = Mutation>>(iter: I) -> Self {
        Self {
            mutations: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Manifest {
    type Item = Mutation;
    type IntoIter = std::vec::IntoIter<Mutation>;

    fn into_iter(self) -> Self::IntoIter {
        self.mutations.into_iter()
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a Mutation;
    type IntoIter = std::slice::Iter<'a, Mutation>;

    fn into_iter(self) -> Self::IntoIter {
        self.mutations.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dynamic_resolution() {
        let fixed: Dynamic<String> = "~/.claude.json".into();
        assert_eq!(fixed.resolve(&RuntimeOptions::new()), "~/.claude.json");

        let computed = Dynamic::from_fn(|options: &RuntimeOptions| {
            format!(
                "~/{}/config.toml",
                options.get("dir").and_then(|v| v.as_str()).unwrap_or(".codex")
            )
        });
        let mut options = RuntimeOptions::new();
        assert_eq!(computed.resolve(&options), "~/.codex/config.toml");
        options.insert("dir".into(), json!(".alt"));
        assert_eq!(computed.resolve(&options), "~/.alt/config.toml");
        assert!(computed.as_static().is_none());
        assert_eq!(format!("{computed:?}"), "<resolver>");
    }

    #[test]
    fn test_manifest_order_and_labels() {
        let manifest = Manifest::new()
            .push(file::ensure_directory("~/.claude"))
            .push(config::merge("~/.claude.json", json!({"a": 1})).label("Register server"));

        let kinds: Vec<_> = manifest.mutations().iter().map(Mutation::kind).collect();
        assert_eq!(kinds, [MutationKind::EnsureDirectory, MutationKind::ConfigMerge]);
        assert_eq!(
            manifest.mutations()[0].display_label("~/.claude"),
            "ensure-directory ~/.claude"
        );
        assert_eq!(
            manifest.mutations()[1].display_label("~/.claude.json"),
            "Register server"
        );
    }
}
