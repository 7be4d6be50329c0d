//! Structured config document mutations

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use super::{Dynamic, Mutation, RuntimeOptions};
use crate::format::{ConfigObject, FormatKind};

/// Deep-merge a value into a config file
#[derive(Debug, Clone)]
pub struct ConfigMerge {
    pub target: Dynamic<String>,
    /// Patch document; must resolve to an object
    pub value: Dynamic<Value>,
    /// Explicit format; detected from the target's extension otherwise
    pub format: Option<FormatKind>,
    /// Dotted table path → key prefix to drop before merging
    pub prune_by_prefix: BTreeMap<String, String>,
    /// Exact `(table path, key)` entries dropped before merging
    pub replace_entries: Vec<(String, String)>,
    pub label: Option<String>,
}

/// Remove keys from a config file by shape
#[derive(Debug, Clone)]
pub struct ConfigPrune {
    pub target: Dynamic<String>,
    /// Deletion mask; must resolve to an object
    pub shape: Dynamic<Value>,
    pub format: Option<FormatKind>,
    /// Skip the prune unless the guard accepts the parsed document
    pub only_if: Option<Guard>,
    /// Delete the file when pruning leaves the document empty
    pub remove_when_empty: bool,
    pub label: Option<String>,
}

/// Rewrite a whole config document with a caller-supplied function
#[derive(Debug, Clone)]
pub struct ConfigTransform {
    pub target: Dynamic<String>,
    pub format: Option<FormatKind>,
    pub transform: TransformFn,
    pub label: Option<String>,
}

/// What the transform function sees besides the document
#[derive(Debug)]
pub struct TransformContext<'a> {
    pub options: &'a RuntimeOptions,
    /// Resolved absolute path of the target
    pub path: &'a Path,
    /// Whether the file existed before the transform
    pub exists: bool,
}

/// Result of a transform function
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutcome {
    /// Replacement document, or `None` to delete the file
    pub content: Option<ConfigObject>,
    /// Whether the transform changed anything; `false` leaves the file alone
    pub changed: bool,
}

impl TransformOutcome {
    #[must_use]
    pub fn new(content: Option<ConfigObject>, changed: bool) -> Self {
        Self { content, changed }
    }

    /// Replace the document
    #[must_use]
    pub fn replace(content: ConfigObject) -> Self {
        Self::new(Some(content), true)
    }

    /// Delete the file
    #[must_use]
    pub fn delete() -> Self {
        Self::new(None, true)
    }

    /// Leave the file untouched
    #[must_use]
    pub fn unchanged(content: ConfigObject) -> Self {
        Self::new(Some(content), false)
    }
}

type TransformBody = dyn Fn(&ConfigObject, &TransformContext<'_>) -> TransformOutcome + Send + Sync;
type GuardBody = dyn Fn(&ConfigObject, &RuntimeOptions) -> bool + Send + Sync;

/// A document transform function
#[derive(Clone)]
pub struct TransformFn(Arc<TransformBody>);

impl TransformFn {
    pub fn new(
        f: impl Fn(&ConfigObject, &TransformContext<'_>) -> TransformOutcome + Send + Sync + 'static,
    ) -> Self {
        Self(Arc::new(f))
    }

    #[must_use]
    pub fn call(&self, document: &ConfigObject, context: &TransformContext<'_>) -> TransformOutcome {
        (self.0)(document, context)
    }
}

impl fmt::Debug for TransformFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<transform>")
    }
}

/// A predicate over a parsed document
#[derive(Clone)]
pub struct Guard(Arc<GuardBody>);

impl Guard {
    pub fn new(f: impl Fn(&ConfigObject, &RuntimeOptions) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    #[must_use]
    pub fn check(&self, document: &ConfigObject, options: &RuntimeOptions) -> bool {
        (self.0)(document, options)
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<guard>")
    }
}

pub fn merge(target: impl Into<Dynamic<String>>, value: impl Into<Dynamic<Value>>) -> ConfigMerge {
    ConfigMerge {
        target: target.into(),
        value: value.into(),
        format: None,
        prune_by_prefix: BTreeMap::new(),
        replace_entries: Vec::new(),
        label: None,
    }
}

pub fn prune(target: impl Into<Dynamic<String>>, shape: impl Into<Dynamic<Value>>) -> ConfigPrune {
    ConfigPrune {
        target: target.into(),
        shape: shape.into(),
        format: None,
        only_if: None,
        remove_when_empty: false,
        label: None,
    }
}

pub fn transform(
    target: impl Into<Dynamic<String>>,
    f: impl Fn(&ConfigObject, &TransformContext<'_>) -> TransformOutcome + Send + Sync + 'static,
) -> ConfigTransform {
    ConfigTransform {
        target: target.into(),
        format: None,
        transform: TransformFn::new(f),
        label: None,
    }
}

impl ConfigMerge {
    #[must_use]
    pub fn format(mut self, format: FormatKind) -> Self {
        self.format = Some(format);
        self
    }

    /// Drop keys of the table at `table_path` starting with `prefix` first
    #[must_use]
    pub fn prune_by_prefix(mut self, table_path: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.prune_by_prefix.insert(table_path.into(), prefix.into());
        self
    }

    /// Replace `table_path.key` wholesale instead of merging into it
    #[must_use]
    pub fn replace_entry(mut self, table_path: impl Into<String>, key: impl Into<String>) -> Self {
        self.replace_entries.push((table_path.into(), key.into()));
        self
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl ConfigPrune {
    #[must_use]
    pub fn format(mut self, format: FormatKind) -> Self {
        self.format = Some(format);
        self
    }

    #[must_use]
    pub fn only_if(
        mut self,
        guard: impl Fn(&ConfigObject, &RuntimeOptions) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.only_if = Some(Guard::new(guard));
        self
    }

    #[must_use]
    pub fn remove_when_empty(mut self, remove: bool) -> Self {
        self.remove_when_empty = remove;
        self
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl ConfigTransform {
    #[must_use]
    pub fn format(mut self, format: FormatKind) -> Self {
        self.format = Some(format);
        self
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl From<ConfigMerge> for Mutation {
    fn from(m: ConfigMerge) -> Self {
        Self::ConfigMerge(m)
    }
}

impl From<ConfigPrune> for Mutation {
    fn from(m: ConfigPrune) -> Self {
        Self::ConfigPrune(m)
    }
}

impl From<ConfigTransform> for Mutation {
    fn from(m: ConfigTransform) -> Self {
        Self::ConfigTransform(m)
    }
}
