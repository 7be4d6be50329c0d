//! Template-backed mutations

use std::collections::BTreeMap;

use super::{Dynamic, Mutation};
use crate::template::TemplateVars;

/// Render a template and write it as the file's full content
#[derive(Debug, Clone)]
pub struct TemplateWrite {
    pub target: Dynamic<String>,
    pub template_id: String,
    pub context: Dynamic<TemplateVars>,
    pub label: Option<String>,
}

/// Render a template, parse it, and merge it into a config file
#[derive(Debug, Clone)]
pub struct TemplateMerge {
    pub target: Dynamic<String>,
    pub template_id: String,
    pub context: Dynamic<TemplateVars>,
    /// Dotted table path → key prefix to drop before merging
    pub prune_by_prefix: BTreeMap<String, String>,
    /// Exact `(table path, key)` entries dropped before merging
    pub replace_entries: Vec<(String, String)>,
    pub label: Option<String>,
}

pub fn write(target: impl Into<Dynamic<String>>, template_id: impl Into<String>) -> TemplateWrite {
    TemplateWrite {
        target: target.into(),
        template_id: template_id.into(),
        context: Dynamic::Static(TemplateVars::new()),
        label: None,
    }
}

/// Merge a rendered JSON template
pub fn merge_json(target: impl Into<Dynamic<String>>, template_id: impl Into<String>) -> MergeJson {
    MergeJson(template_merge(target, template_id))
}

/// Merge a rendered TOML template
pub fn merge_toml(target: impl Into<Dynamic<String>>, template_id: impl Into<String>) -> MergeToml {
    MergeToml(template_merge(target, template_id))
}

fn template_merge(target: impl Into<Dynamic<String>>, template_id: impl Into<String>) -> TemplateMerge {
    TemplateMerge {
        target: target.into(),
        template_id: template_id.into(),
        context: Dynamic::Static(TemplateVars::new()),
        prune_by_prefix: BTreeMap::new(),
        replace_entries: Vec::new(),
        label: None,
    }
}

/// Builder for a JSON template merge
#[derive(Debug, Clone)]
pub struct MergeJson(pub TemplateMerge);

/// Builder for a TOML template merge
#[derive(Debug, Clone)]
pub struct MergeToml(pub TemplateMerge);

impl TemplateWrite {
    #[must_use]
    pub fn context(mut self, context: impl Into<Dynamic<TemplateVars>>) -> Self {
        self.context = context.into();
        self
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

macro_rules! merge_builder {
    ($builder:ident) => {
        impl $builder {
            #[must_use]
            pub fn context(mut self, context: impl Into<Dynamic<TemplateVars>>) -> Self {
                self.0.context = context.into();
                self
            }

            /// Drop keys of the table at `table_path` starting with `prefix` first
            #[must_use]
            pub fn prune_by_prefix(
                mut self,
                table_path: impl Into<String>,
                prefix: impl Into<String>,
            ) -> Self {
                self.0.prune_by_prefix.insert(table_path.into(), prefix.into());
                self
            }

            /// Replace `table_path.key` wholesale instead of merging into it
            #[must_use]
            pub fn replace_entry(
                mut self,
                table_path: impl Into<String>,
                key: impl Into<String>,
            ) -> Self {
                self.0.replace_entries.push((table_path.into(), key.into()));
                self
            }

            #[must_use]
            pub fn label(mut self, label: impl Into<String>) -> Self {
                self.0.label = Some(label.into());
                self
            }
        }
    };
}

merge_builder!(MergeJson);
merge_builder!(MergeToml);

impl From<TemplateWrite> for Mutation {
    fn from(m: TemplateWrite) -> Self {
        Self::TemplateWrite(m)
    }
}

impl From<MergeJson> for Mutation {
    fn from(m: MergeJson) -> Self {
        Self::TemplateMergeJson(m.0)
    }
}

impl From<MergeToml> for Mutation {
    fn from(m: MergeToml) -> Self {
        Self::TemplateMergeToml(m.0)
    }
}
