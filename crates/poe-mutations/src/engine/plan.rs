//! Compute the change a mutation would make, without making it

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::{Action, MutationContext};
use crate::diff::render_diff;
use crate::error::{MutationError, MutationResult};
use crate::format::{
    detect_format, prune_by_prefix, remove_entries, resolve_format, ConfigObject, FormatKind,
};
use crate::fs::{read_optional, stat_optional, FileSystem};
use crate::mutation::file::BACKUP_SUFFIX;
use crate::mutation::{
    Backup, Chmod, ConfigMerge, ConfigPrune, ConfigTransform, EnsureDirectory, Mutation,
    RemoveDirectory, RemoveFile, TemplateMerge, TemplateWrite, TransformContext,
};

/// A pending change to one path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Unchanged,
    CreateDirectory,
    /// Replace the file's content; `previous` is `None` for a new file
    Write {
        previous: Option<String>,
        contents: String,
        format: Option<FormatKind>,
    },
    DeleteFile {
        previous: String,
        format: Option<FormatKind>,
    },
    RemoveDirectory {
        recursive: bool,
    },
    SetMode {
        mode: u32,
    },
}

impl FileChange {
    #[must_use]
    pub fn action(&self) -> Action {
        match self {
            Self::Unchanged => Action::None,
            Self::CreateDirectory => Action::CreateDirectory,
            Self::Write { previous: None, .. } => Action::CreateFile,
            Self::Write { .. } => Action::UpdateFile,
            Self::DeleteFile { .. } => Action::DeleteFile,
            Self::RemoveDirectory { .. } => Action::RemoveDirectory,
            Self::SetMode { .. } => Action::SetMode,
        }
    }

    /// Redacted diff lines for content changes
    #[must_use]
    pub fn diff(&self, display_path: &str) -> Vec<String> {
        match self {
            Self::Write {
                previous,
                contents,
                format,
            } => render_diff(display_path, previous.as_deref(), Some(contents), *format),
            Self::DeleteFile { previous, format } => {
                render_diff(display_path, Some(previous), None, *format)
            }
            _ => Vec::new(),
        }
    }
}

/// A change together with the path it applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedChange {
    pub path: PathBuf,
    pub change: FileChange,
}

/// The resolved target of the mutation being planned
pub(super) struct Target<'a> {
    pub raw: &'a str,
    pub path: &'a Path,
    pub label: &'a str,
}

impl Target<'_> {
    fn io(&self, source: std::io::Error) -> MutationError {
        MutationError::io(self.label, self.path, source)
    }

    fn planned(&self, change: FileChange) -> PlannedChange {
        PlannedChange {
            path: self.path.to_path_buf(),
            change,
        }
    }

    fn format(&self, explicit: Option<FormatKind>) -> MutationResult<FormatKind> {
        explicit.map_or_else(|| resolve_format(self.raw), Ok)
    }

    async fn read(&self, fs: &dyn FileSystem) -> MutationResult<Option<String>> {
        read_optional(fs, self.path).await.map_err(|e| self.io(e))
    }

    fn parse(&self, format: FormatKind, content: Option<&str>) -> MutationResult<ConfigObject> {
        format
            .handler()
            .parse(content.unwrap_or_default())
            .map_err(|e| MutationError::from_format(self.path, e))
    }

    fn serialize(&self, format: FormatKind, document: &ConfigObject) -> MutationResult<String> {
        format
            .handler()
            .serialize(document)
            .map_err(|e| MutationError::from_format(self.path, e))
    }

    fn object(&self, value: Value, what: &str) -> MutationResult<ConfigObject> {
        match value {
            Value::Object(map) => Ok(map),
            other => Err(MutationError::InvalidValue {
                label: self.label.to_string(),
                message: format!("{what} must be an object, got {}", json_type(&other)),
            }),
        }
    }
}

pub(super) async fn plan_mutation(
    mutation: &Mutation,
    target: &Target<'_>,
    fs: &dyn FileSystem,
    context: &MutationContext,
) -> MutationResult<PlannedChange> {
    match mutation {
        Mutation::EnsureDirectory(m) => plan_ensure_directory(m, target, fs).await,
        Mutation::RemoveFile(m) => plan_remove_file(m, target, fs).await,
        Mutation::RemoveDirectory(m) => plan_remove_directory(m, target, fs).await,
        Mutation::Chmod(m) => plan_chmod(m, target, fs).await,
        Mutation::Backup(m) => plan_backup(m, target, fs).await,
        Mutation::ConfigMerge(m) => plan_merge(m, target, fs, context).await,
        Mutation::ConfigPrune(m) => plan_prune(m, target, fs, context).await,
        Mutation::ConfigTransform(m) => plan_transform(m, target, fs, context).await,
        Mutation::TemplateWrite(m) => plan_template_write(m, target, fs, context).await,
        Mutation::TemplateMergeJson(m) => {
            plan_template_merge(m, FormatKind::Json, target, fs, context).await
        }
        Mutation::TemplateMergeToml(m) => {
            plan_template_merge(m, FormatKind::Toml, target, fs, context).await
        }
    }
}

async fn plan_ensure_directory(
    _mutation: &EnsureDirectory,
    target: &Target<'_>,
    fs: &dyn FileSystem,
) -> MutationResult<PlannedChange> {
    let stat = stat_optional(fs, target.path)
        .await
        .map_err(|e| target.io(e))?;
    match stat {
        Some(stat) if stat.is_dir() => Ok(target.planned(FileChange::Unchanged)),
        Some(_) => Err(target.io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "a file exists where a directory is expected",
        ))),
        None => Ok(target.planned(FileChange::CreateDirectory)),
    }
}

async fn plan_remove_file(
    mutation: &RemoveFile,
    target: &Target<'_>,
    fs: &dyn FileSystem,
) -> MutationResult<PlannedChange> {
    let Some(previous) = target.read(fs).await? else {
        return Ok(target.planned(FileChange::Unchanged));
    };

    if mutation.when_empty && !previous.trim().is_empty() {
        return Ok(target.planned(FileChange::Unchanged));
    }
    if let Some(pattern) = &mutation.when_content_matches {
        if !pattern.is_match(&previous) {
            return Ok(target.planned(FileChange::Unchanged));
        }
    }

    Ok(target.planned(FileChange::DeleteFile {
        previous,
        format: detect_format(target.raw),
    }))
}

async fn plan_remove_directory(
    mutation: &RemoveDirectory,
    target: &Target<'_>,
    fs: &dyn FileSystem,
) -> MutationResult<PlannedChange> {
    let stat = stat_optional(fs, target.path)
        .await
        .map_err(|e| target.io(e))?;
    let Some(stat) = stat else {
        return Ok(target.planned(FileChange::Unchanged));
    };
    if !stat.is_dir() {
        return Err(target.io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "not a directory",
        )));
    }

    if mutation.force {
        return Ok(target.planned(FileChange::RemoveDirectory { recursive: true }));
    }

    let entries = fs.list_dir(target.path).await.map_err(|e| target.io(e))?;
    if entries.is_empty() {
        Ok(target.planned(FileChange::RemoveDirectory { recursive: false }))
    } else {
        Ok(target.planned(FileChange::Unchanged))
    }
}

async fn plan_chmod(
    mutation: &Chmod,
    target: &Target<'_>,
    fs: &dyn FileSystem,
) -> MutationResult<PlannedChange> {
    let stat = fs.metadata(target.path).await.map_err(|e| target.io(e))?;
    if stat.mode & 0o7777 == mutation.mode {
        Ok(target.planned(FileChange::Unchanged))
    } else {
        Ok(target.planned(FileChange::SetMode {
            mode: mutation.mode,
        }))
    }
}

async fn plan_backup(
    _mutation: &Backup,
    target: &Target<'_>,
    fs: &dyn FileSystem,
) -> MutationResult<PlannedChange> {
    let contents = fs.read_file(target.path).await.map_err(|e| target.io(e))?;

    let backup_path = backup_path(target.path);
    let previous = read_optional(fs, &backup_path)
        .await
        .map_err(|e| MutationError::io(target.label, &backup_path, e))?;

    let change = if previous.as_deref() == Some(contents.as_str()) {
        FileChange::Unchanged
    } else {
        FileChange::Write {
            previous,
            contents,
            format: detect_format(target.raw),
        }
    };
    Ok(PlannedChange {
        path: backup_path,
        change,
    })
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(OsString::new, std::ffi::OsStr::to_os_string);
    name.push(BACKUP_SUFFIX);
    path.with_file_name(name)
}

async fn plan_merge(
    mutation: &ConfigMerge,
    target: &Target<'_>,
    fs: &dyn FileSystem,
    context: &MutationContext,
) -> MutationResult<PlannedChange> {
    let format = target.format(mutation.format)?;
    let patch = target.object(mutation.value.resolve(&context.options), "merge value")?;
    let cleanup = Cleanup {
        prefixes: &mutation.prune_by_prefix,
        entries: &mutation.replace_entries,
    };
    merge_into(target, fs, format, &patch, &cleanup).await
}

/// Keys dropped from the current document before a merge
struct Cleanup<'a> {
    prefixes: &'a BTreeMap<String, String>,
    entries: &'a [(String, String)],
}

async fn merge_into(
    target: &Target<'_>,
    fs: &dyn FileSystem,
    format: FormatKind,
    patch: &ConfigObject,
    cleanup: &Cleanup<'_>,
) -> MutationResult<PlannedChange> {
    let previous = target.read(fs).await?;
    let mut document = target.parse(format, previous.as_deref())?;
    prune_by_prefix(&mut document, cleanup.prefixes);
    remove_entries(&mut document, cleanup.entries);
    let merged = format.handler().merge(&document, patch);
    let contents = target.serialize(format, &merged)?;
    Ok(target.planned(write_if_changed(previous, contents, format)))
}

async fn plan_prune(
    mutation: &ConfigPrune,
    target: &Target<'_>,
    fs: &dyn FileSystem,
    context: &MutationContext,
) -> MutationResult<PlannedChange> {
    let format = target.format(mutation.format)?;
    let shape = target.object(mutation.shape.resolve(&context.options), "prune shape")?;

    let Some(previous) = target.read(fs).await? else {
        return Ok(target.planned(FileChange::Unchanged));
    };
    let document = target.parse(format, Some(&previous))?;

    if let Some(guard) = &mutation.only_if {
        if !guard.check(&document, &context.options) {
            return Ok(target.planned(FileChange::Unchanged));
        }
    }

    let pruned = format.handler().prune(&document, &shape);
    if !pruned.changed {
        return Ok(target.planned(FileChange::Unchanged));
    }

    if pruned.result.is_empty() && mutation.remove_when_empty {
        return Ok(target.planned(FileChange::DeleteFile {
            previous,
            format: Some(format),
        }));
    }

    let contents = target.serialize(format, &pruned.result)?;
    Ok(target.planned(write_if_changed(Some(previous), contents, format)))
}

async fn plan_transform(
    mutation: &ConfigTransform,
    target: &Target<'_>,
    fs: &dyn FileSystem,
    context: &MutationContext,
) -> MutationResult<PlannedChange> {
    let format = target.format(mutation.format)?;
    let previous = target.read(fs).await?;
    let document = target.parse(format, previous.as_deref())?;

    let transform_context = TransformContext {
        options: &context.options,
        path: target.path,
        exists: previous.is_some(),
    };
    let outcome = mutation.transform.call(&document, &transform_context);
    if !outcome.changed {
        return Ok(target.planned(FileChange::Unchanged));
    }

    let change = match (outcome.content, previous) {
        (None, Some(previous)) => FileChange::DeleteFile {
            previous,
            format: Some(format),
        },
        (None, None) => FileChange::Unchanged,
        (Some(next), previous) => {
            let contents = target.serialize(format, &next)?;
            write_if_changed(previous, contents, format)
        }
    };
    Ok(target.planned(change))
}

async fn render(
    template_id: &str,
    vars: &crate::template::TemplateVars,
    target: &Target<'_>,
    context: &MutationContext,
) -> MutationResult<String> {
    let loader = context
        .templates
        .as_ref()
        .ok_or_else(|| MutationError::MissingCapability {
            label: target.label.to_string(),
            capability: "template loader",
        })?;
    let body = loader.load(template_id).await?;
    context.renderer.render_named(template_id, &body, vars)
}

async fn plan_template_write(
    mutation: &TemplateWrite,
    target: &Target<'_>,
    fs: &dyn FileSystem,
    context: &MutationContext,
) -> MutationResult<PlannedChange> {
    let vars = mutation.context.resolve(&context.options);
    let contents = render(&mutation.template_id, &vars, target, context).await?;
    let previous = target.read(fs).await?;

    let change = if previous.as_deref() == Some(contents.as_str()) {
        FileChange::Unchanged
    } else {
        FileChange::Write {
            previous,
            contents,
            format: detect_format(target.raw),
        }
    };
    Ok(target.planned(change))
}

async fn plan_template_merge(
    mutation: &TemplateMerge,
    format: FormatKind,
    target: &Target<'_>,
    fs: &dyn FileSystem,
    context: &MutationContext,
) -> MutationResult<PlannedChange> {
    let vars = mutation.context.resolve(&context.options);
    let rendered = render(&mutation.template_id, &vars, target, context).await?;
    let patch = format
        .handler()
        .parse(&rendered)
        .map_err(|e| MutationError::Template {
            template: mutation.template_id.clone(),
            message: e.to_string(),
        })?;
    let cleanup = Cleanup {
        prefixes: &mutation.prune_by_prefix,
        entries: &mutation.replace_entries,
    };
    merge_into(target, fs, format, &patch, &cleanup).await
}

fn write_if_changed(previous: Option<String>, contents: String, format: FormatKind) -> FileChange {
    if previous.as_deref() == Some(contents.as_str()) {
        FileChange::Unchanged
    } else {
        FileChange::Write {
            previous,
            contents,
            format: Some(format),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
