//! Apply planned changes to a filesystem

use std::path::Path;

use super::plan::{FileChange, PlannedChange};
use crate::error::{MutationError, MutationResult};
use crate::fs::{stat_optional, FileSystem};

/// Apply one planned change
///
/// Writes create missing parent directories first.
///
/// # Errors
/// Returns `Io` with the mutation label and path attached
pub(super) async fn apply_change(
    fs: &dyn FileSystem,
    planned: &PlannedChange,
    label: &str,
) -> MutationResult<()> {
    let path = planned.path.as_path();
    let io = |source| MutationError::io(label, path, source);

    match &planned.change {
        FileChange::Unchanged => Ok(()),
        FileChange::CreateDirectory => fs.create_dir_all(path).await.map_err(io),
        FileChange::Write { contents, .. } => {
            if let Some(parent) = path.parent() {
                ensure_parent(fs, parent, label).await?;
            }
            fs.write_file(path, contents).await.map_err(io)
        }
        FileChange::DeleteFile { .. } => fs.remove_file(path).await.map_err(io),
        FileChange::RemoveDirectory { recursive } => {
            fs.remove_dir(path, *recursive).await.map_err(io)
        }
        FileChange::SetMode { mode } => fs.set_mode(path, *mode).await.map_err(io),
    }
}

async fn ensure_parent(fs: &dyn FileSystem, parent: &Path, label: &str) -> MutationResult<()> {
    let existing = stat_optional(fs, parent)
        .await
        .map_err(|e| MutationError::io(label, parent, e))?;
    if existing.is_none() {
        fs.create_dir_all(parent)
            .await
            .map_err(|e| MutationError::io(label, parent, e))?;
    }
    Ok(())
}
