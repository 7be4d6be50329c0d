//! Copy-on-write overlay used for dry runs
//!
//! Reads fall through to the base filesystem; writes and removals are held
//! in memory. Later mutations in a dry-run batch therefore see the effects
//! of earlier ones while the base is never written.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::{
    already_exists, directory_not_empty, is_a_directory, not_a_directory, not_found, FileKind,
    FileStat, FileSystem,
};

const DEFAULT_FILE_MODE: u32 = 0o644;
const DEFAULT_DIR_MODE: u32 = 0o755;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Staged {
    File { contents: String, mode: u32 },
    /// `opaque` hides whatever the base holds below this directory
    Dir { opaque: bool },
    Removed,
}

/// What a path resolves to through the overlay
enum View {
    Staged(Staged),
    Hidden,
    Base,
}

/// Overlay that records changes instead of writing them
pub struct StagedFileSystem {
    base: Arc<dyn FileSystem>,
    staged: Mutex<BTreeMap<PathBuf, Staged>>,
}

impl std::fmt::Debug for StagedFileSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedFileSystem")
            .field("staged", &self.lock_staged().len())
            .finish_non_exhaustive()
    }
}

impl StagedFileSystem {
    #[must_use]
    pub fn new(base: Arc<dyn FileSystem>) -> Self {
        Self {
            base,
            staged: Mutex::new(BTreeMap::new()),
        }
    }

    /// Paths written during the simulation, with their staged contents
    #[must_use]
    pub fn staged_files(&self) -> BTreeMap<PathBuf, String> {
        self.lock_staged()
            .iter()
            .filter_map(|(path, entry)| match entry {
                Staged::File { contents, .. } => Some((path.clone(), contents.clone())),
                _ => None,
            })
            .collect()
    }

    fn lock_staged(&self) -> MutexGuard<'_, BTreeMap<PathBuf, Staged>> {
        self.staged
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn view(&self, path: &Path) -> View {
        let staged = self.lock_staged();
        if let Some(entry) = staged.get(path) {
            return View::Staged(entry.clone());
        }
        for ancestor in path.ancestors().skip(1) {
            match staged.get(ancestor) {
                Some(Staged::Removed | Staged::File { .. } | Staged::Dir { opaque: true }) => {
                    return View::Hidden;
                }
                Some(Staged::Dir { opaque: false }) | None => {}
            }
        }
        View::Base
    }

    async fn stat(&self, path: &Path) -> io::Result<FileStat> {
        match self.view(path) {
            View::Staged(Staged::File { contents, mode }) => Ok(FileStat {
                kind: FileKind::File,
                len: contents.len() as u64,
                mode,
            }),
            View::Staged(Staged::Dir { .. }) => {
                let mode = match self.base.metadata(path).await {
                    Ok(stat) if stat.is_dir() => stat.mode,
                    _ => DEFAULT_DIR_MODE,
                };
                Ok(FileStat {
                    kind: FileKind::Directory,
                    len: 0,
                    mode,
                })
            }
            View::Staged(Staged::Removed) | View::Hidden => Err(not_found(path)),
            View::Base => self.base.metadata(path).await,
        }
    }

    async fn require_dir(&self, path: &Path) -> io::Result<()> {
        let stat = self.stat(path).await?;
        if stat.is_dir() {
            Ok(())
        } else {
            Err(not_a_directory(path))
        }
    }
}

#[async_trait]
impl FileSystem for StagedFileSystem {
    async fn read_file(&self, path: &Path) -> io::Result<String> {
        match self.view(path) {
            View::Staged(Staged::File { contents, .. }) => Ok(contents),
            View::Staged(Staged::Dir { .. }) => Err(is_a_directory(path)),
            View::Staged(Staged::Removed) | View::Hidden => Err(not_found(path)),
            View::Base => self.base.read_file(path).await,
        }
    }

    async fn write_file(&self, path: &Path, contents: &str) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            self.require_dir(parent).await?;
        }
        let mode = match self.stat(path).await {
            Ok(stat) if stat.is_dir() => return Err(is_a_directory(path)),
            Ok(stat) => stat.mode,
            Err(_) => DEFAULT_FILE_MODE,
        };
        self.lock_staged().insert(
            path.to_path_buf(),
            Staged::File {
                contents: contents.to_string(),
                mode,
            },
        );
        Ok(())
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut missing = Vec::new();
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            match self.stat(ancestor).await {
                Ok(stat) if stat.is_dir() => break,
                Ok(_) => return Err(already_exists(ancestor)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => missing.push(ancestor),
                Err(e) => return Err(e),
            }
        }

        let mut staged = self.lock_staged();
        for dir in missing.into_iter().rev() {
            let opaque = matches!(staged.get(dir), Some(Staged::Removed))
                || staged
                    .iter()
                    .any(|(p, s)| *s == Staged::Removed && dir.starts_with(p));
            staged.insert(dir.to_path_buf(), Staged::Dir { opaque });
        }
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        let stat = self.stat(path).await?;
        if stat.is_dir() {
            return Err(is_a_directory(path));
        }
        self.lock_staged().insert(path.to_path_buf(), Staged::Removed);
        Ok(())
    }

    async fn remove_dir(&self, path: &Path, recursive: bool) -> io::Result<()> {
        self.require_dir(path).await?;
        if !recursive && !self.list_dir(path).await?.is_empty() {
            return Err(directory_not_empty(path));
        }
        let mut staged = self.lock_staged();
        staged.retain(|candidate, _| !candidate.starts_with(path));
        staged.insert(path.to_path_buf(), Staged::Removed);
        Ok(())
    }

    async fn metadata(&self, path: &Path) -> io::Result<FileStat> {
        self.stat(path).await
    }

    async fn set_mode(&self, path: &Path, new_mode: u32) -> io::Result<()> {
        let stat = self.stat(path).await?;
        if stat.is_dir() {
            // Directory modes are not tracked in the overlay
            return Ok(());
        }
        let contents = self.read_file(path).await?;
        self.lock_staged().insert(
            path.to_path_buf(),
            Staged::File {
                contents,
                mode: new_mode,
            },
        );
        Ok(())
    }

    async fn list_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        self.require_dir(path).await?;

        let mut names = BTreeSet::new();
        let base_visible = matches!(
            self.view(path),
            View::Base | View::Staged(Staged::Dir { opaque: false })
        );
        if base_visible {
            match self.base.list_dir(path).await {
                Ok(base_names) => names.extend(base_names),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }

        let staged_children: Vec<(String, Staged)> = self
            .lock_staged()
            .iter()
            .filter(|(candidate, _)| candidate.parent() == Some(path))
            .filter_map(|(candidate, entry)| {
                candidate
                    .file_name()
                    .map(|name| (name.to_string_lossy().into_owned(), entry.clone()))
            })
            .collect();
        for (name, entry) in staged_children {
            if entry == Staged::Removed {
                names.remove(&name);
            } else {
                names.insert(name);
            }
        }

        Ok(names.into_iter().collect())
    }
}
