//! In-memory filesystem for tests and previews

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{
    already_exists, directory_not_empty, is_a_directory, not_a_directory, not_found, FileKind,
    FileStat, FileSystem,
};

const DEFAULT_FILE_MODE: u32 = 0o644;
const DEFAULT_DIR_MODE: u32 = 0o755;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    File { contents: String, mode: u32 },
    Dir { mode: u32 },
}

/// A filesystem held entirely in memory
///
/// Behaves like a POSIX tree: writes need an existing parent directory and
/// non-recursive directory removal needs an empty directory.
#[derive(Debug)]
pub struct MemoryFileSystem {
    nodes: Mutex<BTreeMap<PathBuf, Node>>,
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFileSystem {
    /// An empty tree containing only the root directory
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(root(), Node::Dir { mode: DEFAULT_DIR_MODE });
        Self {
            nodes: Mutex::new(nodes),
        }
    }

    /// Add a directory and its ancestors
    #[must_use]
    pub fn with_dir(self, path: impl AsRef<Path>) -> Self {
        {
            let mut nodes = self.lock_nodes();
            insert_dirs(&mut nodes, path.as_ref());
        }
        self
    }

    /// Add a file, creating its ancestors
    #[must_use]
    pub fn with_file(self, path: impl AsRef<Path>, contents: impl Into<String>) -> Self {
        {
            let path = path.as_ref();
            let mut nodes = self.lock_nodes();
            if let Some(parent) = path.parent() {
                insert_dirs(&mut nodes, parent);
            }
            nodes.insert(
                path.to_path_buf(),
                Node::File {
                    contents: contents.into(),
                    mode: DEFAULT_FILE_MODE,
                },
            );
        }
        self
    }

    /// Every file with its contents, for comparing before/after states
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<PathBuf, String> {
        self.lock_nodes()
            .iter()
            .filter_map(|(path, node)| match node {
                Node::File { contents, .. } => Some((path.clone(), contents.clone())),
                Node::Dir { .. } => None,
            })
            .collect()
    }

    /// Every directory path
    #[must_use]
    pub fn directories(&self) -> Vec<PathBuf> {
        self.lock_nodes()
            .iter()
            .filter(|(_, node)| matches!(node, Node::Dir { .. }))
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Whether any entry exists at `path`
    #[must_use]
    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.lock_nodes().contains_key(path.as_ref())
    }

    fn lock_nodes(&self) -> MutexGuard<'_, BTreeMap<PathBuf, Node>> {
        // A panic while holding the lock cannot leave the map half-updated
        self.nodes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn root() -> PathBuf {
    PathBuf::from("/")
}

fn insert_dirs(nodes: &mut BTreeMap<PathBuf, Node>, path: &Path) {
    for ancestor in path.ancestors() {
        if ancestor.as_os_str().is_empty() {
            continue;
        }
        nodes
            .entry(ancestor.to_path_buf())
            .or_insert(Node::Dir { mode: DEFAULT_DIR_MODE });
    }
}

fn children<'a>(
    nodes: &'a BTreeMap<PathBuf, Node>,
    dir: &'a Path,
) -> impl Iterator<Item = &'a PathBuf> + 'a {
    nodes
        .keys()
        .filter(move |candidate| candidate.parent() == Some(dir))
}

#[async_trait]
impl FileSystem for MemoryFileSystem {
    async fn read_file(&self, path: &Path) -> io::Result<String> {
        match self.lock_nodes().get(path) {
            Some(Node::File { contents, .. }) => Ok(contents.clone()),
            Some(Node::Dir { .. }) => Err(is_a_directory(path)),
            None => Err(not_found(path)),
        }
    }

    async fn write_file(&self, path: &Path, contents: &str) -> io::Result<()> {
        let mut nodes = self.lock_nodes();
        match path.parent().map(|parent| nodes.get(parent)) {
            Some(Some(Node::Dir { .. })) | None => {}
            Some(Some(Node::File { .. })) => return Err(not_a_directory(path)),
            Some(None) => return Err(not_found(path)),
        }
        let mode = match nodes.get(path) {
            Some(Node::Dir { .. }) => return Err(is_a_directory(path)),
            Some(Node::File { mode, .. }) => *mode,
            None => DEFAULT_FILE_MODE,
        };
        nodes.insert(
            path.to_path_buf(),
            Node::File {
                contents: contents.to_string(),
                mode,
            },
        );
        Ok(())
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut nodes = self.lock_nodes();
        for ancestor in path.ancestors() {
            if let Some(Node::File { .. }) = nodes.get(ancestor) {
                return Err(already_exists(ancestor));
            }
        }
        insert_dirs(&mut nodes, path);
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        let mut nodes = self.lock_nodes();
        match nodes.get(path) {
            Some(Node::File { .. }) => {
                nodes.remove(path);
                Ok(())
            }
            Some(Node::Dir { .. }) => Err(is_a_directory(path)),
            None => Err(not_found(path)),
        }
    }

    async fn remove_dir(&self, path: &Path, recursive: bool) -> io::Result<()> {
        let mut nodes = self.lock_nodes();
        match nodes.get(path) {
            Some(Node::Dir { .. }) => {}
            Some(Node::File { .. }) => return Err(not_a_directory(path)),
            None => return Err(not_found(path)),
        }
        let has_children = children(&nodes, path).next().is_some();
        if has_children && !recursive {
            return Err(directory_not_empty(path));
        }
        nodes.retain(|candidate, _| !candidate.starts_with(path));
        Ok(())
    }

    async fn metadata(&self, path: &Path) -> io::Result<FileStat> {
        match self.lock_nodes().get(path) {
            Some(Node::File { contents, mode }) => Ok(FileStat {
                kind: FileKind::File,
                len: contents.len() as u64,
                mode: *mode,
            }),
            Some(Node::Dir { mode }) => Ok(FileStat {
                kind: FileKind::Directory,
                len: 0,
                mode: *mode,
            }),
            None => Err(not_found(path)),
        }
    }

    async fn set_mode(&self, path: &Path, new_mode: u32) -> io::Result<()> {
        match self.lock_nodes().get_mut(path) {
            Some(Node::File { mode, .. } | Node::Dir { mode }) => {
                *mode = new_mode;
                Ok(())
            }
            None => Err(not_found(path)),
        }
    }

    async fn list_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let nodes = self.lock_nodes();
        match nodes.get(path) {
            Some(Node::Dir { .. }) => {}
            Some(Node::File { .. }) => return Err(not_a_directory(path)),
            None => return Err(not_found(path)),
        }
        Ok(children(&nodes, path)
            .filter_map(|child| child.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_requires_parent() {
        let fs = MemoryFileSystem::new().with_dir("/home/user");
        let err = fs
            .write_file(Path::new("/home/user/.codex/config.toml"), "x")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        fs.create_dir_all(Path::new("/home/user/.codex")).await.unwrap();
        fs.write_file(Path::new("/home/user/.codex/config.toml"), "x")
            .await
            .unwrap();
        assert_eq!(
            fs.read_file(Path::new("/home/user/.codex/config.toml"))
                .await
                .unwrap(),
            "x"
        );
    }

    #[tokio::test]
    async fn test_remove_dir_semantics() {
        let fs = MemoryFileSystem::new().with_file("/h/skills/poe/SKILL.md", "x");
        assert!(fs.remove_dir(Path::new("/h/skills"), false).await.is_err());
        fs.remove_dir(Path::new("/h/skills"), true).await.unwrap();
        assert!(!fs.exists("/h/skills/poe/SKILL.md"));
        assert!(fs.exists("/h"));
    }

    #[tokio::test]
    async fn test_list_dir_direct_children_only() {
        let fs = MemoryFileSystem::new()
            .with_file("/h/a.json", "{}")
            .with_file("/h/sub/b.json", "{}");
        assert_eq!(fs.list_dir(Path::new("/h")).await.unwrap(), ["a.json", "sub"]);
    }

    #[tokio::test]
    async fn test_mode_preserved_across_writes() {
        let fs = MemoryFileSystem::new().with_file("/h/key", "a");
        fs.set_mode(Path::new("/h/key"), 0o600).await.unwrap();
        fs.write_file(Path::new("/h/key"), "b").await.unwrap();
        assert_eq!(fs.metadata(Path::new("/h/key")).await.unwrap().mode, 0o600);
    }
}
