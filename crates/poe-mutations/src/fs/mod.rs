//! Filesystem capability
//!
//! The engine never touches `std::fs` directly; every read and write goes
//! through an injected [`FileSystem`].

mod memory;
mod os;
mod staged;

use std::io;
use std::path::Path;

use async_trait::async_trait;

pub use memory::MemoryFileSystem;
pub use os::OsFileSystem;
pub use staged::StagedFileSystem;

/// Kind of filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
}

/// Metadata for a filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub kind: FileKind,
    /// Size in bytes (0 for directories)
    pub len: u64,
    /// Permission bits
    pub mode: u32,
}

impl FileStat {
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }
}

/// Async filesystem operations used by the engine
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Read a whole file as UTF-8
    async fn read_file(&self, path: &Path) -> io::Result<String>;

    /// Replace a file's content. The parent directory must exist.
    async fn write_file(&self, path: &Path, contents: &str) -> io::Result<()>;

    /// Create a directory and any missing ancestors
    async fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Remove a file
    async fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Remove a directory; without `recursive` it must be empty
    async fn remove_dir(&self, path: &Path, recursive: bool) -> io::Result<()>;

    /// Stat an entry
    async fn metadata(&self, path: &Path) -> io::Result<FileStat>;

    /// Set permission bits
    async fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()>;

    /// Names of a directory's direct children
    async fn list_dir(&self, path: &Path) -> io::Result<Vec<String>>;
}

/// Read a file, mapping not-found to `None`
pub(crate) async fn read_optional(fs: &dyn FileSystem, path: &Path) -> io::Result<Option<String>> {
    match fs.read_file(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Stat an entry, mapping not-found to `None`
pub(crate) async fn stat_optional(fs: &dyn FileSystem, path: &Path) -> io::Result<Option<FileStat>> {
    match fs.metadata(path).await {
        Ok(stat) => Ok(Some(stat)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

pub(crate) fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such file or directory: {}", path.display()),
    )
}

pub(crate) fn not_a_directory(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::Other,
        format!("not a directory: {}", path.display()),
    )
}

pub(crate) fn is_a_directory(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::Other,
        format!("is a directory: {}", path.display()),
    )
}

pub(crate) fn already_exists(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("file exists: {}", path.display()),
    )
}

pub(crate) fn directory_not_empty(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::Other,
        format!("directory not empty: {}", path.display()),
    )
}
