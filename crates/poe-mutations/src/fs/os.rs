//! Real filesystem backed by `tokio::fs`

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::{FileKind, FileStat, FileSystem};

/// The operating system's filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl OsFileSystem {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSystem for OsFileSystem {
    async fn read_file(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path).await
    }

    async fn write_file(&self, path: &Path, contents: &str) -> io::Result<()> {
        // Write a sibling temp file, then rename over the target
        let temp = temp_sibling(path);
        let result = match fs::write(&temp, contents).await {
            Ok(()) => replace_with(&temp, path).await,
            Err(e) => Err(e),
        };
        if result.is_err() {
            discard_temp(&temp).await;
        }
        result
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path).await
    }

    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path).await
    }

    async fn remove_dir(&self, path: &Path, recursive: bool) -> io::Result<()> {
        if recursive {
            fs::remove_dir_all(path).await
        } else {
            fs::remove_dir(path).await
        }
    }

    async fn metadata(&self, path: &Path) -> io::Result<FileStat> {
        let meta = fs::metadata(path).await?;
        let kind = if meta.is_dir() {
            FileKind::Directory
        } else {
            FileKind::File
        };
        Ok(FileStat {
            kind,
            len: if meta.is_dir() { 0 } else { meta.len() },
            mode: mode_of(&meta),
        })
    }

    async fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
        let meta = fs::metadata(path).await?;
        let permissions = permissions_for(meta.permissions(), mode);
        fs::set_permissions(path, permissions).await
    }

    async fn list_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut entries = fs::read_dir(path).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}

/// Move `temp` over `target`, carrying over the target's permissions
/// (e.g. 0600 on files holding keys)
async fn replace_with(temp: &Path, target: &Path) -> io::Result<()> {
    match fs::metadata(target).await {
        Ok(existing) => fs::set_permissions(temp, existing.permissions()).await?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    fs::rename(temp, target).await
}

async fn discard_temp(temp: &Path) {
    match fs::remove_file(temp).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %temp.display(), error = %e, "Failed to remove temp file");
        }
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp-{}", std::process::id()))
}

#[cfg(unix)]
fn mode_of(meta: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_of(meta: &std::fs::Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

#[cfg(unix)]
fn permissions_for(_current: std::fs::Permissions, mode: u32) -> std::fs::Permissions {
    use std::os::unix::fs::PermissionsExt;
    std::fs::Permissions::from_mode(mode)
}

#[cfg(not(unix))]
fn permissions_for(mut current: std::fs::Permissions, mode: u32) -> std::fs::Permissions {
    current.set_readonly(mode & 0o200 == 0);
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let fs = OsFileSystem::new();

        fs.write_file(&path, "{}\n").await.unwrap();
        assert_eq!(fs.read_file(&path).await.unwrap(), "{}\n");

        fs.write_file(&path, "{\"a\": 1}\n").await.unwrap();
        assert_eq!(fs.read_file(&path).await.unwrap(), "{\"a\": 1}\n");

        // No temp files left behind
        assert_eq!(fs.list_dir(dir.path()).await.unwrap(), ["settings.json"]);
    }

    #[tokio::test]
    async fn test_failed_write_cleans_up_temp_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("config.toml");
        let fs = OsFileSystem::new();
        fs.create_dir_all(&target).await.unwrap();

        assert!(fs.write_file(&target, "a = 1\n").await.is_err());
        assert!(fs.metadata(&target).await.unwrap().is_dir());
        assert_eq!(fs.list_dir(dir.path()).await.unwrap(), ["config.toml"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_write_keeps_restrictive_mode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("auth.json");
        let fs = OsFileSystem::new();
        fs.write_file(&path, "{}\n").await.unwrap();
        fs.set_mode(&path, 0o600).await.unwrap();

        fs.write_file(&path, "{\"token\": \"x\"}\n").await.unwrap();
        assert_eq!(fs.metadata(&path).await.unwrap().mode, 0o600);
        assert_eq!(fs.read_file(&path).await.unwrap(), "{\"token\": \"x\"}\n");
    }

    #[tokio::test]
    async fn test_directories() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b/c");
        let fs = OsFileSystem::new();

        fs.create_dir_all(&nested).await.unwrap();
        assert!(fs.metadata(&nested).await.unwrap().is_dir());

        assert!(fs.remove_dir(&dir.path().join("a"), false).await.is_err());
        fs.remove_dir(&dir.path().join("a"), true).await.unwrap();
        assert!(fs.metadata(&nested).await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_set_mode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("key");
        let fs = OsFileSystem::new();
        fs.write_file(&path, "secret").await.unwrap();
        fs.set_mode(&path, 0o600).await.unwrap();
        assert_eq!(fs.metadata(&path).await.unwrap().mode, 0o600);
    }
}
