//! Home-relative path resolution
//!
//! Every mutation target is written as `~/...` and resolved against the
//! injected home directory, optionally rerouted through a [`PathMapper`].

use std::path::{Component, Path, PathBuf};

use crate::error::{MutationError, MutationResult};

/// Reroutes target directories, e.g. into an isolated configuration root
pub trait PathMapper: Send + Sync {
    /// Map the directory portion of a resolved target
    fn map_target_directory(&self, target_directory: &Path) -> PathBuf;
}

/// Maps directories under `home` to the same relative location under `root`
#[derive(Debug, Clone)]
pub struct IsolatedRoot {
    home: PathBuf,
    root: PathBuf,
}

impl IsolatedRoot {
    #[must_use]
    pub fn new(home: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            root: root.into(),
        }
    }
}

impl PathMapper for IsolatedRoot {
    fn map_target_directory(&self, target_directory: &Path) -> PathBuf {
        match target_directory.strip_prefix(&self.home) {
            Ok(relative) if relative.as_os_str().is_empty() => self.root.clone(),
            Ok(relative) => self.root.join(relative),
            Err(_) => target_directory.to_path_buf(),
        }
    }
}

/// Require a non-empty path starting with `~`
///
/// # Errors
/// Returns `InvalidPath` otherwise
pub fn validate_home_path(path: &str) -> MutationResult<()> {
    if path.is_empty() {
        return Err(MutationError::invalid_path(path, "path is empty"));
    }
    if !path.starts_with('~') {
        return Err(MutationError::invalid_path(
            path,
            "mutation targets must start with '~'",
        ));
    }
    Ok(())
}

/// Expand a `~`-prefixed path against `home_dir`
///
/// `~./x` is read as `~/.x`; `~.x`, `~/.x` and `~\.x` all name the hidden
/// entry `.x` under home. A bare `~` is the home directory itself.
///
/// # Errors
/// Returns `InvalidPath` for paths that fail validation or climb out of home
pub fn expand_home(path: &str, home_dir: &Path) -> MutationResult<PathBuf> {
    validate_home_path(path)?;

    let normalized;
    let path = if let Some(rest) = path.strip_prefix("~./") {
        normalized = format!("~/.{rest}");
        normalized.as_str()
    } else {
        path
    };

    let remainder = &path[1..];
    let remainder = remainder
        .strip_prefix('/')
        .or_else(|| remainder.strip_prefix('\\'))
        .unwrap_or(remainder);

    if remainder.is_empty() {
        return Ok(home_dir.to_path_buf());
    }

    let relative = normalize_relative(path, remainder)?;
    if relative.as_os_str().is_empty() {
        return Ok(home_dir.to_path_buf());
    }
    Ok(home_dir.join(relative))
}

/// Validate, expand, and map a raw mutation target
///
/// With a mapper, the parent directory is mapped and the file name
/// re-appended, so manifests stay unaware of isolation.
///
/// # Errors
/// Returns `InvalidPath` for invalid targets
pub fn resolve_path(
    raw: &str,
    home_dir: &Path,
    mapper: Option<&dyn PathMapper>,
) -> MutationResult<PathBuf> {
    let expanded = expand_home(raw, home_dir)?;
    let Some(mapper) = mapper else {
        return Ok(expanded);
    };

    match (expanded.parent(), expanded.file_name()) {
        (Some(parent), Some(name)) => Ok(mapper.map_target_directory(parent).join(name)),
        _ => Ok(mapper.map_target_directory(&expanded)),
    }
}

fn normalize_relative(original: &str, remainder: &str) -> MutationResult<PathBuf> {
    let mut normalized = PathBuf::new();
    let mut depth: usize = 0;

    for component in Path::new(remainder).components() {
        match component {
            Component::Normal(part) => {
                if part.to_string_lossy().contains('\0') {
                    return Err(MutationError::invalid_path(original, "null byte in path"));
                }
                normalized.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return Err(MutationError::invalid_path(
                        original,
                        "path escapes the home directory",
                    ));
                }
                normalized.pop();
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(MutationError::invalid_path(
                    original,
                    "absolute path after '~'",
                ));
            }
        }
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn home() -> PathBuf {
        PathBuf::from("/home/user")
    }

    #[test]
    fn test_validate_rejects_non_home() {
        assert!(validate_home_path("").is_err());
        assert!(validate_home_path("/etc/passwd").is_err());
        assert!(validate_home_path("relative/file.json").is_err());
        assert!(validate_home_path("~/.claude.json").is_ok());
    }

    #[test]
    fn test_expand_forms() {
        let home = home();
        assert_eq!(expand_home("~", &home).unwrap(), home);
        assert_eq!(expand_home("~/", &home).unwrap(), home);
        assert_eq!(
            expand_home("~/.claude.json", &home).unwrap(),
            home.join(".claude.json")
        );
        assert_eq!(
            expand_home("~./claude", &home).unwrap(),
            home.join(".claude")
        );
        assert_eq!(
            expand_home("~.codex/config.toml", &home).unwrap(),
            home.join(".codex/config.toml")
        );
        assert_eq!(
            expand_home("~/a/./b/../c", &home).unwrap(),
            home.join("a/c")
        );
    }

    #[test]
    fn test_expand_rejects_escape() {
        assert!(expand_home("~/../etc/passwd", &home()).is_err());
        assert!(expand_home("~/a/../../x", &home()).is_err());
    }

    #[test]
    fn test_resolve_without_mapper() {
        let path = resolve_path("~/.codex/config.toml", &home(), None).unwrap();
        assert!(path.is_absolute());
        assert_eq!(path, home().join(".codex/config.toml"));
    }

    #[test]
    fn test_resolve_with_isolated_root() {
        let mapper = IsolatedRoot::new(home(), "/tmp/isolated");
        let path = resolve_path("~/.codex/config.toml", &home(), Some(&mapper)).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/isolated/.codex/config.toml"));

        let top = resolve_path("~/.claude.json", &home(), Some(&mapper)).unwrap();
        assert_eq!(top, PathBuf::from("/tmp/isolated/.claude.json"));
    }

    #[test]
    fn test_resolve_rejects_invalid_with_mapper() {
        let mapper = IsolatedRoot::new(home(), "/tmp/isolated");
        assert!(resolve_path("/etc/hosts", &home(), Some(&mapper)).is_err());
    }
}
