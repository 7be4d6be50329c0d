//! File lifecycle mutations

use regex::Regex;

use super::{Dynamic, Mutation};

/// Create a directory (and ancestors) if missing
#[derive(Debug, Clone)]
pub struct EnsureDirectory {
    pub path: Dynamic<String>,
    pub label: Option<String>,
}

/// Remove a file, optionally only when it is empty or matches a pattern
#[derive(Debug, Clone)]
pub struct RemoveFile {
    pub target: Dynamic<String>,
    pub when_empty: bool,
    pub when_content_matches: Option<Regex>,
    pub label: Option<String>,
}

/// Remove a directory; only when empty unless `force`
#[derive(Debug, Clone)]
pub struct RemoveDirectory {
    pub path: Dynamic<String>,
    pub force: bool,
    pub label: Option<String>,
}

/// Set permission bits on an existing file
#[derive(Debug, Clone)]
pub struct Chmod {
    pub target: Dynamic<String>,
    pub mode: u32,
    pub label: Option<String>,
}

/// Copy a file to its `.bak` sibling
#[derive(Debug, Clone)]
pub struct Backup {
    pub target: Dynamic<String>,
    pub label: Option<String>,
}

/// Suffix appended to the file name by [`backup`]
pub const BACKUP_SUFFIX: &str = ".bak";

pub fn ensure_directory(path: impl Into<Dynamic<String>>) -> EnsureDirectory {
    EnsureDirectory {
        path: path.into(),
        label: None,
    }
}

pub fn remove_file(target: impl Into<Dynamic<String>>) -> RemoveFile {
    RemoveFile {
        target: target.into(),
        when_empty: false,
        when_content_matches: None,
        label: None,
    }
}

pub fn remove_directory(path: impl Into<Dynamic<String>>) -> RemoveDirectory {
    RemoveDirectory {
        path: path.into(),
        force: false,
        label: None,
    }
}

pub fn chmod(target: impl Into<Dynamic<String>>, mode: u32) -> Chmod {
    Chmod {
        target: target.into(),
        mode,
        label: None,
    }
}

pub fn backup(target: impl Into<Dynamic<String>>) -> Backup {
    Backup {
        target: target.into(),
        label: None,
    }
}

impl EnsureDirectory {
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl RemoveFile {
    /// Only remove when the content is empty or whitespace
    #[must_use]
    pub fn when_empty(mut self) -> Self {
        self.when_empty = true;
        self
    }

    /// Only remove when the content matches `pattern`
    #[must_use]
    pub fn when_content_matches(mut self, pattern: Regex) -> Self {
        self.when_content_matches = Some(pattern);
        self
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl RemoveDirectory {
    /// Remove recursively, contents included
    #[must_use]
    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl Chmod {
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl Backup {
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl From<EnsureDirectory> for Mutation {
    fn from(m: EnsureDirectory) -> Self {
        Self::EnsureDirectory(m)
    }
}

impl From<RemoveFile> for Mutation {
    fn from(m: RemoveFile) -> Self {
        Self::RemoveFile(m)
    }
}

impl From<RemoveDirectory> for Mutation {
    fn from(m: RemoveDirectory) -> Self {
        Self::RemoveDirectory(m)
    }
}

impl From<Chmod> for Mutation {
    fn from(m: Chmod) -> Self {
        Self::Chmod(m)
    }
}

impl From<Backup> for Mutation {
    fn from(m: Backup) -> Self {
        Self::Backup(m)
    }
}
