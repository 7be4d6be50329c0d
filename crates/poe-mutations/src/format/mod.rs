//! Format handlers and the format registry
//!
//! Each handler parses, serializes, merges and prunes one serialization
//! format. The merge/prune semantics are shared (see [`document`]) so JSON
//! and TOML documents behave identically; only the text codec differs.

pub mod document;
mod json_format;
mod toml_format;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{MutationError, MutationResult};

pub use document::{
    deep_merge, prune, prune_by_prefix, remove_entries, ConfigObject, ConfigValue, Pruned,
};
pub use json_format::JsonFormat;
pub use toml_format::TomlFormat;

/// Errors raised by a format handler (path-free; the engine attaches paths)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("{format} parse error: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },

    #[error("invalid {format} document: {message}")]
    InvalidFormat {
        format: &'static str,
        message: String,
    },

    #[error("{format} serialize error: {message}")]
    Serialize {
        format: &'static str,
        message: String,
    },
}

/// Result type for format handlers
pub type FormatResult<T> = Result<T, FormatError>;

/// One serialization format
pub trait ConfigFormat: Send + Sync {
    /// Registered format name
    fn name(&self) -> &'static str;

    /// File extensions (without the dot) handled by this format
    fn extensions(&self) -> &'static [&'static str];

    /// Parse a document. Empty or whitespace-only input is an empty object.
    ///
    /// # Errors
    /// `Parse` on malformed syntax, `InvalidFormat` when the root is not a mapping
    fn parse(&self, content: &str) -> FormatResult<ConfigObject>;

    /// Serialize a document deterministically, ending in exactly one newline
    ///
    /// # Errors
    /// `Serialize` if the document cannot be represented in this format
    fn serialize(&self, obj: &ConfigObject) -> FormatResult<String>;

    /// Right-biased recursive merge; arrays are replaced wholesale
    fn merge(&self, base: &ConfigObject, patch: &ConfigObject) -> ConfigObject {
        deep_merge(base, patch)
    }

    /// Remove the keys marked by `shape`
    fn prune(&self, obj: &ConfigObject, shape: &ConfigObject) -> Pruned {
        prune(obj, shape)
    }
}

/// Format named in a mutation descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    Json,
    Toml,
}

impl FormatKind {
    /// The handler for this format
    #[must_use]
    pub fn handler(self) -> &'static dyn ConfigFormat {
        match self {
            Self::Json => &JSON,
            Self::Toml => &TOML,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Toml => "toml",
        }
    }
}

impl std::fmt::Display for FormatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

static JSON: JsonFormat = JsonFormat;
static TOML: TomlFormat = TomlFormat;

const ALL_FORMATS: [FormatKind; 2] = [FormatKind::Json, FormatKind::Toml];

/// Look up a format by its registered name ("json", "toml")
#[must_use]
pub fn format_by_name(name: &str) -> Option<FormatKind> {
    ALL_FORMATS.into_iter().find(|kind| kind.as_str() == name)
}

/// Look up a format from the lowercased extension of a path's file name
#[must_use]
pub fn format_by_extension(path: &str) -> Option<FormatKind> {
    let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let (_, extension) = file_name.rsplit_once('.')?;
    let extension = extension.to_ascii_lowercase();
    ALL_FORMATS
        .into_iter()
        .find(|kind| kind.handler().extensions().contains(&extension.as_str()))
}

/// Non-failing detection: format name first, then file extension
#[must_use]
pub fn detect_format(path_or_name: &str) -> Option<FormatKind> {
    format_by_name(path_or_name).or_else(|| format_by_extension(path_or_name))
}

/// Resolve a format handler from a format name or a file path
///
/// # Errors
/// Returns `UnsupportedFormat` listing the supported extensions and names
pub fn get_config_format(path_or_name: &str) -> MutationResult<&'static dyn ConfigFormat> {
    resolve_format(path_or_name).map(FormatKind::handler)
}

/// Like [`get_config_format`], returning the format's kind
///
/// # Errors
/// Returns `UnsupportedFormat` listing the supported extensions and names
pub fn resolve_format(path_or_name: &str) -> MutationResult<FormatKind> {
    detect_format(path_or_name).ok_or_else(|| unsupported(path_or_name))
}

fn unsupported(input: &str) -> MutationError {
    let extensions = ALL_FORMATS
        .iter()
        .flat_map(|kind| kind.handler().extensions().iter())
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(", ");
    let formats = ALL_FORMATS
        .iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    MutationError::UnsupportedFormat {
        input: input.to_string(),
        extensions,
        formats,
    }
}

/// Trim trailing newlines and append exactly one
pub(crate) fn with_trailing_newline(mut text: String) -> String {
    let trimmed = text.trim_end_matches(['\n', '\r']).len();
    text.truncate(trimmed);
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(format_by_name("json"), Some(FormatKind::Json));
        assert_eq!(format_by_name("toml"), Some(FormatKind::Toml));
        assert_eq!(format_by_name("yaml"), None);
    }

    #[test]
    fn test_lookup_by_extension() {
        assert_eq!(format_by_extension("~/.claude.json"), Some(FormatKind::Json));
        assert_eq!(format_by_extension("~/.codex/CONFIG.TOML"), Some(FormatKind::Toml));
        assert_eq!(format_by_extension("~/.config/opencode"), None);
        assert_eq!(format_by_extension("~/.bashrc"), None);
    }

    #[test]
    fn test_get_config_format_unsupported() {
        let Err(err) = get_config_format("~/.bashrc") else {
            panic!("expected an error");
        };
        assert_eq!(err.code(), "UNSUPPORTED_FORMAT");
        let message = err.to_string();
        assert!(message.contains(".json"));
        assert!(message.contains(".toml"));
        assert!(message.contains("json, toml"));
    }

    #[test]
    fn test_get_config_format_by_name() {
        assert_eq!(get_config_format("toml").unwrap().name(), "toml");
        assert_eq!(get_config_format("~/a/b.json").unwrap().name(), "json");
    }

    #[test]
    fn test_trailing_newline() {
        assert_eq!(with_trailing_newline("a\n\n".into()), "a\n");
        assert_eq!(with_trailing_newline("a".into()), "a\n");
        assert_eq!(with_trailing_newline(String::new()), "\n");
    }
}
