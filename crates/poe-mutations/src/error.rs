//! Error types for mutation execution

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::format::FormatError;

/// Result type for mutation operations
pub type MutationResult<T> = Result<T, MutationError>;

/// Errors that can occur while resolving or executing mutations
#[derive(Debug, Error)]
pub enum MutationError {
    /// Target is empty, does not start with `~`, or escapes the home directory
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// No format handler for a path or format name
    #[error(
        "Unsupported config format for '{input}'. Supported extensions: {extensions}; supported formats: {formats}"
    )]
    UnsupportedFormat {
        input: String,
        extensions: String,
        formats: String,
    },

    /// Existing content is not valid for its format
    #[error("{format} parse error in {path}: {message}")]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },

    /// Content parsed but has the wrong shape
    #[error("Invalid {format} document in {path}: {message}")]
    InvalidFormat {
        path: PathBuf,
        format: &'static str,
        message: String,
    },

    /// A document could not be serialized
    #[error("Failed to serialize {format} for {path}: {message}")]
    Serialize {
        path: PathBuf,
        format: &'static str,
        message: String,
    },

    /// A template failed to render
    #[error("Template '{template}' failed to render: {message}")]
    Template { template: String, message: String },

    /// The template loader has no template with this id
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// A mutation needs a capability the context does not provide
    #[error("Mutation '{label}' requires a {capability}, but none was configured")]
    MissingCapability {
        label: String,
        capability: &'static str,
    },

    /// A descriptor carries a value of the wrong shape
    #[error("Invalid value for '{label}': {message}")]
    InvalidValue { label: String, message: String },

    /// Filesystem failure, with the mutation and path that hit it
    #[error("I/O error in '{label}' for {path}: {source}")]
    Io {
        label: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MutationError {
    /// Get the error code for CLI responses
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPath { .. } => "INVALID_PATH",
            Self::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            Self::Parse { .. } => "PARSE_ERROR",
            Self::InvalidFormat { .. } => "INVALID_FORMAT",
            Self::Serialize { .. } => "SERIALIZE_ERROR",
            Self::Template { .. } | Self::TemplateNotFound(_) => "TEMPLATE_ERROR",
            Self::MissingCapability { .. } => "MISSING_CAPABILITY",
            Self::InvalidValue { .. } => "INVALID_VALUE",
            Self::Io { .. } => "IO_ERROR",
        }
    }

    pub(crate) fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(label: &str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            label: label.to_string(),
            path: path.to_path_buf(),
            source,
        }
    }

    /// Attach the file a format error came from
    pub(crate) fn from_format(path: &Path, err: FormatError) -> Self {
        let path = path.to_path_buf();
        match err {
            FormatError::Parse { format, message } => Self::Parse {
                path,
                format,
                message,
            },
            FormatError::InvalidFormat { format, message } => Self::InvalidFormat {
                path,
                format,
                message,
            },
            FormatError::Serialize { format, message } => Self::Serialize {
                path,
                format,
                message,
            },
        }
    }

    /// Whether this error is a filesystem not-found
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}
