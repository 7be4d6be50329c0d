//! Error types for agent manifests

use poe_mutations::MutationError;
use thiserror::Error;

/// Result type for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors that can occur while building or running agent manifests
#[derive(Debug, Error)]
pub enum AgentError {
    /// Agent name or alias is not registered, or lacks the requested feature
    #[error("Unsupported agent '{name}'. Supported: {supported}")]
    UnsupportedAgent { name: String, supported: String },

    /// A required setting (such as the API key) was not provided
    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),

    /// A setting was provided but cannot be written safely
    #[error("Invalid {name}: {message}")]
    InvalidSetting { name: &'static str, message: String },

    /// Mutation engine error
    #[error(transparent)]
    Mutation(#[from] MutationError),
}

impl AgentError {
    /// Get the error code for CLI responses
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedAgent { .. } => "UNSUPPORTED_AGENT",
            Self::MissingSetting(_) => "MISSING_SETTING",
            Self::InvalidSetting { .. } => "INVALID_SETTING",
            Self::Mutation(e) => e.code(),
        }
    }

    pub(crate) fn unsupported(name: &str, supported: &[&str]) -> Self {
        Self::UnsupportedAgent {
            name: name.to_string(),
            supported: supported.join(", "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let err = AgentError::unsupported("cursor", &["claude-code", "codex"]);
        assert_eq!(err.code(), "UNSUPPORTED_AGENT");
        assert_eq!(
            err.to_string(),
            "Unsupported agent 'cursor'. Supported: claude-code, codex"
        );
        assert_eq!(AgentError::MissingSetting("api key").code(), "MISSING_SETTING");
    }
}
