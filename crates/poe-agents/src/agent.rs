//! Agent definition registry

use serde::Serialize;

use crate::error::{AgentError, AgentResult};

/// Supported agent products
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentKind {
    ClaudeCode,
    Codex,
    OpenCode,
}

/// Static description of one agent CLI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentDefinition {
    pub kind: AgentKind,
    /// Canonical id used on the command line
    pub id: &'static str,
    /// Display name
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    /// Executable name
    pub binary: &'static str,
    /// Home-relative configuration directory
    pub config_dir: &'static str,
}

pub const CLAUDE_CODE: AgentDefinition = AgentDefinition {
    kind: AgentKind::ClaudeCode,
    id: "claude-code",
    name: "Claude Code",
    aliases: &["claude", "claude_code"],
    binary: "claude",
    config_dir: "~/.claude",
};

pub const CODEX: AgentDefinition = AgentDefinition {
    kind: AgentKind::Codex,
    id: "codex",
    name: "Codex",
    aliases: &[],
    binary: "codex",
    config_dir: "~/.codex",
};

pub const OPENCODE: AgentDefinition = AgentDefinition {
    kind: AgentKind::OpenCode,
    id: "opencode",
    name: "OpenCode",
    aliases: &["open-code"],
    binary: "opencode",
    config_dir: "~/.config/opencode",
};

/// Every registered agent, in display order
pub static AGENTS: [AgentDefinition; 3] = [CLAUDE_CODE, CODEX, OPENCODE];

impl AgentDefinition {
    /// Whether `name` is this agent's id or one of its aliases
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        let name = name.trim();
        self.id.eq_ignore_ascii_case(name)
            || self
                .aliases
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(name))
    }
}

/// Canonical ids of all registered agents
#[must_use]
pub fn supported_ids() -> Vec<&'static str> {
    AGENTS.iter().map(|agent| agent.id).collect()
}

/// Look up an agent by id or alias, ignoring case
///
/// # Errors
/// Returns `UnsupportedAgent` listing the registered ids
pub fn resolve_agent(name: &str) -> AgentResult<&'static AgentDefinition> {
    AGENTS
        .iter()
        .find(|agent| agent.matches(name))
        .ok_or_else(|| AgentError::unsupported(name, &supported_ids()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_by_id_and_alias() {
        assert_eq!(resolve_agent("codex").unwrap().kind, AgentKind::Codex);
        assert_eq!(resolve_agent("Claude").unwrap().id, "claude-code");
        assert_eq!(resolve_agent("claude_code").unwrap().id, "claude-code");
        assert_eq!(resolve_agent(" OpenCode ").unwrap().kind, AgentKind::OpenCode);
    }

    #[test]
    fn test_unknown_agent_lists_supported() {
        let err = resolve_agent("cursor").unwrap_err();
        assert_eq!(err.code(), "UNSUPPORTED_AGENT");
        assert!(err.to_string().contains("claude-code, codex, opencode"));
    }
}
