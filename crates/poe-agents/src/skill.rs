//! Skill installation

use poe_mutations::{file, template_mutation, Manifest, TemplateValue, TemplateVars};

use crate::agent::{AgentDefinition, AgentKind, AGENTS};
use crate::error::{AgentError, AgentResult};
use crate::templates::SKILL;

/// Name of the installed skill directory
pub const SKILL_NAME: &str = "poe";

/// CLI name referenced by the skill text
const BINARY: &str = "poe-code";

/// Home-relative directory holding the skill for `agent`, if it has skills
#[must_use]
pub fn skill_dir(agent: &AgentDefinition) -> Option<String> {
    match agent.kind {
        AgentKind::ClaudeCode | AgentKind::Codex => {
            Some(format!("{}/skills/{SKILL_NAME}", agent.config_dir))
        }
        AgentKind::OpenCode => None,
    }
}

fn require_skill_dir(agent: &AgentDefinition) -> AgentResult<String> {
    skill_dir(agent).ok_or_else(|| {
        let supported: Vec<&str> = AGENTS
            .iter()
            .filter(|candidate| skill_dir(candidate).is_some())
            .map(|candidate| candidate.id)
            .collect();
        AgentError::unsupported(agent.id, &supported)
    })
}

/// Mutations that install the skill
///
/// # Errors
/// `UnsupportedAgent` for agents without skill support
pub fn install(agent: &AgentDefinition) -> AgentResult<Manifest> {
    let dir = require_skill_dir(agent)?;
    let vars = TemplateVars::from([
        ("agentName".to_string(), TemplateValue::from(agent.name)),
        ("agentId".to_string(), TemplateValue::from(agent.id)),
        ("binary".to_string(), TemplateValue::from(BINARY)),
    ]);

    Ok(Manifest::new()
        .push(file::ensure_directory(dir.as_str()))
        .push(
            template_mutation::write(format!("{dir}/SKILL.md"), SKILL)
                .context(vars)
                .label(format!("Install {SKILL_NAME} skill for {}", agent.name)),
        ))
}

/// Mutations that remove the skill; a directory holding other files is kept
///
/// # Errors
/// `UnsupportedAgent` for agents without skill support
pub fn uninstall(agent: &AgentDefinition) -> AgentResult<Manifest> {
    let dir = require_skill_dir(agent)?;
    Ok(Manifest::new()
        .push(file::remove_file(format!("{dir}/SKILL.md")))
        .push(file::remove_directory(dir)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{CLAUDE_CODE, CODEX, OPENCODE};

    #[test]
    fn test_skill_dirs() {
        assert_eq!(skill_dir(&CLAUDE_CODE).as_deref(), Some("~/.claude/skills/poe"));
        assert_eq!(skill_dir(&CODEX).as_deref(), Some("~/.codex/skills/poe"));
        assert!(skill_dir(&OPENCODE).is_none());
    }

    #[test]
    fn test_opencode_is_unsupported() {
        let err = install(&OPENCODE).unwrap_err();
        assert_eq!(err.code(), "UNSUPPORTED_AGENT");
        assert!(err.to_string().contains("claude-code, codex"));
        assert!(uninstall(&OPENCODE).is_err());
    }
}
