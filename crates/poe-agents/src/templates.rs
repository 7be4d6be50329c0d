//! Templates compiled into the binary

use async_trait::async_trait;
use poe_mutations::{MutationError, MutationResult, TemplateLoader};

pub const CLAUDE_SETTINGS: &str = "claude-settings";
pub const CODEX_PROVIDER: &str = "codex-provider";
pub const SKILL: &str = "skill";

const BUNDLED: [(&str, &str); 3] = [
    (
        CLAUDE_SETTINGS,
        include_str!("../templates/claude-settings.json.mustache"),
    ),
    (
        CODEX_PROVIDER,
        include_str!("../templates/codex-provider.toml.mustache"),
    ),
    (SKILL, include_str!("../templates/skill.md.mustache")),
];

/// Loader over the templates shipped with this crate
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledTemplates;

impl BundledTemplates {
    /// Template body by id, if bundled
    #[must_use]
    pub fn get(template_id: &str) -> Option<&'static str> {
        BUNDLED
            .iter()
            .find(|(id, _)| *id == template_id)
            .map(|(_, body)| *body)
    }
}

#[async_trait]
impl TemplateLoader for BundledTemplates {
    async fn load(&self, template_id: &str) -> MutationResult<String> {
        Self::get(template_id)
            .map(str::to_string)
            .ok_or_else(|| MutationError::TemplateNotFound(template_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_template_is_bundled() {
        for id in [CLAUDE_SETTINGS, CODEX_PROVIDER, SKILL] {
            assert!(BundledTemplates::get(id).is_some_and(|body| !body.is_empty()), "{id}");
        }
        assert!(BundledTemplates::get("missing").is_none());
    }
}
