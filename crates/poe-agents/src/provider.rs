//! Route an agent's model traffic through Poe

use poe_mutations::config::{self, TransformOutcome};
use poe_mutations::{file, template_mutation, Manifest, TemplateValue, TemplateVars};
use serde_json::{json, Value};

use crate::agent::{AgentDefinition, AgentKind};
use crate::error::{AgentError, AgentResult};
use crate::templates::{CLAUDE_SETTINGS, CODEX_PROVIDER};

/// Default OpenAI-compatible endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.poe.com/v1";

/// Provider id written into agent configs
pub const PROVIDER_ID: &str = "poe";

/// Credentials and endpoint for provider routing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub api_key: String,
    pub base_url: String,
    /// Default model, for agents that take one
    pub model: Option<String>,
}

impl ProviderSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: None,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Reject values that would break the rendered config files
    ///
    /// # Errors
    /// `MissingSetting` for an empty key, `InvalidSetting` for unsafe characters
    pub fn validate(&self) -> AgentResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(AgentError::MissingSetting("api key"));
        }
        check_plain("api key", &self.api_key)?;
        check_plain("base url", &self.base_url)?;
        if let Some(model) = &self.model {
            check_plain("model", model)?;
        }
        Ok(())
    }

    fn template_vars(&self) -> TemplateVars {
        let mut vars = TemplateVars::from([
            ("apiKey".to_string(), TemplateValue::from(self.api_key.as_str())),
            ("baseUrl".to_string(), TemplateValue::from(self.base_url.as_str())),
        ]);
        if let Some(model) = &self.model {
            vars.insert("model".to_string(), TemplateValue::from(model.as_str()));
        }
        vars
    }
}

/// Values are interpolated into JSON/TOML strings and shell snippets
fn check_plain(name: &'static str, value: &str) -> AgentResult<()> {
    match value
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || matches!(c, '"' | '\\' | '\'' | '$' | '`'))
    {
        Some(c) => Err(AgentError::InvalidSetting {
            name,
            message: format!("character {c:?} is not allowed"),
        }),
        None => Ok(()),
    }
}

/// Mutations that point `agent` at Poe
///
/// # Errors
/// Returns an error when the settings are invalid
pub fn configure(agent: &AgentDefinition, settings: &ProviderSettings) -> AgentResult<Manifest> {
    settings.validate()?;
    let vars = settings.template_vars();

    let manifest = match agent.kind {
        AgentKind::ClaudeCode => Manifest::new()
            .push(file::ensure_directory("~/.claude"))
            .push(
                template_mutation::merge_json("~/.claude/settings.json", CLAUDE_SETTINGS)
                    .context(vars)
                    .label("Route Claude Code through Poe"),
            ),
        AgentKind::Codex => Manifest::new()
            .push(file::ensure_directory("~/.codex"))
            .push(
                template_mutation::merge_toml("~/.codex/config.toml", CODEX_PROVIDER)
                    .context(vars)
                    .replace_entry("model_providers", PROVIDER_ID)
                    .label("Register Poe model provider"),
            ),
        AgentKind::OpenCode => Manifest::new()
            .push(file::ensure_directory("~/.config/opencode"))
            .push(
                config::merge(
                    "~/.config/opencode/opencode.json",
                    json!({
                        "$schema": "https://opencode.ai/config.json",
                        "provider": {
                            PROVIDER_ID: {
                                "npm": "@ai-sdk/openai-compatible",
                                "name": "Poe",
                                "options": {
                                    "baseURL": settings.base_url,
                                    "apiKey": settings.api_key,
                                }
                            }
                        }
                    }),
                )
                .label("Register Poe provider"),
            ),
    };
    Ok(manifest)
}

/// Mutations that undo [`configure`]
#[must_use]
pub fn unconfigure(agent: &AgentDefinition) -> Manifest {
    match agent.kind {
        AgentKind::ClaudeCode => Manifest::new().push(
            config::prune(
                "~/.claude/settings.json",
                json!({"apiKeyHelper": {}, "env": {"ANTHROPIC_BASE_URL": {}}}),
            )
            .only_if(|document, _| claude_routes_through_poe(document))
            .label("Remove Poe routing from Claude Code"),
        ),
        AgentKind::Codex => Manifest::new().push(
            config::transform("~/.codex/config.toml", |document, _| {
                remove_codex_provider(document)
            })
            .label("Remove Poe model provider"),
        ),
        AgentKind::OpenCode => Manifest::new().push(
            config::prune(
                "~/.config/opencode/opencode.json",
                json!({"provider": {PROVIDER_ID: {}}}),
            )
            .label("Remove Poe provider"),
        ),
    }
}

/// Whether Claude Code's base URL points at a Poe host
fn claude_routes_through_poe(document: &poe_mutations::ConfigObject) -> bool {
    document
        .get("env")
        .and_then(|env| env.get("ANTHROPIC_BASE_URL"))
        .and_then(Value::as_str)
        .is_some_and(is_poe_url)
}

fn is_poe_url(url: &str) -> bool {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let host = rest.split(['/', ':', '?']).next().unwrap_or_default();
    let host = host.to_ascii_lowercase();
    host == "poe.com" || host.ends_with(".poe.com")
}

/// Drop the Poe provider table, and `model_provider` only while it selects Poe
fn remove_codex_provider(document: &poe_mutations::ConfigObject) -> TransformOutcome {
    let mut next = document.clone();
    let mut changed = false;

    if next.get("model_provider").and_then(Value::as_str) == Some(PROVIDER_ID) {
        next.shift_remove("model_provider");
        changed = true;
    }

    if let Some(Value::Object(providers)) = next.get_mut("model_providers") {
        changed |= providers.shift_remove(PROVIDER_ID).is_some();
        if providers.is_empty() {
            next.shift_remove("model_providers");
        }
    }

    TransformOutcome::new(Some(next), changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{CLAUDE_CODE, CODEX};

    #[test]
    fn test_validate_settings() {
        assert!(ProviderSettings::new("pk_123").validate().is_ok());
        assert_eq!(
            ProviderSettings::new("  ").validate().unwrap_err().code(),
            "MISSING_SETTING"
        );
        assert_eq!(
            ProviderSettings::new("pk\"; rm -rf ~").validate().unwrap_err().code(),
            "INVALID_SETTING"
        );
    }

    #[test]
    fn test_manifest_shapes() {
        let settings = ProviderSettings::new("pk_123");
        assert_eq!(configure(&CLAUDE_CODE, &settings).unwrap().len(), 2);
        assert_eq!(configure(&CODEX, &settings).unwrap().len(), 2);
        assert_eq!(unconfigure(&CODEX).len(), 1);
    }

    #[test]
    fn test_is_poe_url() {
        assert!(is_poe_url(DEFAULT_BASE_URL));
        assert!(is_poe_url("https://POE.com"));
        assert!(is_poe_url("http://api.poe.com:8443/v1"));
        assert!(!is_poe_url("https://api.anthropic.com"));
        assert!(!is_poe_url("https://poe.com.evil.example/v1"));
        assert!(!is_poe_url("https://notpoe.com/v1"));
    }

    #[test]
    fn test_remove_codex_provider_respects_other_providers() {
        let document = json!({
            "model_provider": "openai",
            "model_providers": {"poe": {"name": "Poe"}}
        });
        let outcome = remove_codex_provider(document.as_object().unwrap());
        assert!(outcome.changed);
        assert_eq!(
            Value::Object(outcome.content.unwrap()),
            json!({"model_provider": "openai"})
        );

        let untouched = json!({"model": "gpt-5"});
        let outcome = remove_codex_provider(untouched.as_object().unwrap());
        assert!(!outcome.changed);
    }
}
