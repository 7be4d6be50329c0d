//! MCP server registration

use std::collections::BTreeMap;

use poe_mutations::config::{self, TransformOutcome};
use poe_mutations::{file, ConfigObject, Manifest};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::agent::{AgentDefinition, AgentKind};
use crate::error::{AgentError, AgentResult};

/// Default server name
pub const DEFAULT_SERVER_NAME: &str = "poe";

/// A stdio MCP server to register with an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Key of the entry in the agent's config
    pub name: String,

    /// Command to execute
    pub command: String,

    /// Command arguments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Environment variables
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl Default for McpServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_NAME, "npx").with_args(["-y", "poe-code", "mcp"])
    }
}

impl McpServerConfig {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Add an environment variable
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// `InvalidSetting` when the name is not a plain identifier or the
    /// command is empty
    pub fn validate(&self) -> AgentResult<()> {
        if self.name.is_empty()
            || !self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(AgentError::InvalidSetting {
                name: "server name",
                message: format!(
                    "'{}' must be non-empty and use only letters, digits, '-' or '_'",
                    self.name
                ),
            });
        }
        if self.command.trim().is_empty() {
            return Err(AgentError::InvalidSetting {
                name: "command",
                message: "command is empty".to_string(),
            });
        }
        Ok(())
    }

    /// Get a display string for this config
    #[must_use]
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, self.args.join(" "))
        }
    }

    /// Entry shape used by Claude Code and Codex
    fn command_entry(&self) -> Value {
        let mut entry = json!({
            "command": self.command,
            "args": self.args,
        });
        if !self.env.is_empty() {
            entry["env"] = json!(self.env);
        }
        entry
    }

    /// Entry shape used by OpenCode: the command line is one array
    fn local_entry(&self) -> Value {
        let mut command = vec![self.command.clone()];
        command.extend(self.args.iter().cloned());
        let mut entry = json!({
            "type": "local",
            "command": command,
            "enabled": true,
        });
        if !self.env.is_empty() {
            entry["environment"] = json!(self.env);
        }
        entry
    }
}

/// Mutations that register `server` with `agent`
///
/// # Errors
/// Returns an error when the server config is invalid
pub fn configure(agent: &AgentDefinition, server: &McpServerConfig) -> AgentResult<Manifest> {
    server.validate()?;
    let label = format!("Register MCP server '{}'", server.name);

    let manifest = match agent.kind {
        AgentKind::ClaudeCode => Manifest::new().push(
            replace_entry(
                "~/.claude.json",
                "mcpServers",
                &server.name,
                server.command_entry(),
            )
            .label(label),
        ),
        AgentKind::Codex => Manifest::new()
            .push(file::ensure_directory("~/.codex"))
            .push(
                config::merge(
                    "~/.codex/config.toml",
                    json!({"mcp_servers": {server.name.as_str(): server.command_entry()}}),
                )
                .replace_entry("mcp_servers", server.name.as_str())
                .label(label),
            ),
        AgentKind::OpenCode => Manifest::new()
            .push(file::ensure_directory("~/.config/opencode"))
            .push(
                replace_entry(
                    "~/.config/opencode/opencode.json",
                    "mcp",
                    &server.name,
                    server.local_entry(),
                )
                .label(label),
            ),
    };
    Ok(manifest)
}

/// Mutations that remove the server named `name` from `agent`
#[must_use]
pub fn unconfigure(agent: &AgentDefinition, name: &str) -> Manifest {
    let label = format!("Remove MCP server '{name}'");
    let mutation = match agent.kind {
        AgentKind::ClaudeCode => {
            config::prune("~/.claude.json", json!({"mcpServers": {name: {}}}))
        }
        AgentKind::Codex => {
            config::prune("~/.codex/config.toml", json!({"mcp_servers": {name: {}}}))
                .remove_when_empty(true)
        }
        AgentKind::OpenCode => config::prune(
            "~/.config/opencode/opencode.json",
            json!({"mcp": {name: {}}}),
        ),
    };
    Manifest::new().push(mutation.label(label))
}

/// Replace `table.name` wholesale, keeping sibling entries and key order
fn replace_entry(
    target: &str,
    table: &'static str,
    name: &str,
    entry: Value,
) -> config::ConfigTransform {
    let name = name.to_string();
    config::transform(target, move |document, _| {
        set_entry(document, table, &name, &entry)
    })
}

fn set_entry(document: &ConfigObject, table: &str, name: &str, entry: &Value) -> TransformOutcome {
    if document
        .get(table)
        .and_then(|servers| servers.get(name))
        == Some(entry)
    {
        return TransformOutcome::unchanged(document.clone());
    }

    let mut next = document.clone();
    let servers = next
        .entry(table)
        .or_insert_with(|| Value::Object(ConfigObject::new()));
    if !servers.is_object() {
        *servers = Value::Object(ConfigObject::new());
    }
    if let Value::Object(servers) = servers {
        servers.insert(name.to_string(), entry.clone());
    }
    TransformOutcome::replace(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(McpServerConfig::default().validate().is_ok());
        assert!(McpServerConfig::new("bad name", "node").validate().is_err());
        assert!(McpServerConfig::new("../x", "node").validate().is_err());
        assert!(McpServerConfig::new("poe", " ").validate().is_err());
    }

    #[test]
    fn test_entry_shapes() {
        let server = McpServerConfig::new("poe", "node")
            .with_args(["server.js"])
            .with_env("POE_API_KEY", "pk");
        assert_eq!(
            server.command_entry(),
            json!({"command": "node", "args": ["server.js"], "env": {"POE_API_KEY": "pk"}})
        );
        assert_eq!(
            server.local_entry(),
            json!({
                "type": "local",
                "command": ["node", "server.js"],
                "enabled": true,
                "environment": {"POE_API_KEY": "pk"}
            })
        );
        assert_eq!(server.display(), "node server.js");
    }

    #[test]
    fn test_set_entry_replaces_wholesale() {
        let document = json!({"mcpServers": {"poe": {"args": ["old.js"]}, "other": {}}});
        let entry = json!({"command": "node", "args": []});
        let outcome = set_entry(document.as_object().unwrap(), "mcpServers", "poe", &entry);
        assert!(outcome.changed);
        let next = Value::Object(outcome.content.unwrap());
        assert_eq!(next["mcpServers"]["poe"], entry);
        assert_eq!(next["mcpServers"]["other"], json!({}));

        let outcome = set_entry(next.as_object().unwrap(), "mcpServers", "poe", &entry);
        assert!(!outcome.changed);
    }
}
