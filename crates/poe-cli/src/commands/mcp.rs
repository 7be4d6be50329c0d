//! MCP server CLI commands
//!
//! Handles: poe-code mcp configure/unconfigure

use anyhow::bail;
use clap::{Args, Subcommand};
use poe_agents::mcp::{self, DEFAULT_SERVER_NAME};
use poe_agents::{resolve_agent, McpServerConfig};

use super::{run_manifest, GlobalArgs};

/// MCP server commands
#[derive(Subcommand)]
pub enum McpCommands {
    /// Register an MCP server with an agent
    Configure(McpConfigureArgs),
    /// Remove an MCP server from an agent
    Unconfigure {
        /// Agent id or alias
        agent: String,
        /// Server name
        #[arg(long, default_value = DEFAULT_SERVER_NAME)]
        name: String,
    },
}

/// Arguments for `poe-code mcp configure`
#[derive(Args)]
pub struct McpConfigureArgs {
    /// Agent id or alias
    pub agent: String,

    /// Server name
    #[arg(long, default_value = DEFAULT_SERVER_NAME)]
    pub name: String,

    /// Command to run (defaults to the Poe MCP server)
    #[arg(long)]
    pub command: Option<String>,

    /// Command arguments (can specify multiple times)
    #[arg(long = "arg", value_name = "ARG", allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Environment variables (KEY=value, can specify multiple times)
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,
}

impl McpConfigureArgs {
    /// Convert to `McpServerConfig`
    pub fn to_config(&self) -> anyhow::Result<McpServerConfig> {
        let mut config = match &self.command {
            Some(command) => McpServerConfig::new(&self.name, command).with_args(&self.args),
            None if self.args.is_empty() => McpServerConfig {
                name: self.name.clone(),
                ..McpServerConfig::default()
            },
            None => bail!("--arg requires --command"),
        };

        for entry in &self.env {
            let Some((key, value)) = entry.split_once('=') else {
                bail!("Invalid env format: {entry} (expected KEY=value)");
            };
            config = config.with_env(key, value);
        }
        Ok(config)
    }
}

pub async fn execute(command: McpCommands, global: &GlobalArgs) -> anyhow::Result<()> {
    match command {
        McpCommands::Configure(args) => {
            let agent = resolve_agent(&args.agent)?;
            let manifest = mcp::configure(agent, &args.to_config()?)?;
            run_manifest(&manifest, global).await
        }
        McpCommands::Unconfigure { agent, name } => {
            let agent = resolve_agent(&agent)?;
            run_manifest(&mcp::unconfigure(agent, &name), global).await
        }
    }
}
