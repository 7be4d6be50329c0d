//! Skill CLI commands
//!
//! Handles: poe-code skill install/uninstall

use clap::Subcommand;
use poe_agents::{resolve_agent, skill};

use super::{run_manifest, GlobalArgs};

/// Skill commands
#[derive(Subcommand)]
pub enum SkillCommands {
    /// Install the Poe skill for an agent
    Install {
        /// Agent id or alias
        agent: String,
    },
    /// Remove the Poe skill from an agent
    Uninstall {
        /// Agent id or alias
        agent: String,
    },
}

pub async fn execute(command: SkillCommands, global: &GlobalArgs) -> anyhow::Result<()> {
    let manifest = match command {
        SkillCommands::Install { agent } => skill::install(resolve_agent(&agent)?)?,
        SkillCommands::Uninstall { agent } => skill::uninstall(resolve_agent(&agent)?)?,
    };
    run_manifest(&manifest, global).await
}
