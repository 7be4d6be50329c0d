//! Agent registry listing
//!
//! Handles: poe-code agents

use poe_agents::AGENTS;

use super::GlobalArgs;

/// Print the supported agents
pub fn list(global: &GlobalArgs) -> anyhow::Result<()> {
    if global.json {
        println!("{}", serde_json::to_string_pretty(&AGENTS)?);
        return Ok(());
    }

    println!("{:<12} {:<12} {:<20} CONFIG", "ID", "NAME", "ALIASES");
    for agent in &AGENTS {
        println!(
            "{:<12} {:<12} {:<20} {}",
            agent.id,
            agent.name,
            agent.aliases.join(", "),
            agent.config_dir
        );
    }
    Ok(())
}
