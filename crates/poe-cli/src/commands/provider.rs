//! Provider routing commands
//!
//! Handles: poe-code configure/unconfigure

use clap::Args;
use poe_agents::{provider, resolve_agent, AgentError, ProviderSettings, DEFAULT_BASE_URL};

use super::{run_manifest, GlobalArgs};

/// Arguments for `poe-code configure`
#[derive(Args, Debug)]
pub struct ConfigureArgs {
    /// Agent id or alias
    pub agent: String,

    /// Poe API key
    #[arg(long, env = "POE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// API endpoint
    #[arg(long, env = "POE_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Default model, for agents that take one
    #[arg(long)]
    pub model: Option<String>,
}

impl ConfigureArgs {
    /// Convert to `ProviderSettings`
    pub fn to_settings(&self) -> Result<ProviderSettings, AgentError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AgentError::MissingSetting("api key (--api-key or POE_API_KEY)"))?;
        let mut settings = ProviderSettings::new(api_key).with_base_url(&self.base_url);
        if let Some(model) = &self.model {
            settings = settings.with_model(model);
        }
        Ok(settings)
    }
}

pub async fn configure(args: ConfigureArgs, global: &GlobalArgs) -> anyhow::Result<()> {
    let agent = resolve_agent(&args.agent)?;
    let manifest = provider::configure(agent, &args.to_settings()?)?;
    tracing::debug!(agent = agent.id, mutations = manifest.len(), "Configuring provider");
    run_manifest(&manifest, global).await
}

pub async fn unconfigure(agent: &str, global: &GlobalArgs) -> anyhow::Result<()> {
    let agent = resolve_agent(agent)?;
    run_manifest(&provider::unconfigure(agent), global).await
}
