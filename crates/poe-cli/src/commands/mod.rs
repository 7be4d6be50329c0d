//! CLI command handlers
//!
//! Each command builds a manifest from `poe-agents` and runs it through
//! [`run_manifest`], which owns context construction and output.

pub mod agents;
pub mod mcp;
pub mod provider;
pub mod skill;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgAction, Args};
use poe_agents::BundledTemplates;
use poe_mutations::{
    run_mutations, IsolatedRoot, Manifest, MutationContext, OsFileSystem, TracingObserver,
};

use crate::output;

/// Flags shared by every command
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Home directory whose agent configs are edited
    #[arg(long, global = true, env = "POE_HOME", value_name = "DIR")]
    pub home: Option<PathBuf>,

    /// Write configs under this root instead of the home directory
    #[arg(long, global = true, value_name = "DIR")]
    pub isolated: Option<PathBuf>,

    /// Preview changes without writing anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

impl GlobalArgs {
    /// Build the mutation context for this invocation
    pub fn context(&self) -> anyhow::Result<MutationContext> {
        let home = match &self.home {
            Some(home) => home.clone(),
            None => dirs::home_dir().context("Could not determine the home directory")?,
        };

        let mut context = MutationContext::new(Arc::new(OsFileSystem::new()), &home)
            .dry_run(self.dry_run)
            .with_templates(BundledTemplates)
            .with_observer(TracingObserver);
        if let Some(root) = &self.isolated {
            tracing::info!(root = %root.display(), "Using isolated configuration root");
            context = context.with_path_mapper(IsolatedRoot::new(&home, root));
        }
        Ok(context)
    }
}

/// Run a manifest and print its outcome
pub async fn run_manifest(manifest: &Manifest, global: &GlobalArgs) -> anyhow::Result<()> {
    let context = global.context()?;
    let batch = run_mutations(manifest.mutations(), &context).await?;
    output::print_batch(&batch, &context, global.json)
}
