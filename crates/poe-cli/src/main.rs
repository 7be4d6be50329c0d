//! poe-code CLI - Route AI coding agents through Poe
//!
//! Provides `poe-code configure`, `poe-code mcp`, `poe-code skill`, and
//! friends. Every command builds a mutation manifest and runs it against
//! the user's home directory (or an isolated root).

mod commands;
mod output;

use clap::{Parser, Subcommand};
use poe_agents::AgentError;
use poe_mutations::MutationError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::mcp::McpCommands;
use commands::provider::ConfigureArgs;
use commands::skill::SkillCommands;
use commands::GlobalArgs;

#[derive(Parser)]
#[command(name = "poe-code")]
#[command(about = "poe-code - Configure AI coding agents to use Poe")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported agents
    Agents,
    /// Route an agent's model traffic through Poe
    Configure(ConfigureArgs),
    /// Remove Poe routing from an agent
    Unconfigure {
        /// Agent id or alias
        agent: String,
    },
    /// Manage MCP server registration
    Mcp {
        #[command(subcommand)]
        action: McpCommands,
    },
    /// Manage the Poe skill
    Skill {
        #[command(subcommand)]
        action: SkillCommands,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    let result = match cli.command {
        Commands::Agents => commands::agents::list(&cli.global),
        Commands::Configure(args) => commands::provider::configure(args, &cli.global).await,
        Commands::Unconfigure { agent } => {
            commands::provider::unconfigure(&agent, &cli.global).await
        }
        Commands::Mcp { action } => commands::mcp::execute(action, &cli.global).await,
        Commands::Skill { action } => commands::skill::execute(action, &cli.global).await,
    };

    if let Err(e) = result {
        eprintln!("error[{}]: {e:#}", error_code(&e));
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

/// Stable code of the first typed error in the chain
fn error_code(error: &anyhow::Error) -> &'static str {
    error
        .chain()
        .find_map(|cause| {
            cause
                .downcast_ref::<AgentError>()
                .map(AgentError::code)
                .or_else(|| cause.downcast_ref::<MutationError>().map(MutationError::code))
        })
        .unwrap_or("ERROR")
}
