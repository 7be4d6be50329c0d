//! Poe Agents - Agent registry and configuration manifests
//!
//! Each supported agent CLI gets manifests (ordered mutation lists) for
//! provider routing, MCP server registration, and skill installation. The
//! manifests are pure data; run them with `poe_mutations::run_mutations`.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

pub mod agent;
pub mod error;
pub mod mcp;
pub mod provider;
pub mod skill;
pub mod templates;

pub use agent::{resolve_agent, AgentDefinition, AgentKind, AGENTS};
pub use error::{AgentError, AgentResult};
pub use mcp::McpServerConfig;
pub use provider::{ProviderSettings, DEFAULT_BASE_URL};
pub use templates::BundledTemplates;
