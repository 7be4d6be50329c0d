//! Agent manifests run end to end against an in-memory home directory

use std::path::Path;
use std::sync::Arc;

use poe_agents::agent::{CLAUDE_CODE, CODEX, OPENCODE};
use poe_agents::{mcp, provider, skill, BundledTemplates, McpServerConfig, ProviderSettings};
use poe_mutations::{run_mutations, FileSystem, MemoryFileSystem, MutationContext};
use serde_json::{json, Value};

const HOME: &str = "/home/user";

fn context(fs: &Arc<MemoryFileSystem>) -> MutationContext {
    MutationContext::new(Arc::clone(fs) as Arc<dyn FileSystem>, HOME).with_templates(BundledTemplates)
}

fn read(fs: &MemoryFileSystem, relative: &str) -> Option<String> {
    fs.snapshot().get(&Path::new(HOME).join(relative)).cloned()
}

fn read_json(fs: &MemoryFileSystem, relative: &str) -> Value {
    serde_json::from_str(&read(fs, relative).expect("file exists")).expect("valid json")
}

fn settings() -> ProviderSettings {
    ProviderSettings::new("pk_test_0123456789")
}

#[tokio::test]
async fn test_claude_provider_round_trip() {
    let fs = Arc::new(
        MemoryFileSystem::new().with_file("/home/user/.claude/settings.json", "{\"theme\": \"dark\"}\n"),
    );
    let ctx = context(&fs);

    let configure = provider::configure(&CLAUDE_CODE, &settings()).unwrap();
    assert!(run_mutations(configure.mutations(), &ctx).await.unwrap().changed);
    assert_eq!(
        read_json(&fs, ".claude/settings.json"),
        json!({
            "theme": "dark",
            "apiKeyHelper": "echo pk_test_0123456789",
            "env": {"ANTHROPIC_BASE_URL": "https://api.poe.com/v1"}
        })
    );
    assert!(!run_mutations(configure.mutations(), &ctx).await.unwrap().changed);

    let unconfigure = provider::unconfigure(&CLAUDE_CODE);
    assert!(run_mutations(unconfigure.mutations(), &ctx).await.unwrap().changed);
    assert_eq!(
        read(&fs, ".claude/settings.json").unwrap(),
        "{\n  \"theme\": \"dark\"\n}\n"
    );
}

#[tokio::test]
async fn test_claude_unconfigure_keeps_user_helper() {
    let original = "{\n  \"apiKeyHelper\": \"~/bin/anthropic-key\",\n  \"env\": {\n    \"ANTHROPIC_BASE_URL\": \"https://gateway.example.com\"\n  }\n}\n";
    let fs = Arc::new(MemoryFileSystem::new().with_file("/home/user/.claude/settings.json", original));

    let result = run_mutations(provider::unconfigure(&CLAUDE_CODE).mutations(), &context(&fs))
        .await
        .unwrap();
    assert!(!result.changed);
    assert_eq!(read(&fs, ".claude/settings.json").unwrap(), original);
}

#[tokio::test]
async fn test_codex_provider_round_trip() {
    let fs = Arc::new(MemoryFileSystem::new().with_file(
        "/home/user/.codex/config.toml",
        "model = \"gpt-5\"\n\n[model_providers.poe]\nname = \"stale\"\nquery_params = { a = \"b\" }\n",
    ));
    let ctx = context(&fs);

    let configure = provider::configure(&CODEX, &settings().with_model("Claude-Sonnet-4")).unwrap();
    let dry = run_mutations(configure.mutations(), &ctx.clone().dry_run(true))
        .await
        .unwrap();
    assert!(dry.changed);
    let diff = dry.outcomes[1].diff.join("\n");
    assert!(!diff.contains("pk_test_0123456789"));

    run_mutations(configure.mutations(), &ctx).await.unwrap();
    let doc: toml::Table = toml::from_str(&read(&fs, ".codex/config.toml").unwrap()).unwrap();
    assert_eq!(doc["model"].as_str(), Some("Claude-Sonnet-4"));
    assert_eq!(doc["model_provider"].as_str(), Some("poe"));
    let poe = doc["model_providers"]["poe"].as_table().unwrap();
    assert_eq!(poe["base_url"].as_str(), Some("https://api.poe.com/v1"));
    assert_eq!(poe["name"].as_str(), Some("Poe"));
    assert!(!poe.contains_key("query_params"));

    run_mutations(provider::unconfigure(&CODEX).mutations(), &ctx)
        .await
        .unwrap();
    assert_eq!(
        read(&fs, ".codex/config.toml").unwrap(),
        "model = \"Claude-Sonnet-4\"\n"
    );
}

#[tokio::test]
async fn test_codex_unconfigure_keeps_foreign_provider() {
    let original = "model_provider = \"openai\"\n";
    let fs = Arc::new(MemoryFileSystem::new().with_file("/home/user/.codex/config.toml", original));
    let result = run_mutations(provider::unconfigure(&CODEX).mutations(), &context(&fs))
        .await
        .unwrap();
    assert!(!result.changed);
    assert_eq!(read(&fs, ".codex/config.toml").unwrap(), original);
}

#[tokio::test]
async fn test_opencode_provider() {
    let fs = Arc::new(MemoryFileSystem::new().with_dir(HOME));
    let ctx = context(&fs);

    run_mutations(
        provider::configure(&OPENCODE, &settings()).unwrap().mutations(),
        &ctx,
    )
    .await
    .unwrap();
    let doc = read_json(&fs, ".config/opencode/opencode.json");
    assert_eq!(doc["provider"]["poe"]["options"]["apiKey"], "pk_test_0123456789");

    run_mutations(provider::unconfigure(&OPENCODE).mutations(), &ctx)
        .await
        .unwrap();
    let doc = read_json(&fs, ".config/opencode/opencode.json");
    assert!(doc.get("provider").is_none());
}

#[tokio::test]
async fn test_mcp_claude_replaces_entry_shape() {
    let fs = Arc::new(MemoryFileSystem::new().with_file(
        "/home/user/.claude.json",
        r#"{"numStartups": 3, "mcpServers": {"poe": {"args": ["old.js"], "type": "stdio"}}}"#,
    ));
    let ctx = context(&fs);
    let server = McpServerConfig::new("poe", "node").with_args(["server.js"]);

    run_mutations(mcp::configure(&CLAUDE_CODE, &server).unwrap().mutations(), &ctx)
        .await
        .unwrap();
    let doc = read_json(&fs, ".claude.json");
    assert_eq!(doc["numStartups"], 3);
    assert_eq!(
        doc["mcpServers"]["poe"],
        json!({"command": "node", "args": ["server.js"]})
    );

    let again = run_mutations(mcp::configure(&CLAUDE_CODE, &server).unwrap().mutations(), &ctx)
        .await
        .unwrap();
    assert!(!again.changed);

    run_mutations(mcp::unconfigure(&CLAUDE_CODE, "poe").mutations(), &ctx)
        .await
        .unwrap();
    assert_eq!(read_json(&fs, ".claude.json"), json!({"numStartups": 3}));
}

#[tokio::test]
async fn test_mcp_codex_removes_emptied_file() {
    let fs = Arc::new(MemoryFileSystem::new().with_dir(HOME));
    let ctx = context(&fs);
    let server = McpServerConfig::default().with_env("POE_API_KEY", "pk_test_0123456789");

    run_mutations(mcp::configure(&CODEX, &server).unwrap().mutations(), &ctx)
        .await
        .unwrap();
    let doc: toml::Table = toml::from_str(&read(&fs, ".codex/config.toml").unwrap()).unwrap();
    assert_eq!(doc["mcp_servers"]["poe"]["command"].as_str(), Some("npx"));
    assert_eq!(
        doc["mcp_servers"]["poe"]["env"]["POE_API_KEY"].as_str(),
        Some("pk_test_0123456789")
    );

    let result = run_mutations(mcp::unconfigure(&CODEX, "poe").mutations(), &ctx)
        .await
        .unwrap();
    assert!(result.changed);
    assert!(read(&fs, ".codex/config.toml").is_none());
}

#[tokio::test]
async fn test_mcp_codex_keeps_similarly_named_servers() {
    let fs = Arc::new(MemoryFileSystem::new().with_file(
        "/home/user/.codex/config.toml",
        "[mcp_servers.poe]\ncommand = \"old\"\nargs = [\"a\"]\nstartup_timeout_sec = 5\n\n[mcp_servers.poetry]\ncommand = \"poetry\"\n\n[mcp_servers.poe-docs]\ncommand = \"docs\"\n",
    ));
    let ctx = context(&fs);
    let server = McpServerConfig::new("poe", "node");

    run_mutations(mcp::configure(&CODEX, &server).unwrap().mutations(), &ctx)
        .await
        .unwrap();
    let doc: toml::Table = toml::from_str(&read(&fs, ".codex/config.toml").unwrap()).unwrap();
    let servers = doc["mcp_servers"].as_table().unwrap();
    assert_eq!(servers["poetry"]["command"].as_str(), Some("poetry"));
    assert_eq!(servers["poe-docs"]["command"].as_str(), Some("docs"));
    assert_eq!(servers["poe"]["command"].as_str(), Some("node"));
    assert!(servers["poe"].get("startup_timeout_sec").is_none());

    let again = run_mutations(mcp::configure(&CODEX, &server).unwrap().mutations(), &ctx)
        .await
        .unwrap();
    assert!(!again.changed);
}

#[tokio::test]
async fn test_codex_provider_keeps_similarly_named_provider() {
    let fs = Arc::new(MemoryFileSystem::new().with_file(
        "/home/user/.codex/config.toml",
        "[model_providers.poetry]\nname = \"Poetry\"\nbase_url = \"http://localhost:8000\"\n",
    ));
    let ctx = context(&fs);

    run_mutations(
        provider::configure(&CODEX, &settings()).unwrap().mutations(),
        &ctx,
    )
    .await
    .unwrap();
    let doc: toml::Table = toml::from_str(&read(&fs, ".codex/config.toml").unwrap()).unwrap();
    assert_eq!(doc["model_providers"]["poetry"]["name"].as_str(), Some("Poetry"));
    assert_eq!(doc["model_providers"]["poe"]["name"].as_str(), Some("Poe"));

    run_mutations(provider::unconfigure(&CODEX).mutations(), &ctx)
        .await
        .unwrap();
    let doc: toml::Table = toml::from_str(&read(&fs, ".codex/config.toml").unwrap()).unwrap();
    assert!(doc["model_providers"].get("poe").is_none());
    assert_eq!(doc["model_providers"]["poetry"]["name"].as_str(), Some("Poetry"));
}

#[tokio::test]
async fn test_mcp_opencode_local_entry() {
    let fs = Arc::new(MemoryFileSystem::new().with_file(
        "/home/user/.config/opencode/opencode.json",
        r#"{"mcp": {"poe": {"type": "local", "command": ["old"], "timeout": 5}, "docs": {"type": "remote"}}}"#,
    ));
    let server = McpServerConfig::new("poe", "npx").with_args(["-y", "poe-mcp"]);

    run_mutations(mcp::configure(&OPENCODE, &server).unwrap().mutations(), &context(&fs))
        .await
        .unwrap();
    let doc = read_json(&fs, ".config/opencode/opencode.json");
    assert_eq!(
        doc["mcp"]["poe"],
        json!({"type": "local", "command": ["npx", "-y", "poe-mcp"], "enabled": true})
    );
    assert_eq!(doc["mcp"]["docs"], json!({"type": "remote"}));
}

#[tokio::test]
async fn test_skill_install_and_uninstall() {
    let fs = Arc::new(
        MemoryFileSystem::new()
            .with_dir(HOME)
            .with_file("/home/user/.codex/skills/poe/notes.md", "mine\n"),
    );
    let ctx = context(&fs);

    for agent in [&CLAUDE_CODE, &CODEX] {
        let result = run_mutations(skill::install(agent).unwrap().mutations(), &ctx)
            .await
            .unwrap();
        assert!(result.changed);
    }
    let text = read(&fs, ".claude/skills/poe/SKILL.md").unwrap();
    assert!(text.starts_with("---\nname: poe\n"));
    assert!(text.contains("poe-code configure claude-code"));
    assert!(!text.contains("{{"));

    for agent in [&CLAUDE_CODE, &CODEX] {
        run_mutations(skill::uninstall(agent).unwrap().mutations(), &ctx)
            .await
            .unwrap();
    }
    assert!(!fs.exists("/home/user/.claude/skills/poe"));
    assert!(read(&fs, ".codex/skills/poe/SKILL.md").is_none());
    assert!(fs.exists("/home/user/.codex/skills/poe/notes.md"));
}
