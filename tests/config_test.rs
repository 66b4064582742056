use agentrail::config::{McpAuthConfig, McpToolsConfig, McpTransportConfig, Settings};
use agentrail::mcp::{McpAuthorization, McpToolPreset, McpToolSelection, McpTransport};
use agentrail::schema::Backend;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_load_settings_from_toml() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();

    let toml = r#"
[agent]
model = "gpt-test"
backend = "openai"
system_prompt = "You are terse."
max_steps = 12

[[mcp_servers]]
name = "files"
name_prefix = "fs_"
tools = { preset = "read_only" }

[mcp_servers.transport]
type = "stdio"
command = "mcp-files"
args = ["--root", "/srv"]
env = [{ name = "LOG_LEVEL", value = "warn" }]

[[mcp_servers]]
name = "tickets"
tools = { include = ["get_ticket", "list_tickets"] }

[mcp_servers.transport]
type = "http"
url = "https://tickets.example.com/mcp"

[mcp_servers.auth]
type = "bearer"
token = "secret-token"

[[mcp_servers]]
name = "disabled"
enabled = false

[mcp_servers.transport]
type = "http"
url = "http://localhost:9/mcp"
"#;
    fs::write(root.join("agentrail.toml"), toml)?;

    let settings = Settings::from_root(root)?;

    assert_eq!(settings.agent.model, "gpt-test");
    assert_eq!(settings.agent.backend, Backend::OpenAi);
    assert_eq!(settings.agent.max_steps, 12);
    assert_eq!(settings.mcp_servers.len(), 3);
    assert_eq!(settings.mcp_servers[0].tools, McpToolsConfig::Preset(McpToolPreset::ReadOnly));
    assert!(matches!(settings.mcp_servers[1].auth, McpAuthConfig::Bearer { .. }));
    assert!(matches!(
        settings.mcp_servers[1].transport,
        McpTransportConfig::Http { .. }
    ));

    let config = settings.agent_config();
    assert_eq!(config.model, "gpt-test");
    assert_eq!(config.max_steps, 12);
    assert_eq!(config.system_prompt.as_deref(), Some("You are terse."));

    let servers = settings.mcp_servers()?;
    assert_eq!(servers.len(), 2);
    assert_eq!(
        servers[0].transport,
        McpTransport::stdio("mcp-files", ["--root", "/srv"]).with_env("LOG_LEVEL", "warn")
    );
    assert_eq!(servers[0].selection, McpToolSelection::Preset(McpToolPreset::ReadOnly));
    assert_eq!(servers[0].exposed_name("read"), "fs_read");
    assert_eq!(servers[1].authorization, McpAuthorization::bearer("secret-token"));
    assert_eq!(
        servers[1].selection,
        McpToolSelection::including(["get_ticket", "list_tickets"])
    );

    Ok(())
}

#[test]
fn test_invalid_settings_are_rejected() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let toml = r#"
[agent]
model = "m"
max_steps = 0

[[mcp_servers]]
name = "bad"

[mcp_servers.transport]
type = "http"
url = "localhost:3000"
"#;
    fs::write(temp_dir.path().join("agentrail.toml"), toml)?;

    let err = Settings::from_root(temp_dir.path()).unwrap_err().to_string();
    assert!(err.contains("Configuration validation failed"));
    assert!(err.contains("agent.max_steps"));
    assert!(err.contains("mcp_servers[0].transport.url"));
    Ok(())
}

#[test]
fn test_environment_overrides_file() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    fs::write(
        temp_dir.path().join("agentrail.toml"),
        "[agent]\nmodel = \"claude-test\"\n",
    )?;

    std::env::set_var("AGENTRAIL__AGENT__MAX_CONSECUTIVE_TOOL_CALLS", "7");
    let settings = Settings::from_root(temp_dir.path());
    std::env::remove_var("AGENTRAIL__AGENT__MAX_CONSECUTIVE_TOOL_CALLS");

    let settings = settings?;
    assert_eq!(settings.agent.max_consecutive_tool_calls, 7);
    assert_eq!(settings.agent.backend, Backend::Anthropic);
    Ok(())
}

#[test]
fn test_bearer_token_from_environment() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let toml = r#"
[agent]
model = "m"

[[mcp_servers]]
name = "remote"

[mcp_servers.transport]
type = "http"
url = "http://localhost:3001/mcp"

[mcp_servers.auth]
type = "bearer"
token_env = "AGENTRAIL_TEST_MCP_TOKEN"
"#;
    fs::write(temp_dir.path().join("agentrail.toml"), toml)?;
    let settings = Settings::from_root(temp_dir.path())?;

    assert!(settings.mcp_servers().is_err());

    std::env::set_var("AGENTRAIL_TEST_MCP_TOKEN", "from-env");
    let servers = settings.mcp_servers();
    std::env::remove_var("AGENTRAIL_TEST_MCP_TOKEN");

    assert_eq!(servers?[0].authorization, McpAuthorization::bearer("from-env"));
    Ok(())
}
