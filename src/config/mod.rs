use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

pub mod validator;

use crate::agents::config::{default_max_consecutive_tool_calls, default_max_steps, AgentConfig};
use crate::mcp::{McpAuthorization, McpServer, McpToolPreset, McpToolSelection, McpTransport};
use crate::schema::Backend;

/// Base name of the optional configuration file (`agentrail.toml`, `.yaml` or `.json`)
pub const CONFIG_FILE_NAME: &str = "agentrail";

/// Prefix of environment overrides, e.g. `AGENTRAIL__AGENT__MAX_STEPS=20`
pub const ENV_PREFIX: &str = "AGENTRAIL";

#[derive(Debug, Deserialize, Serialize)]
pub struct Settings {
    pub agent: AgentSettings,
    /// External MCP servers the agent draws tools from
    #[serde(default)]
    pub mcp_servers: Vec<McpServerConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AgentSettings {
    pub model: String,
    /// Backend the caller's provider talks to; selects the schema adapter
    #[serde(default)]
    pub backend: Backend,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    #[serde(default = "default_max_consecutive_tool_calls")]
    pub max_consecutive_tool_calls: usize,
}

/// Configuration for connecting to an external MCP server
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct McpServerConfig {
    /// Unique name for this MCP server connection
    pub name: String,
    pub transport: McpTransportConfig,
    #[serde(default)]
    pub auth: McpAuthConfig,
    /// Which of the server's tools are exposed
    #[serde(default)]
    pub tools: McpToolsConfig,
    /// Prepended to every tool name from this server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    /// Whether this server is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Request timeout in seconds
    #[serde(default = "default_mcp_timeout")]
    pub timeout_seconds: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_mcp_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum McpTransportConfig {
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: Vec<NameValue>,
    },
    Http {
        url: String,
    },
}

/// A name/value pair. Used instead of a map because configuration keys are lowercased on load.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NameValue {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum McpAuthConfig {
    #[default]
    None,
    Bearer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
        /// Environment variable holding the token
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token_env: Option<String>,
    },
    Header {
        name: String,
        value: String,
    },
    Headers {
        headers: Vec<NameValue>,
    },
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum McpToolsConfig {
    #[default]
    All,
    Include(Vec<String>),
    Exclude(Vec<String>),
    Preset(McpToolPreset),
}

impl McpAuthConfig {
    fn to_authorization(&self) -> Result<McpAuthorization, anyhow::Error> {
        Ok(match self {
            McpAuthConfig::None => McpAuthorization::None,
            McpAuthConfig::Bearer { token: Some(token), .. } => McpAuthorization::bearer(token),
            McpAuthConfig::Bearer {
                token: None,
                token_env: Some(var),
            } => {
                let token = std::env::var(var)
                    .map_err(|_| anyhow::anyhow!("environment variable '{}' is not set", var))?;
                McpAuthorization::bearer(token)
            }
            McpAuthConfig::Bearer { .. } => anyhow::bail!("bearer auth needs 'token' or 'token_env'"),
            McpAuthConfig::Header { name, value } => McpAuthorization::header(name, value),
            McpAuthConfig::Headers { headers } => McpAuthorization::Headers(
                headers
                    .iter()
                    .map(|h| (h.name.clone(), h.value.clone()))
                    .collect(),
            ),
        })
    }
}

impl From<&McpToolsConfig> for McpToolSelection {
    fn from(config: &McpToolsConfig) -> Self {
        match config {
            McpToolsConfig::All => McpToolSelection::All,
            McpToolsConfig::Include(names) => McpToolSelection::including(names.iter().cloned()),
            McpToolsConfig::Exclude(names) => McpToolSelection::excluding(names.iter().cloned()),
            McpToolsConfig::Preset(preset) => McpToolSelection::Preset(*preset),
        }
    }
}

impl McpServerConfig {
    /// Build the runtime server description. Fails if a referenced environment variable is unset.
    pub fn to_server(&self) -> Result<McpServer, anyhow::Error> {
        let transport = match &self.transport {
            McpTransportConfig::Stdio { command, args, env } => McpTransport::Stdio {
                command: command.clone(),
                args: args.clone(),
                env: env
                    .iter()
                    .map(|var| (var.name.clone(), var.value.clone()))
                    .collect::<BTreeMap<_, _>>(),
            },
            McpTransportConfig::Http { url } => McpTransport::http(url),
        };

        let mut server = McpServer::new(&self.name, transport)
            .with_authorization(self.auth.to_authorization()?)
            .with_selection((&self.tools).into())
            .with_timeout(Duration::from_secs(self.timeout_seconds));
        if let Some(prefix) = &self.name_prefix {
            server = server.with_name_prefix(prefix);
        }
        Ok(server)
    }
}

impl Settings {
    pub fn new() -> Result<Self, anyhow::Error> {
        Self::from_root(".")
    }

    /// Load `agentrail.*` from `root`, then apply `AGENTRAIL__*` environment overrides
    pub fn from_root(root: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let config_path = root.as_ref().join(CONFIG_FILE_NAME);
        let s = Config::builder()
            .add_source(File::from(config_path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("agent.backend", "anthropic")?
            .set_default("agent.max_steps", default_max_steps() as i64)?
            .set_default("agent.max_consecutive_tool_calls", default_max_consecutive_tool_calls() as i64)?
            .build()?;

        let settings: Settings = s.try_deserialize()?;

        // Validate configuration
        validator::ConfigValidator::validate(&settings).map_err(|errors| {
            let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::anyhow!("Configuration validation failed:\n{}", error_messages.join("\n"))
        })?;

        Ok(settings)
    }

    pub fn agent_config(&self) -> AgentConfig {
        let mut config = AgentConfig::new(&self.agent.model)
            .with_max_steps(self.agent.max_steps)
            .with_max_consecutive_tool_calls(self.agent.max_consecutive_tool_calls);
        if let Some(prompt) = &self.agent.system_prompt {
            config = config.with_system_prompt(prompt);
        }
        config
    }

    /// Enabled MCP servers, ready to add to a `ToolSet`
    pub fn mcp_servers(&self) -> Result<Vec<McpServer>, anyhow::Error> {
        self.mcp_servers
            .iter()
            .filter(|server| server.enabled)
            .map(McpServerConfig::to_server)
            .collect()
    }
}
