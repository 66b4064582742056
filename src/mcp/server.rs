//! MCP server descriptors and remote tools

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::client::{HttpConnection, McpClient, McpConnection, RemoteToolDefinition, StdioConnection};
use super::selection::{McpToolCapabilities, McpToolSelection};
use crate::agents::domain::ToolResult;
use crate::agents::error::{McpError, McpResult, ToolError};
use crate::agents::tool::Tool;
use crate::schema::Schema;

/// Default per-request timeout for MCP servers
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How to reach an MCP server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum McpTransport {
    /// Child process speaking line-delimited JSON-RPC on stdin/stdout
    Stdio {
        command: String,
        args: Vec<String>,
        env: BTreeMap<String, String>,
    },
    /// Streamable HTTP endpoint
    Http { url: String },
}

impl McpTransport {
    pub fn stdio<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Stdio {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: BTreeMap::new(),
        }
    }

    pub fn http(url: impl Into<String>) -> Self {
        Self::Http { url: url.into() }
    }

    /// Add an environment variable for a stdio server; ignored for HTTP
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Self::Stdio { env, .. } = &mut self {
            env.insert(key.into(), value.into());
        }
        self
    }
}

/// Credentials sent to an HTTP server
#[derive(Clone, PartialEq, Eq, Default)]
pub enum McpAuthorization {
    #[default]
    None,
    /// `Authorization: Bearer <token>`
    Bearer(String),
    Header { name: String, value: String },
    Headers(BTreeMap<String, String>),
}

// Credentials stay out of logs.
impl std::fmt::Debug for McpAuthorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            McpAuthorization::None => write!(f, "None"),
            McpAuthorization::Bearer(_) => write!(f, "Bearer(***)"),
            McpAuthorization::Header { name, .. } => write!(f, "Header({}: ***)", name),
            McpAuthorization::Headers(headers) => {
                f.debug_list().entries(headers.keys()).finish()
            }
        }
    }
}

impl McpAuthorization {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer(token.into())
    }

    pub fn header(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Header {
            name: name.into(),
            value: value.into(),
        }
    }

    /// HTTP headers to add to every request
    pub fn headers(&self) -> Vec<(String, String)> {
        match self {
            McpAuthorization::None => Vec::new(),
            McpAuthorization::Bearer(token) => {
                vec![("Authorization".to_string(), format!("Bearer {}", token))]
            }
            McpAuthorization::Header { name, value } => vec![(name.clone(), value.clone())],
            McpAuthorization::Headers(headers) => headers
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        }
    }
}

/// An MCP server the agent can draw tools from
#[derive(Debug, Clone)]
pub struct McpServer {
    pub name: String,
    pub transport: McpTransport,
    pub authorization: McpAuthorization,
    pub selection: McpToolSelection,
    /// Prepended to remote tool names to keep them unique across servers
    pub name_prefix: Option<String>,
    pub timeout: Duration,
}

impl McpServer {
    pub fn new(name: impl Into<String>, transport: McpTransport) -> Self {
        Self {
            name: name.into(),
            transport,
            authorization: McpAuthorization::None,
            selection: McpToolSelection::All,
            name_prefix: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_authorization(mut self, authorization: McpAuthorization) -> Self {
        self.authorization = authorization;
        self
    }

    pub fn with_selection(mut self, selection: McpToolSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = Some(prefix.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Name a remote tool is exposed under
    pub fn exposed_name(&self, remote_name: &str) -> String {
        match &self.name_prefix {
            Some(prefix) => format!("{}{}", prefix, remote_name),
            None => remote_name.to_string(),
        }
    }

    /// Inverse of [`McpServer::exposed_name`]
    pub fn remote_name<'a>(&self, exposed_name: &'a str) -> Option<&'a str> {
        match &self.name_prefix {
            Some(prefix) => exposed_name.strip_prefix(prefix.as_str()),
            None => Some(exposed_name),
        }
    }

    fn open_transport(&self) -> McpResult<Box<dyn McpConnection>> {
        match &self.transport {
            McpTransport::Stdio { command, args, env } => {
                if !matches!(self.authorization, McpAuthorization::None) {
                    debug!(server = %self.name, "Authorization is not applied to stdio servers");
                }
                let connection = StdioConnection::spawn(&self.name, command, args, env, self.timeout)?;
                Ok(Box::new(connection))
            }
            McpTransport::Http { url } => {
                let connection =
                    HttpConnection::new(&self.name, url, self.authorization.headers(), self.timeout)?;
                Ok(Box::new(connection))
            }
        }
    }

    /// Open a connection and complete the `initialize` handshake
    pub async fn connect(&self) -> McpResult<McpClient> {
        let mut client = McpClient::new(&self.name, self.open_transport()?);
        client.initialize().await.map_err(|e| match e {
            McpError::ConnectionFailed { .. } => e,
            other => McpError::ConnectionFailed {
                server: self.name.clone(),
                reason: other.to_string(),
            },
        })?;
        Ok(client)
    }

    /// Discover the server's tools and apply the selection filter
    pub async fn fetch_tools(&self) -> McpResult<Vec<McpRemoteTool>> {
        info!(server = %self.name, "Fetching MCP tools");
        let mut client = self.connect().await?;
        let definitions = client.list_tools().await.map_err(|e| match e {
            McpError::ConnectionFailed { .. } => e,
            other => McpError::ToolFetchFailed {
                server: self.name.clone(),
                reason: other.to_string(),
            },
        })?;
        Ok(self.select_tools(definitions))
    }

    /// Convert definitions to tools, keeping those the selection allows
    pub fn select_tools(&self, definitions: Vec<RemoteToolDefinition>) -> Vec<McpRemoteTool> {
        let server = Arc::new(self.clone());
        let total = definitions.len();

        let tools: Vec<McpRemoteTool> = definitions
            .into_iter()
            .map(|definition| McpRemoteTool::new(server.clone(), definition))
            .filter(|tool| self.selection.allows(&tool.remote_name, &tool.capabilities))
            .collect();

        info!(
            server = %self.name,
            selected = tools.len(),
            total,
            "MCP tools selected"
        );
        tools
    }

    /// Call a tool by its exposed name over a fresh connection
    pub async fn execute_tool(&self, exposed_name: &str, arguments_json: &str) -> McpResult<ToolResult> {
        let remote_name = self
            .remote_name(exposed_name)
            .ok_or_else(|| McpError::ToolNotFound(exposed_name.to_string()))?;
        let arguments: Value = if arguments_json.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(arguments_json).map_err(|e| McpError::ToolExecutionFailed {
                tool: exposed_name.to_string(),
                reason: format!("invalid arguments: {}", e),
            })?
        };

        debug!(server = %self.name, tool = %remote_name, "Calling MCP tool");
        let mut client = self.connect().await?;
        let result = client.call_tool(remote_name, arguments).await;
        if let Err(e) = &result {
            warn!(server = %self.name, tool = %remote_name, error = %e, "MCP tool call failed");
        }
        result
    }
}

/// A tool hosted on an MCP server
#[derive(Debug, Clone)]
pub struct McpRemoteTool {
    server: Arc<McpServer>,
    remote_name: String,
    exposed_name: String,
    description: String,
    input_schema: Schema,
    capabilities: McpToolCapabilities,
}

impl McpRemoteTool {
    pub fn new(server: Arc<McpServer>, definition: RemoteToolDefinition) -> Self {
        let description = definition.description.unwrap_or_default();
        let input_schema = definition
            .input_schema
            .as_ref()
            .map(Schema::from_json_schema)
            .unwrap_or_else(Schema::object);
        let annotations = definition.annotations.unwrap_or_default();
        let capabilities = McpToolCapabilities::infer(&definition.name, &description)
            .with_hints(annotations.read_only_hint, annotations.destructive_hint);

        Self {
            exposed_name: server.exposed_name(&definition.name),
            server,
            remote_name: definition.name,
            description,
            input_schema,
            capabilities,
        }
    }

    pub fn server_name(&self) -> &str {
        &self.server.name
    }

    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }

    pub fn capabilities(&self) -> McpToolCapabilities {
        self.capabilities
    }
}

#[async_trait]
impl Tool for McpRemoteTool {
    fn name(&self) -> &str {
        &self.exposed_name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Schema {
        self.input_schema.clone()
    }

    async fn execute(&self, arguments_json: &str) -> Result<ToolResult, ToolError> {
        Ok(self.server.execute_tool(&self.exposed_name, arguments_json).await?)
    }
}
