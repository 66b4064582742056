//! Build-time stand-ins for MCP servers and the pass that resolves them

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::server::McpServer;
use crate::agents::domain::ToolResult;
use crate::agents::error::{AgentResult, McpError, ToolError};
use crate::agents::tool::{Tool, ToolSet};
use crate::schema::Schema;

/// Occupies an MCP server's slot in a [`ToolSet`] until [`resolving_mcp_servers`] runs.
///
/// Executing it always fails with `PlaceholderCannotExecute`.
#[derive(Debug, Clone)]
pub struct McpServerPlaceholder {
    server: McpServer,
    name: String,
    description: String,
}

impl McpServerPlaceholder {
    pub fn new(server: McpServer) -> Self {
        Self {
            name: format!("mcp_server:{}", server.name),
            description: format!("Tools provided by the MCP server '{}'", server.name),
            server,
        }
    }

    pub fn server(&self) -> &McpServer {
        &self.server
    }
}

#[async_trait]
impl Tool for McpServerPlaceholder {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Schema {
        Schema::object()
    }

    async fn execute(&self, _arguments_json: &str) -> Result<ToolResult, ToolError> {
        Err(McpError::PlaceholderCannotExecute(self.server.name.clone()).into())
    }

    fn as_mcp_placeholder(&self) -> Option<&McpServerPlaceholder> {
        Some(self)
    }
}

/// Replace every placeholder in `tools` with the tools its server exposes.
///
/// Ordinary tools keep their position; a server's tools take the position of its placeholder.
/// Connection and discovery failures abort resolution. The resolved set must have unique names.
pub async fn resolving_mcp_servers(tools: ToolSet) -> AgentResult<ToolSet> {
    if !tools.has_unresolved_placeholders() {
        tools.validate_unique_names()?;
        return Ok(tools);
    }

    let mut resolved = ToolSet::empty();
    let mut servers = 0usize;
    for tool in tools {
        match tool.as_mcp_placeholder() {
            Some(placeholder) => {
                let remote = placeholder.server().fetch_tools().await?;
                servers += 1;
                for remote_tool in remote {
                    resolved.push(Arc::new(remote_tool));
                }
            }
            None => resolved.push(tool),
        }
    }

    resolved.validate_unique_names()?;
    info!(servers, tools = resolved.len(), "Resolved MCP servers");
    Ok(resolved)
}
