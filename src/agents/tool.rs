//! Tool abstraction and tool sets
//!
//! A [`Tool`] is anything the model can call: a name, a description, an input schema and an async
//! body. Tools are grouped into a [`ToolSet`] with [`ToolSetBuilder`]. MCP servers can be added to
//! the builder directly; they sit in the set as placeholders until
//! [`resolving_mcp_servers`](crate::mcp::resolving_mcp_servers) swaps them for the server's tools.

mod ask_user;
mod function;

pub use ask_user::{AskUserTool, ASK_USER_TOOL_NAME};
pub use function::FnTool;

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

use super::domain::ToolResult;
use super::error::{AgentError, AgentResult, ToolError};
use super::llm::ToolDefinition;
use crate::mcp::{McpServer, McpServerPlaceholder};
use crate::schema::Schema;

/// A capability the model can invoke
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Canonical (pre-adaptation) input schema
    fn input_schema(&self) -> Schema;

    /// Run the tool with the raw JSON arguments produced by the model
    async fn execute(&self, arguments_json: &str) -> Result<ToolResult, ToolError>;

    /// Set for unresolved MCP server placeholders
    fn as_mcp_placeholder(&self) -> Option<&McpServerPlaceholder> {
        None
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.input_schema())
    }
}

/// Ordered collection of tools.
///
/// Names are not checked when the set is built because MCP tool names are only known after
/// resolution; [`ToolSet::validate_unique_names`] runs at that point.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
}

impl std::fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.tools.iter().map(|t| t.name())).finish()
    }
}

impl ToolSet {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self { tools }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> ToolSetBuilder {
        ToolSetBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.iter()
    }

    /// Find a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name() == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    /// Append a tool
    pub fn push(&mut self, tool: Arc<dyn Tool>) {
        self.tools.push(tool);
    }

    /// Whether any MCP placeholder is still present
    pub fn has_unresolved_placeholders(&self) -> bool {
        self.tools.iter().any(|t| t.as_mcp_placeholder().is_some())
    }

    /// Fail with `UnresolvedPlaceholder` if a placeholder is still present
    pub fn ensure_resolved(&self) -> AgentResult<()> {
        match self.tools.iter().find_map(|t| t.as_mcp_placeholder()) {
            Some(placeholder) => Err(AgentError::UnresolvedPlaceholder(placeholder.server().name.clone())),
            None => Ok(()),
        }
    }

    /// Fail with `DuplicateToolName` on the first repeated name
    pub fn validate_unique_names(&self) -> AgentResult<()> {
        let mut seen = HashSet::new();
        for tool in &self.tools {
            if !seen.insert(tool.name()) {
                return Err(AgentError::DuplicateToolName(tool.name().to_string()));
            }
        }
        Ok(())
    }

    /// Definitions with canonical schemas
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }
}

impl IntoIterator for ToolSet {
    type Item = Arc<dyn Tool>;
    type IntoIter = std::vec::IntoIter<Arc<dyn Tool>>;

    fn into_iter(self) -> Self::IntoIter {
        self.tools.into_iter()
    }
}

/// Fluent builder for [`ToolSet`]
#[derive(Default)]
pub struct ToolSetBuilder {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolSetBuilder {
    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn shared(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tools<I>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Tool>>,
    {
        self.tools.extend(tools);
        self
    }

    /// Add the built-in ask-user tool
    pub fn ask_user(self) -> Self {
        self.tool(AskUserTool)
    }

    /// Add every tool of an MCP server, discovered when the set is resolved
    pub fn mcp_server(self, server: McpServer) -> Self {
        self.tool(McpServerPlaceholder::new(server))
    }

    pub fn build(self) -> ToolSet {
        ToolSet { tools: self.tools }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::McpTransport;

    fn echo(name: &str) -> FnTool {
        FnTool::new(name, "Echo the input", Schema::object(), |args| async move {
            Ok(ToolResult::json(&args))
        })
    }

    #[test]
    fn test_builder_keeps_order() {
        let set = ToolSet::builder().tool(echo("a")).ask_user().tool(echo("b")).build();
        assert_eq!(set.names(), vec!["a", ASK_USER_TOOL_NAME, "b"]);
        assert!(set.get("b").is_some());
        assert!(set.get("c").is_none());
    }

    #[test]
    fn test_duplicate_names_detected_on_validation() {
        let set = ToolSet::builder().tool(echo("a")).tool(echo("a")).build();
        assert_eq!(set.len(), 2);
        assert!(matches!(
            set.validate_unique_names(),
            Err(AgentError::DuplicateToolName(name)) if name == "a"
        ));
    }

    #[test]
    fn test_placeholders_are_reported() {
        let server = McpServer::new("files", McpTransport::http("http://localhost:1/mcp"));
        let set = ToolSet::builder().tool(echo("a")).mcp_server(server).build();

        assert!(set.has_unresolved_placeholders());
        assert!(matches!(
            set.ensure_resolved(),
            Err(AgentError::UnresolvedPlaceholder(name)) if name == "files"
        ));
        assert!(ToolSet::builder().tool(echo("a")).build().ensure_resolved().is_ok());
    }

    #[tokio::test]
    async fn test_fn_tool_executes() {
        let tool = echo("a");
        let result = tool.execute(r#"{"x":1}"#).await.unwrap();
        assert_eq!(result.content, r#"{"x":1}"#);
        assert!(!result.is_error);
    }
}
