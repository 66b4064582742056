//! MCP bridge
//!
//! Exposes tools hosted by Model Context Protocol servers as ordinary [`Tool`](crate::agents::tool::Tool)s.
//! Servers are declared synchronously in a [`ToolSetBuilder`](crate::agents::tool::ToolSetBuilder)
//! and sit in the set as [`McpServerPlaceholder`]s; [`resolving_mcp_servers`] connects to each one,
//! lists its tools, applies its [`McpToolSelection`] and swaps the placeholder for the result.
//!
//! Every tool call opens its own connection and closes it afterwards; nothing is pooled.

pub mod client;
pub mod placeholder;
pub mod selection;
pub mod server;

pub use client::{McpClient, McpConnection, RemoteToolAnnotations, RemoteToolDefinition};
pub use placeholder::{resolving_mcp_servers, McpServerPlaceholder};
pub use selection::{McpToolCapabilities, McpToolPreset, McpToolSelection};
pub use server::{McpAuthorization, McpRemoteTool, McpServer, McpTransport};
