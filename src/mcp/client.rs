//! MCP client
//!
//! JSON-RPC 2.0 over one of two transports: a child process speaking line-delimited JSON on
//! stdio, or HTTP POST (streamable HTTP, with plain JSON or SSE responses). [`McpClient`] runs the
//! `initialize` handshake and wraps `tools/list` and `tools/call` on top of any [`McpConnection`].

mod http;
mod stdio;

pub use http::HttpConnection;
pub use stdio::StdioConnection;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::agents::domain::ToolResult;
use crate::agents::error::{McpError, McpResult};

/// Protocol revision sent in `initialize`
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC error code for invalid params, which servers use for unknown tools
const INVALID_PARAMS: i64 = -32602;

/// MCP JSON-RPC request
#[derive(Debug, Serialize)]
pub(crate) struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    method: &'a str,
    params: Value,
}

impl<'a> JsonRpcRequest<'a> {
    pub(crate) fn request(id: u64, method: &'a str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id: Some(id),
            method,
            params,
        }
    }

    pub(crate) fn notification(method: &'a str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id: None,
            method,
            params,
        }
    }
}

/// MCP JSON-RPC response
#[derive(Debug, Deserialize)]
pub(crate) struct JsonRpcResponse {
    #[serde(default)]
    pub(crate) result: Option<Value>,
    #[serde(default)]
    pub(crate) error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct JsonRpcError {
    pub(crate) code: i64,
    pub(crate) message: String,
}

impl JsonRpcResponse {
    /// Whether this message answers request `id`
    pub(crate) fn answers(message: &Value, id: u64) -> bool {
        message.get("method").is_none() && message.get("id").and_then(Value::as_u64) == Some(id)
    }

    pub(crate) fn into_result(self) -> Result<Value, JsonRpcError> {
        match (self.error, self.result) {
            (Some(error), _) => Err(error),
            (None, Some(result)) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }
}

/// A transport able to carry JSON-RPC messages to one MCP server
#[async_trait]
pub trait McpConnection: Send {
    /// Send a request and wait for the matching response
    async fn request(&mut self, id: u64, method: &str, params: Value) -> McpResult<Value>;

    /// Send a notification; no response is expected
    async fn notify(&mut self, method: &str, params: Value) -> McpResult<()>;
}

/// Tool metadata returned by `tools/list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Option<Value>,
    #[serde(default)]
    pub annotations: Option<RemoteToolAnnotations>,
}

/// Behavioural hints a server may attach to a tool
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RemoteToolAnnotations {
    #[serde(rename = "readOnlyHint", default)]
    pub read_only_hint: Option<bool>,
    #[serde(rename = "destructiveHint", default)]
    pub destructive_hint: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ListToolsResult {
    #[serde(default)]
    tools: Vec<RemoteToolDefinition>,
    #[serde(rename = "nextCursor", default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallToolResult {
    #[serde(default)]
    content: Vec<ContentItem>,
    #[serde(rename = "structuredContent", default)]
    structured_content: Option<Value>,
    #[serde(rename = "isError", default)]
    is_error: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ContentItem {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: Option<String>,
}

/// An initialized session with one MCP server
pub struct McpClient {
    server: String,
    connection: Box<dyn McpConnection>,
    request_id: u64,
}

impl McpClient {
    pub fn new(server: impl Into<String>, connection: Box<dyn McpConnection>) -> Self {
        Self {
            server: server.into(),
            connection,
            request_id: 0,
        }
    }

    fn next_id(&mut self) -> u64 {
        self.request_id += 1;
        self.request_id
    }

    async fn send_request(&mut self, method: &str, params: Value) -> McpResult<Value> {
        let id = self.next_id();
        self.connection.request(id, method, params).await
    }

    /// Run the `initialize` handshake followed by `notifications/initialized`
    pub async fn initialize(&mut self) -> McpResult<Value> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION")
            }
        });
        let result = self.send_request("initialize", params).await?;
        debug!(server = %self.server, response = %result, "MCP initialize response");

        self.connection.notify("notifications/initialized", json!({})).await?;
        Ok(result)
    }

    /// List every tool, following pagination cursors
    pub async fn list_tools(&mut self) -> McpResult<Vec<RemoteToolDefinition>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = match &cursor {
                Some(cursor) => json!({ "cursor": cursor }),
                None => json!({}),
            };
            let result = self.send_request("tools/list", params).await?;
            let page: ListToolsResult = serde_json::from_value(result)?;
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if !next.is_empty() && cursor.as_deref() != Some(next.as_str()) => {
                    cursor = Some(next);
                }
                _ => break,
            }
        }

        debug!(server = %self.server, count = tools.len(), "MCP tools listed");
        Ok(tools)
    }

    /// Call a remote tool. Text content items are joined with newlines.
    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> McpResult<ToolResult> {
        let arguments = match arguments {
            Value::Null => json!({}),
            other => other,
        };
        let params = json!({ "name": name, "arguments": arguments });

        let result = match self.send_request("tools/call", params).await {
            Ok(result) => result,
            Err(McpError::Protocol(reason)) => {
                return Err(McpError::ToolExecutionFailed {
                    tool: name.to_string(),
                    reason,
                })
            }
            Err(err) => return Err(err),
        };

        let call_result: CallToolResult = serde_json::from_value(result.clone())?;
        let texts: Vec<String> = call_result
            .content
            .into_iter()
            .filter(|item| item.content_type == "text")
            .filter_map(|item| item.text)
            .collect();

        let content = if !texts.is_empty() {
            texts.join("\n")
        } else if let Some(structured) = call_result.structured_content {
            structured.to_string()
        } else {
            result.to_string()
        };

        Ok(ToolResult {
            content,
            is_error: call_result.is_error.unwrap_or(false),
        })
    }
}

/// Turn a JSON-RPC error into an `McpError`, recognising unknown-tool replies to `tools/call`
pub(crate) fn rpc_error(method: &str, params: &Value, error: JsonRpcError) -> McpError {
    if method == "tools/call" && error.code == INVALID_PARAMS {
        let lowered = error.message.to_lowercase();
        if lowered.contains("unknown tool") || lowered.contains("not found") {
            let tool = params
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return McpError::ToolNotFound(tool);
        }
    }
    McpError::Protocol(format!("[{}] {}", error.code, error.message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replays canned results and records what was sent
    struct ScriptedConnection {
        replies: VecDeque<McpResult<Value>>,
        sent: Arc<Mutex<Vec<(String, Value)>>>,
    }

    #[async_trait]
    impl McpConnection for ScriptedConnection {
        async fn request(&mut self, _id: u64, method: &str, params: Value) -> McpResult<Value> {
            self.sent.lock().unwrap().push((method.to_string(), params));
            self.replies
                .pop_front()
                .unwrap_or_else(|| Err(McpError::Protocol("no reply scripted".to_string())))
        }

        async fn notify(&mut self, method: &str, params: Value) -> McpResult<()> {
            self.sent.lock().unwrap().push((method.to_string(), params));
            Ok(())
        }
    }

    fn client(replies: Vec<McpResult<Value>>) -> (McpClient, Arc<Mutex<Vec<(String, Value)>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let connection = ScriptedConnection {
            replies: replies.into(),
            sent: sent.clone(),
        };
        (McpClient::new("test", Box::new(connection)), sent)
    }

    #[tokio::test]
    async fn test_initialize_sends_notification() {
        let (mut client, sent) = client(vec![Ok(json!({ "protocolVersion": PROTOCOL_VERSION }))]);
        client.initialize().await.unwrap();

        let sent = sent.lock().unwrap();
        assert_eq!(sent[0].0, "initialize");
        assert_eq!(sent[0].1["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(sent[1].0, "notifications/initialized");
    }

    #[tokio::test]
    async fn test_list_tools_follows_cursor() {
        let (mut client, sent) = client(vec![
            Ok(json!({ "tools": [{ "name": "a" }], "nextCursor": "p2" })),
            Ok(json!({ "tools": [{ "name": "b", "annotations": { "readOnlyHint": true } }] })),
        ]);
        let tools = client.list_tools().await.unwrap();

        assert_eq!(tools.len(), 2);
        assert_eq!(tools[1].annotations.unwrap().read_only_hint, Some(true));
        assert_eq!(sent.lock().unwrap()[1].1["cursor"], "p2");
    }

    #[tokio::test]
    async fn test_call_tool_joins_text_and_maps_error_flag() {
        let (mut client, sent) = client(vec![Ok(json!({
            "content": [
                { "type": "text", "text": "line 1" },
                { "type": "image", "data": "..." },
                { "type": "text", "text": "line 2" }
            ],
            "isError": true
        }))]);
        let result = client.call_tool("read", Value::Null).await.unwrap();

        assert_eq!(result.content, "line 1\nline 2");
        assert!(result.is_error);
        assert_eq!(sent.lock().unwrap()[0].1["arguments"], json!({}));
    }

    #[tokio::test]
    async fn test_call_tool_protocol_error_becomes_execution_failure() {
        let (mut client, _) = client(vec![Err(McpError::Protocol("[-32000] boom".to_string()))]);
        let err = client.call_tool("x", json!({})).await.unwrap_err();
        assert!(matches!(err, McpError::ToolExecutionFailed { tool, .. } if tool == "x"));
    }

    #[test]
    fn test_rpc_error_unknown_tool() {
        let error = JsonRpcError {
            code: INVALID_PARAMS,
            message: "Unknown tool: nope".to_string(),
        };
        let err = rpc_error("tools/call", &json!({ "name": "nope" }), error);
        assert_eq!(err, McpError::ToolNotFound("nope".to_string()));
    }

    #[test]
    fn test_answers_matches_id_and_skips_server_requests() {
        assert!(JsonRpcResponse::answers(&json!({ "id": 3, "result": {} }), 3));
        assert!(!JsonRpcResponse::answers(&json!({ "id": 4, "result": {} }), 3));
        assert!(!JsonRpcResponse::answers(&json!({ "id": 3, "method": "ping" }), 3));
    }
}
