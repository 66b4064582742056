use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use super::{rpc_error, JsonRpcRequest, JsonRpcResponse, McpConnection};
use crate::agents::error::{McpError, McpResult};

type Reader = Box<dyn AsyncRead + Unpin + Send>;
type Writer = Box<dyn AsyncWrite + Unpin + Send>;

/// Line-delimited JSON-RPC over a pair of byte streams, usually a child process's stdio
pub struct StdioConnection {
    server: String,
    writer: Writer,
    reader: BufReader<Reader>,
    timeout: Duration,
    // Held so the process lives as long as the connection; killed on drop.
    _child: Option<Child>,
}

impl StdioConnection {
    /// Wrap existing streams
    pub fn new<R, W>(server: impl Into<String>, reader: R, writer: W, timeout: Duration) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        Self {
            server: server.into(),
            writer: Box::new(writer),
            reader: BufReader::new(Box::new(reader) as Reader),
            timeout,
            _child: None,
        }
    }

    /// Spawn `command` with piped stdin/stdout
    pub fn spawn(
        server: &str,
        command: &str,
        args: &[String],
        env: &BTreeMap<String, String>,
        timeout: Duration,
    ) -> McpResult<Self> {
        info!(server = %server, command = %command, "Spawning MCP server");

        let mut cmd = Command::new(command);
        cmd.args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let connection_failed = |reason: String| McpError::ConnectionFailed {
            server: server.to_string(),
            reason,
        };

        let mut child = cmd
            .spawn()
            .map_err(|e| connection_failed(format!("failed to spawn '{}': {}", command, e)))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| connection_failed("failed to capture server stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| connection_failed("failed to capture server stdout".to_string()))?;

        let mut connection = Self::new(server, stdout, stdin, timeout);
        connection._child = Some(child);
        Ok(connection)
    }

    async fn write_message(&mut self, message: &impl serde::Serialize) -> McpResult<()> {
        let mut line = serde_json::to_string(message)?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Read until the response to `id` arrives, skipping noise and answering server pings
    async fn read_response(&mut self, id: u64) -> McpResult<Value> {
        let mut buffer = Vec::new();
        loop {
            buffer.clear();
            if self.reader.read_until(b'\n', &mut buffer).await? == 0 {
                return Err(McpError::ConnectionFailed {
                    server: self.server.clone(),
                    reason: "server closed its output".to_string(),
                });
            }

            let Ok(line) = std::str::from_utf8(&buffer) else {
                debug!(server = %self.server, bytes = buffer.len(), "Skipping non-UTF-8 line from MCP server");
                continue;
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let message: Value = match serde_json::from_str(trimmed) {
                Ok(message) => message,
                Err(_) => {
                    debug!(server = %self.server, line = %trimmed, "Skipping non-JSON line from MCP server");
                    continue;
                }
            };

            if JsonRpcResponse::answers(&message, id) {
                return Ok(message);
            }
            if let (Some(request_id), Some(method)) = (message.get("id"), message.get("method")) {
                self.answer_server_request(request_id.clone(), method.as_str().unwrap_or_default())
                    .await?;
            }
        }
    }

    async fn answer_server_request(&mut self, id: Value, method: &str) -> McpResult<()> {
        let reply = if method == "ping" {
            json!({ "jsonrpc": "2.0", "id": id, "result": {} })
        } else {
            warn!(server = %self.server, method = %method, "Unsupported request from MCP server");
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32601, "message": format!("Method not found: {}", method) }
            })
        };
        self.write_message(&reply).await
    }
}

#[async_trait]
impl McpConnection for StdioConnection {
    async fn request(&mut self, id: u64, method: &str, params: Value) -> McpResult<Value> {
        let request = JsonRpcRequest::request(id, method, params);
        self.write_message(&request).await?;

        let timeout = self.timeout;
        let message = tokio::time::timeout(timeout, self.read_response(id))
            .await
            .map_err(|_| {
                McpError::Protocol(format!(
                    "'{}' to MCP server '{}' timed out after {:?}",
                    method, self.server, timeout
                ))
            })??;

        let response: JsonRpcResponse = serde_json::from_value(message)?;
        response
            .into_result()
            .map_err(|error| rpc_error(method, &request.params, error))
    }

    async fn notify(&mut self, method: &str, params: Value) -> McpResult<()> {
        self.write_message(&JsonRpcRequest::notification(method, params)).await
    }
}
