use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{rpc_error, JsonRpcRequest, JsonRpcResponse, McpConnection};
use crate::agents::error::{McpError, McpResult};

const SESSION_HEADER: &str = "Mcp-Session-Id";

/// JSON-RPC over HTTP POST. Responses may be plain JSON or an SSE stream.
pub struct HttpConnection {
    server: String,
    url: String,
    client: Client,
    headers: Vec<(String, String)>,
    session_id: Option<String>,
}

impl HttpConnection {
    /// `headers` are added to every request (authorization and custom headers)
    pub fn new(
        server: impl Into<String>,
        url: impl Into<String>,
        headers: Vec<(String, String)>,
        timeout: Duration,
    ) -> McpResult<Self> {
        let server = server.into();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| McpError::ConnectionFailed {
                server: server.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            server,
            url: url.into(),
            client,
            headers,
            session_id: None,
        })
    }

    async fn post(&mut self, body: &JsonRpcRequest<'_>) -> McpResult<Response> {
        let mut request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json, text/event-stream")
            .json(body);

        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(session_id) = &self.session_id {
            request = request.header(SESSION_HEADER, session_id.as_str());
        }

        let response = request.send().await.map_err(|e| McpError::ConnectionFailed {
            server: self.server.clone(),
            reason: e.to_string(),
        })?;

        if let Some(session_id) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            self.session_id = Some(session_id.to_string());
        }

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(McpError::ConnectionFailed {
                server: self.server.clone(),
                reason: format!("HTTP {}", status),
            });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(McpError::Protocol(format!(
                "MCP server {} returned error {}: {}",
                self.server, status, text
            )));
        }

        Ok(response)
    }
}

/// Find the response to `id` in a response body, either JSON (object or batch) or SSE
pub(crate) fn find_response(body: &str, is_event_stream: bool, id: u64) -> Option<Value> {
    let candidates: Vec<Value> = if is_event_stream {
        sse_payloads(body)
            .iter()
            .filter_map(|data| serde_json::from_str(data).ok())
            .collect()
    } else {
        match serde_json::from_str::<Value>(body.trim()).ok()? {
            Value::Array(items) => items,
            single => vec![single],
        }
    };

    candidates
        .into_iter()
        .find(|message| JsonRpcResponse::answers(message, id))
}

/// `data:` payloads of each event in an SSE body
fn sse_payloads(body: &str) -> Vec<String> {
    let mut events = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in body.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            if !current.is_empty() {
                events.push(current.join("\n"));
                current.clear();
            }
        } else if let Some(data) = line.strip_prefix("data:") {
            current.push(data.strip_prefix(' ').unwrap_or(data));
        }
    }
    if !current.is_empty() {
        events.push(current.join("\n"));
    }
    events
}

#[async_trait]
impl McpConnection for HttpConnection {
    async fn request(&mut self, id: u64, method: &str, params: Value) -> McpResult<Value> {
        let request = JsonRpcRequest::request(id, method, params);
        let response = self.post(&request).await?;

        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/event-stream"));
        let body = response
            .text()
            .await
            .map_err(|e| McpError::Protocol(format!("failed to read response body: {}", e)))?;

        let message = find_response(&body, is_event_stream, id).ok_or_else(|| {
            McpError::Protocol(format!(
                "no response to '{}' from MCP server {}",
                method, self.server
            ))
        })?;
        debug!(server = %self.server, method = %method, "MCP response received");

        let response: JsonRpcResponse = serde_json::from_value(message)?;
        response
            .into_result()
            .map_err(|error| rpc_error(method, &request.params, error))
    }

    async fn notify(&mut self, method: &str, params: Value) -> McpResult<()> {
        self.post(&JsonRpcRequest::notification(method, params)).await?;
        Ok(())
    }
}
