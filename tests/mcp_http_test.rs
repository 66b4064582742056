mod common;

use agentrail::agents::{AgentConfig, AgentError, AgentScheduler, AgentStep, McpError, ModelTurn, ToolSet};
use agentrail::mcp::{
    resolving_mcp_servers, McpAuthorization, McpServer, McpToolPreset, McpToolSelection, McpTransport,
};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use common::{call, tool_turn, weather_tool, ScriptedProvider};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const TOKEN: &str = "test-token";
const SESSION_ID: &str = "session-42";

#[derive(Default)]
struct ServerState {
    tool_calls: AtomicUsize,
    initializations: AtomicUsize,
}

async fn handle_mcp(State(state): State<Arc<ServerState>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", TOKEN));
    if !authorized {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let method = body["method"].as_str().unwrap_or_default().to_string();
    let id = body.get("id").cloned();

    if method != "initialize" {
        let session = headers.get("mcp-session-id").and_then(|v| v.to_str().ok());
        if session != Some(SESSION_ID) {
            return (StatusCode::BAD_REQUEST, "missing session").into_response();
        }
    }

    let Some(id) = id else {
        return StatusCode::ACCEPTED.into_response();
    };

    match method.as_str() {
        "initialize" => {
            state.initializations.fetch_add(1, Ordering::SeqCst);
            let result = json!({
                "protocolVersion": "2024-11-05",
                "capabilities": { "tools": {} },
                "serverInfo": { "name": "forecast", "version": "1.0.0" }
            });
            (
                [("mcp-session-id", SESSION_ID)],
                Json(json!({ "jsonrpc": "2.0", "id": id, "result": result })),
            )
                .into_response()
        }
        "tools/list" => Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {
                "tools": [
                    {
                        "name": "get_forecast",
                        "description": "Get the forecast for a city",
                        "inputSchema": {
                            "type": "object",
                            "properties": { "city": { "type": "string", "minLength": 1 } },
                            "required": ["city"]
                        }
                    },
                    {
                        "name": "delete_forecast",
                        "description": "Delete a stored forecast",
                        "inputSchema": { "type": "object" }
                    }
                ]
            }
        }))
        .into_response(),
        "tools/call" => {
            state.tool_calls.fetch_add(1, Ordering::SeqCst);
            let name = body["params"]["name"].as_str().unwrap_or_default();
            if name != "get_forecast" {
                return Json(json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": { "code": -32602, "message": format!("Unknown tool: {}", name) }
                }))
                .into_response();
            }
            let city = body["params"]["arguments"]["city"].as_str().unwrap_or("?");
            // answered as an event stream, like streamable HTTP servers do
            let payload = json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "content": [
                        { "type": "text", "text": format!("Forecast for {}:", city) },
                        { "type": "text", "text": "rain" }
                    ],
                    "isError": false
                }
            });
            (
                [("content-type", "text/event-stream")],
                format!("event: message\ndata: {}\n\n", payload),
            )
                .into_response()
        }
        _ => Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -32601, "message": "Method not found" }
        }))
        .into_response(),
    }
}

async fn spawn_server() -> (String, Arc<ServerState>) {
    let state = Arc::new(ServerState::default());
    let app = Router::new().route("/mcp", post(handle_mcp)).with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/mcp", addr), state)
}

fn forecast_server(url: &str) -> McpServer {
    McpServer::new("forecast", McpTransport::http(url)).with_authorization(McpAuthorization::bearer(TOKEN))
}

#[tokio::test]
async fn test_resolve_and_call_remote_tool() {
    let (url, state) = spawn_server().await;
    let server = forecast_server(&url).with_name_prefix("forecast_");
    let tools = ToolSet::builder().tool(weather_tool()).mcp_server(server).build();
    assert!(tools.has_unresolved_placeholders());

    let resolved = resolving_mcp_servers(tools).await.unwrap();
    assert_eq!(
        resolved.names(),
        vec!["get_weather", "forecast_get_forecast", "forecast_delete_forecast"]
    );

    let remote = resolved.get("forecast_get_forecast").unwrap();
    assert_eq!(remote.input_schema().properties["city"].min_length, Some(1));

    let result = remote.execute(r#"{"city":"Oslo"}"#).await.unwrap();
    assert_eq!(result.content, "Forecast for Oslo:\nrain");
    assert!(!result.is_error);

    // one connection for discovery, one for the call
    assert_eq!(state.initializations.load(Ordering::SeqCst), 2);
    assert_eq!(state.tool_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_read_only_preset_filters_tools() {
    let (url, _) = spawn_server().await;
    let server = forecast_server(&url).with_selection(McpToolSelection::Preset(McpToolPreset::ReadOnly));

    let resolved = resolving_mcp_servers(ToolSet::builder().mcp_server(server).build())
        .await
        .unwrap();

    assert_eq!(resolved.names(), vec!["get_forecast"]);
}

#[tokio::test]
async fn test_wrong_token_fails_resolution() {
    let (url, _) = spawn_server().await;
    let server = McpServer::new("forecast", McpTransport::http(url))
        .with_authorization(McpAuthorization::bearer("wrong"));

    let err = resolving_mcp_servers(ToolSet::builder().mcp_server(server).build())
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::Mcp(McpError::ConnectionFailed { .. })));
}

#[tokio::test]
async fn test_unknown_remote_tool() {
    let (url, _) = spawn_server().await;
    let server = forecast_server(&url);

    let err = server.execute_tool("get_tides", "{}").await.unwrap_err();

    assert_eq!(err, McpError::ToolNotFound("get_tides".to_string()));
}

#[tokio::test]
async fn test_agent_loop_uses_remote_tool() {
    let (url, _) = spawn_server().await;
    let tools = resolving_mcp_servers(ToolSet::builder().mcp_server(forecast_server(&url)).build())
        .await
        .unwrap();
    let provider = ScriptedProvider::new(vec![
        tool_turn(vec![call("c1", "get_forecast", json!({ "city": "Bergen" }))]),
        ModelTurn::text("Bring an umbrella."),
    ]);
    let scheduler = AgentScheduler::new(provider.clone(), AgentConfig::new("m"));
    let run = scheduler.new_run().with_prompt("Weather in Bergen?").with_tools(tools);

    let (steps, report) = scheduler.run::<Value>(run).collect().await;

    assert!(report.outcome.is_completed());
    let result = steps
        .iter()
        .find_map(|s| match s {
            AgentStep::ToolResult(r) => Some(r.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(result.content, "Forecast for Bergen:\nrain");

    let definition = &provider.requests()[0].tools[0];
    assert_eq!(definition.name, "get_forecast");
    assert!(definition.description.starts_with("Get the forecast for a city"));
}
