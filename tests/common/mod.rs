#![allow(dead_code)]

use agentrail::agents::{
    BackendError, FnTool, LlmProvider, ModelTurn, StepRequest, ToolCall, ToolResult,
};
use agentrail::schema::{Backend, Schema};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Backend that replays a fixed list of turns and records every request
pub struct ScriptedProvider {
    backend: Backend,
    turns: Mutex<VecDeque<Result<ModelTurn, BackendError>>>,
    requests: Mutex<Vec<StepRequest>>,
}

impl ScriptedProvider {
    pub fn new(turns: Vec<ModelTurn>) -> Arc<Self> {
        Self::with_results(Backend::Anthropic, turns.into_iter().map(Ok).collect())
    }

    pub fn with_results(backend: Backend, turns: Vec<Result<ModelTurn, BackendError>>) -> Arc<Self> {
        Arc::new(Self {
            backend,
            turns: Mutex::new(turns.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<StepRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn backend(&self) -> Backend {
        self.backend
    }

    async fn execute_step(&self, request: StepRequest) -> Result<ModelTurn, BackendError> {
        self.requests.lock().unwrap().push(request);
        self.turns
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::InvalidRequest("script exhausted".to_string())))
    }
}

pub fn call(id: &str, name: &str, arguments: serde_json::Value) -> ToolCall {
    ToolCall::new(id, name, arguments.to_string())
}

pub fn tool_turn(calls: Vec<ToolCall>) -> ModelTurn {
    ModelTurn::tool_calls(calls)
}

/// `get_weather(city)` answering "Sunny in <city>"
pub fn weather_tool() -> FnTool {
    FnTool::new(
        "get_weather",
        "Current weather for a city",
        Schema::object().with_property("city", Schema::string(), true),
        |args| async move {
            let city = args["city"].as_str().unwrap_or("nowhere").to_string();
            Ok(ToolResult::success(format!("Sunny in {}", city)))
        },
    )
}

/// A tool that signals `started` and then never finishes
pub fn hanging_tool(started: Arc<Notify>) -> FnTool {
    FnTool::new("slow_search", "Never returns", Schema::object(), move |_| {
        let started = started.clone();
        async move {
            started.notify_one();
            futures::future::pending::<()>().await;
            Ok(ToolResult::success("unreachable"))
        }
    })
}

pub fn person_schema() -> Schema {
    Schema::object()
        .with_property("name", Schema::string(), true)
        .with_property("age", Schema::integer(), true)
        .with_additional_properties(false)
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct Person {
    pub name: String,
    pub age: i64,
}

/// `name` is required, `nickname` is optional
pub fn contact_schema() -> Schema {
    Schema::object()
        .with_property("name", Schema::string(), true)
        .with_property("nickname", Schema::string(), false)
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct Contact {
    pub name: String,
    pub nickname: Option<String>,
}
