//! Backend adapter interface
//!
//! Each LLM provider implements [`LlmProvider`] once. The agent loop never builds provider HTTP
//! bodies itself: it hands a [`StepRequest`] with already-adapted schemas to `execute_step` and
//! interprets the returned [`ModelTurn`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agents::domain::{Message, ToolCall};
use crate::agents::error::BackendError;
use crate::schema::{Backend, Schema};

/// Trait for LLM backends
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Which schema dialect this provider accepts
    fn backend(&self) -> Backend;

    /// Run one model turn
    async fn execute_step(&self, request: StepRequest) -> Result<ModelTurn, BackendError>;
}

/// Input of a single backend call
#[derive(Debug, Clone, Serialize)]
pub struct StepRequest {
    /// Conversation so far
    pub messages: Vec<Message>,
    /// Model to use
    pub model: String,
    /// System prompt, including any instructions for constraints the backend cannot enforce
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Tools available for calling, with backend-adapted input schemas
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    /// Tool choice mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    /// Backend-adapted output schema
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Schema>,
}

/// Definition of a tool as sent to a backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Schema,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Schema) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Tool choice mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// Let the model decide
    Auto,
    /// Don't use tools
    None,
    /// Must use a tool
    Required,
    /// Use a specific tool
    Tool { name: String },
}

/// One backend response
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelTurn {
    /// Text blocks in order
    #[serde(default)]
    pub text_parts: Vec<String>,
    /// Requested tool calls in order
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    pub stop_reason: StopReason,
    /// Native structured output, for backends that return it separately from text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_output: Option<Value>,
}

impl ModelTurn {
    /// A turn with a single text block
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text_parts: vec![text.into()],
            stop_reason: StopReason::EndTurn,
            ..Default::default()
        }
    }

    /// A turn requesting tool calls
    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: calls,
            stop_reason: StopReason::ToolUse,
            ..Default::default()
        }
    }

    /// A turn carrying a native structured payload
    pub fn structured(output: Value) -> Self {
        Self {
            stop_reason: StopReason::EndTurn,
            structured_output: Some(output),
            ..Default::default()
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// All text blocks joined
    pub fn joined_text(&self) -> String {
        self.text_parts.join("")
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Reason the turn stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural stop
    #[default]
    EndTurn,
    /// Hit max tokens
    MaxTokens,
    /// Tool call requested
    ToolUse,
    /// Stop sequence matched
    StopSequence,
    /// Content filtered
    ContentFilter,
}

/// Token usage information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    /// Accumulate another turn's usage
    pub fn add(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}
