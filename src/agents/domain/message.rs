//! Message and conversation types

use serde::{Deserialize, Serialize};

use super::{ToolCall, ToolResult};

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User message (including tool results)
    User,
    /// Assistant (LLM) message
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One content block inside a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    /// Plain text
    Text { text: String },
    /// A tool invocation requested by the assistant
    ToolUse {
        id: String,
        name: String,
        arguments_json: String,
    },
    /// The outcome of a tool invocation
    ToolResult {
        tool_call_id: String,
        name: String,
        content: String,
        is_error: bool,
    },
}

/// A message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Ordered content blocks
    pub contents: Vec<MessageContent>,
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            contents: vec![MessageContent::Text { text: content.into() }],
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            contents: vec![MessageContent::Text { text: content.into() }],
        }
    }

    /// Create an assistant message with text parts followed by tool calls
    pub fn assistant_with_tools(text_parts: &[String], tool_calls: &[ToolCall]) -> Self {
        let mut contents: Vec<MessageContent> = text_parts
            .iter()
            .filter(|text| !text.is_empty())
            .map(|text| MessageContent::Text { text: text.clone() })
            .collect();
        contents.extend(tool_calls.iter().map(|call| MessageContent::ToolUse {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments_json: call.arguments_json.clone(),
        }));
        Self {
            role: Role::Assistant,
            contents,
        }
    }

    /// Create a user message carrying tool results
    pub fn tool_results(results: Vec<MessageContent>) -> Self {
        Self {
            role: Role::User,
            contents: results,
        }
    }

    /// Build a tool result content block
    pub fn tool_result_content(call: &ToolCall, result: &ToolResult) -> MessageContent {
        MessageContent::ToolResult {
            tool_call_id: call.id.clone(),
            name: call.name.clone(),
            content: result.content.clone(),
            is_error: result.is_error,
        }
    }

    /// Concatenated text blocks
    pub fn text(&self) -> String {
        self.contents
            .iter()
            .filter_map(|content| match content {
                MessageContent::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Tool calls requested in this message
    pub fn tool_uses(&self) -> Vec<ToolCall> {
        self.contents
            .iter()
            .filter_map(|content| match content {
                MessageContent::ToolUse {
                    id,
                    name,
                    arguments_json,
                } => Some(ToolCall::new(id.clone(), name.clone(), arguments_json.clone())),
                _ => None,
            })
            .collect()
    }
}
