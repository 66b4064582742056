//! Configuration types for the agent loop

use serde::{Deserialize, Serialize};

use super::llm::ToolChoice;

/// Per-run settings for the scheduler
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentConfig {
    /// Model identifier passed through to the backend
    pub model: String,
    /// Base system prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Maximum backend calls per run
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    /// Abort once the same tool call (name and arguments) repeats this many times in a row
    #[serde(default = "default_max_consecutive_tool_calls")]
    pub max_consecutive_tool_calls: usize,
    /// Tool choice forwarded to the backend when tools are present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
}

pub(crate) fn default_max_steps() -> u32 {
    10
}

pub(crate) fn default_max_consecutive_tool_calls() -> usize {
    3
}

impl AgentConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: None,
            max_steps: default_max_steps(),
            max_consecutive_tool_calls: default_max_consecutive_tool_calls(),
            tool_choice: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_max_consecutive_tool_calls(mut self, max: usize) -> Self {
        self.max_consecutive_tool_calls = max;
        self
    }

    pub fn with_tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = Some(choice);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_deserializing() {
        let config: AgentConfig = serde_json::from_str(r#"{"model":"m"}"#).unwrap();
        assert_eq!(config.max_steps, 10);
        assert_eq!(config.max_consecutive_tool_calls, 3);
        assert!(config.system_prompt.is_none());
    }
}
