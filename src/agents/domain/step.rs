//! Step, phase and outcome types emitted by a running agent

use serde::Serialize;

use super::{ToolCall, ToolResult};
use crate::agents::error::AgentError;
use crate::agents::llm::{ModelTurn, TokenUsage};

/// One event of a running agent loop, in emission order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum AgentStep<O> {
    /// The backend returned a turn
    Thinking(ModelTurn),
    /// A tool call is about to run
    ToolCall(ToolCall),
    /// A tool call finished
    ToolResult(ToolResult),
    /// An injected message was picked up by the loop
    Interrupted(String),
    /// The model asked the user a question
    AskingUser(String),
    /// The loop paused until the user replies
    AwaitingUserInput(String),
    /// Plain text answer when no output schema was requested
    TextResponse(String),
    /// Typed answer matching the output schema
    FinalResponse(O),
}

impl<O> AgentStep<O> {
    /// Short name of the step kind, used in logs and tests
    pub fn kind(&self) -> &'static str {
        match self {
            AgentStep::Thinking(_) => "thinking",
            AgentStep::ToolCall(_) => "tool_call",
            AgentStep::ToolResult(_) => "tool_result",
            AgentStep::Interrupted(_) => "interrupted",
            AgentStep::AskingUser(_) => "asking_user",
            AgentStep::AwaitingUserInput(_) => "awaiting_user_input",
            AgentStep::TextResponse(_) => "text_response",
            AgentStep::FinalResponse(_) => "final_response",
        }
    }
}

/// Session-level view of where a conversation stands
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionPhase<O> {
    #[default]
    Idle,
    Running(AgentStep<O>),
    AwaitingUserInput(String),
    /// Stopped by the caller; history is kept and the run can be resumed
    Paused,
    Completed(Option<O>),
    Failed(String),
}

impl<O> SessionPhase<O> {
    pub fn is_running(&self) -> bool {
        matches!(self, SessionPhase::Running(_))
    }

    pub fn is_awaiting_input(&self) -> bool {
        matches!(self, SessionPhase::AwaitingUserInput(_))
    }
}

/// How a scheduler run ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome<O> {
    /// Final answer reached. `output` is set when an output schema was requested.
    Completed { output: Option<O>, text: Option<String> },
    /// Paused on the ask-user tool
    AwaitingUserInput { question: String, tool_call_id: String },
    Failed(AgentError),
    /// Stopped through the cancellation token; distinct from `Failed`
    Cancelled,
}

impl<O> RunOutcome<O> {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunOutcome::Cancelled)
    }

    /// Typed output of a completed run
    pub fn output(&self) -> Option<&O> {
        match self {
            RunOutcome::Completed { output, .. } => output.as_ref(),
            _ => None,
        }
    }

    /// Error of a failed run
    pub fn error(&self) -> Option<&AgentError> {
        match self {
            RunOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Outcome plus accounting for one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport<O> {
    pub outcome: RunOutcome<O>,
    /// Steps consumed from the budget
    pub steps: u32,
    /// Usage summed across all turns that reported it
    pub usage: TokenUsage,
}
