//! Agent loop for tool-using LLM backends
//!
//! ## Architecture
//!
//! - `domain/` - Messages, tool calls, steps and run outcomes
//! - `llm/` - The backend interface (`LlmProvider`) and its turn types
//! - `tool` - The `Tool` trait and `ToolSet`
//! - `state` - Per-run step counter and tool-call history
//! - `core/` - The step scheduler and the conversational session

pub mod config;
pub mod core;
pub mod domain;
pub mod error;
pub mod llm;
pub mod state;
pub mod tool;

// Re-export commonly used types
pub use self::core::{AgentOutput, AgentRun, AgentScheduler, ConversationalSession, SessionControl};
pub use config::AgentConfig;
pub use domain::*;
pub use error::*;
pub use llm::{LlmProvider, ModelTurn, StepRequest, StopReason, TokenUsage, ToolChoice, ToolDefinition};
pub use state::{AgentLoopState, LoopStateSnapshot};
pub use tool::{AskUserTool, FnTool, Tool, ToolSet, ToolSetBuilder, ASK_USER_TOOL_NAME};
