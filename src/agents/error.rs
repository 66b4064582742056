//! Error types for the agent loop

use thiserror::Error;

/// Errors that end an agent run
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AgentError {
    /// Step budget exhausted
    #[error("Step limit of {max_steps} exceeded")]
    StepLimitExceeded { max_steps: u32 },

    /// Backend adapter error, surfaced verbatim
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// MCP error outside of a tool call (connection, discovery)
    #[error("MCP error: {0}")]
    Mcp(#[from] McpError),

    /// Tool execution error
    #[error("Tool '{tool}' failed: {cause}")]
    ToolExecutionFailed { tool: String, cause: String },

    /// The same tool call repeated too many times in a row
    #[error("Tool '{tool}' was called {repeats} times in a row with the same arguments")]
    LoopDetected { tool: String, repeats: usize },

    /// An MCP placeholder reached the scheduler without being resolved
    #[error("MCP server '{0}' has not been resolved into tools")]
    UnresolvedPlaceholder(String),

    /// Two tools share a name
    #[error("Duplicate tool name: {0}")]
    DuplicateToolName(String),

    /// Operation not valid in the current phase
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Final output did not match the requested schema
    #[error("Output validation error: {0}")]
    OutputValidation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Cancelled by the caller
    #[error("Operation was cancelled")]
    Cancelled,
}

/// Errors reported by a backend adapter
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Rate limited")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Server error: {code} - {message}")]
    ServerError { code: u16, message: String },

    #[error("Failed to decode response: {0}")]
    DecodingFailed(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Errors from the MCP bridge
#[derive(Debug, Clone, PartialEq, Error)]
pub enum McpError {
    /// A placeholder tool was executed instead of being resolved first
    #[error("MCP server placeholder '{0}' cannot execute tools; resolve the tool set first")]
    PlaceholderCannotExecute(String),

    #[error("Failed to connect to MCP server '{server}': {reason}")]
    ConnectionFailed { server: String, reason: String },

    #[error("Failed to fetch tools from MCP server '{server}': {reason}")]
    ToolFetchFailed { server: String, reason: String },

    #[error("MCP tool '{tool}' failed: {reason}")]
    ToolExecutionFailed { tool: String, reason: String },

    #[error("MCP tool not found: {0}")]
    ToolNotFound(String),

    #[error("MCP protocol error: {0}")]
    Protocol(String),
}

/// Errors returned by a tool body. They are fed back to the model rather than ending the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Mcp(#[from] McpError),

    #[error("Tool execution was cancelled")]
    Cancelled,
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        ToolError::InvalidArguments(err.to_string())
    }
}

impl From<serde_json::Error> for McpError {
    fn from(err: serde_json::Error) -> Self {
        McpError::Protocol(format!("invalid JSON: {}", err))
    }
}

impl From<std::io::Error> for McpError {
    fn from(err: std::io::Error) -> Self {
        McpError::Protocol(format!("IO error: {}", err))
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::DecodingFailed(err.to_string())
        } else if let Some(status) = err.status() {
            match status.as_u16() {
                401 | 403 => BackendError::Unauthorized,
                404 => BackendError::ModelNotFound(err.to_string()),
                429 => BackendError::RateLimited { retry_after_ms: None },
                400..=499 => BackendError::InvalidRequest(err.to_string()),
                code => BackendError::ServerError {
                    code,
                    message: err.to_string(),
                },
            }
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

/// Result type alias for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Result type alias for MCP operations
pub type McpResult<T> = Result<T, McpError>;
