use async_trait::async_trait;
use serde::Deserialize;

use super::Tool;
use crate::agents::domain::ToolResult;
use crate::agents::error::ToolError;
use crate::schema::Schema;

/// Name the scheduler recognises as the ask-user convention
pub const ASK_USER_TOOL_NAME: &str = "ask_user";

/// Lets the model pause the run and ask the user a question.
///
/// The scheduler never calls [`Tool::execute`] on it: a call to `ask_user` emits the question and
/// pauses until the session receives a reply.
#[derive(Debug, Clone, Copy, Default)]
pub struct AskUserTool;

#[derive(Deserialize)]
struct AskUserArgs {
    question: String,
}

impl AskUserTool {
    /// Extract the question from the call arguments
    pub fn question(arguments_json: &str) -> Result<String, ToolError> {
        let args: AskUserArgs = serde_json::from_str(arguments_json)?;
        Ok(args.question)
    }
}

#[async_trait]
impl Tool for AskUserTool {
    fn name(&self) -> &str {
        ASK_USER_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Ask the user a question and wait for their answer. Use this when you need information only the user can provide."
    }

    fn input_schema(&self) -> Schema {
        Schema::object().with_property(
            "question",
            Schema::string().with_description("The question to ask the user"),
            true,
        )
    }

    async fn execute(&self, _arguments_json: &str) -> Result<ToolResult, ToolError> {
        Err(ToolError::Failed(
            "ask_user is answered by the user through the session".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_parsing() {
        assert_eq!(
            AskUserTool::question(r#"{"question":"Which city?"}"#).unwrap(),
            "Which city?"
        );
        assert!(AskUserTool::question("{}").is_err());
    }
}
