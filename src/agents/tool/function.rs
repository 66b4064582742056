use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use super::Tool;
use crate::agents::domain::ToolResult;
use crate::agents::error::ToolError;
use crate::schema::Schema;

type Handler = dyn Fn(Value) -> BoxFuture<'static, Result<ToolResult, ToolError>> + Send + Sync;

/// A tool backed by an async closure over the parsed arguments
#[derive(Clone)]
pub struct FnTool {
    name: String,
    description: String,
    input_schema: Schema,
    handler: Arc<Handler>,
}

impl FnTool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Schema,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResult, ToolError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Schema {
        self.input_schema.clone()
    }

    async fn execute(&self, arguments_json: &str) -> Result<ToolResult, ToolError> {
        let args = if arguments_json.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(arguments_json)?
        };
        (self.handler)(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_json_is_invalid_arguments() {
        let tool = FnTool::new("t", "", Schema::object(), |_| async { Ok(ToolResult::success("ok")) });
        let err = tool.execute("{not json").await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn test_handler_error_is_returned() {
        let tool = FnTool::new("t", "", Schema::object(), |_| async {
            Err(ToolError::Failed("boom".to_string()))
        });
        assert_eq!(tool.execute("{}").await.unwrap_err().to_string(), "boom");
    }
}
