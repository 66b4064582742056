//! Agent step scheduler
//!
//! Drives one backend call per iteration, runs the tools the model asks for, and stops on a typed
//! final answer, an error, a pending question for the user, or cancellation.
//!
//! A turn is committed to the run as a whole: the assistant message, the tool results and the
//! tool-call records are only written after the last tool of the turn has finished. A run that is
//! cancelled mid-turn therefore leaves the history exactly as it was before the turn started.

use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::AgentOutput;
use crate::agents::config::AgentConfig;
use crate::agents::domain::{
    AgentStep, AgentStream, Message, MessageContent, Role, RunOutcome, RunReport, StepSender,
    ToolCall, ToolCallRecord, ToolResult, STEP_BUFFER,
};
use crate::agents::error::{AgentError, AgentResult, ToolError};
use crate::agents::llm::{LlmProvider, ModelTurn, StepRequest, TokenUsage, ToolDefinition};
use crate::agents::state::AgentLoopState;
use crate::agents::tool::{AskUserTool, ToolSet, ASK_USER_TOOL_NAME};
use crate::schema::instructions::append_to_prompt;
use crate::schema::{validation, Schema, SchemaAdapter};

const SKIPPED_FOR_USER_INPUT: &str = "Not executed: waiting for the user's answer to a question.";

/// Messages injected into a running loop, picked up at the top of the next iteration
#[derive(Debug, Clone, Default)]
pub struct InterruptQueue {
    inner: Arc<Mutex<VecDeque<String>>>,
}

impl InterruptQueue {
    pub fn push(&self, message: impl Into<String>) {
        self.lock().push_back(message.into());
    }

    pub fn drain(&self) -> Vec<String> {
        self.lock().drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<String>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// The question a paused run is waiting on
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUserInput {
    pub question: String,
    pub tool_call: ToolCall,
    before: Vec<MessageContent>,
    after: Vec<MessageContent>,
}

impl PendingUserInput {
    /// The user message that answers the question, with the other results of that turn
    pub fn answer(self, answer: impl Into<String>) -> Message {
        let mut contents = self.before;
        contents.push(Message::tool_result_content(
            &self.tool_call,
            &ToolResult::success(answer),
        ));
        contents.extend(self.after);
        Message::tool_results(contents)
    }
}

/// Everything one run owns: history, tools, loop state and cancellation
#[derive(Debug)]
pub struct AgentRun {
    pub messages: Vec<Message>,
    pub tools: ToolSet,
    /// Canonical output schema; the final payload is validated against it
    pub output_schema: Option<Schema>,
    pub state: AgentLoopState,
    pub cancel: CancellationToken,
    pub interrupts: InterruptQueue,
    pub(crate) pending_input: Option<PendingUserInput>,
}

impl AgentRun {
    pub fn new(max_steps: u32) -> Self {
        Self {
            messages: Vec::new(),
            tools: ToolSet::empty(),
            output_schema: None,
            state: AgentLoopState::new(max_steps),
            cancel: CancellationToken::new(),
            interrupts: InterruptQueue::default(),
            pending_input: None,
        }
    }

    /// Append a user prompt
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.messages.push(Message::user(prompt));
        self
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_tools(mut self, tools: ToolSet) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_output_schema(mut self, schema: Schema) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Question the run is paused on, if any
    pub fn pending_input(&self) -> Option<&PendingUserInput> {
        self.pending_input.as_ref()
    }

    pub(crate) fn take_pending_input(&mut self) -> Option<PendingUserInput> {
        self.pending_input.take()
    }
}

/// Append text as a user turn, merging into a trailing user message
pub(crate) fn push_user_text(messages: &mut Vec<Message>, text: impl Into<String>) {
    let text = text.into();
    match messages.last_mut() {
        Some(last) if last.role == Role::User => last.contents.push(MessageContent::Text { text }),
        _ => messages.push(Message::user(text)),
    }
}

enum ToolPhase {
    Committed,
    AwaitingUser { question: String, tool_call_id: String },
    Cancelled,
}

/// Drives agent runs against one backend
#[derive(Clone)]
pub struct AgentScheduler {
    provider: Arc<dyn LlmProvider>,
    config: AgentConfig,
}

impl AgentScheduler {
    pub fn new(provider: Arc<dyn LlmProvider>, config: AgentConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// A fresh run with this scheduler's step budget
    pub fn new_run(&self) -> AgentRun {
        AgentRun::new(self.config.max_steps)
    }

    /// Execute `run` on a background task, streaming its steps
    pub fn run<O: AgentOutput>(&self, mut run: AgentRun) -> AgentStream<O> {
        let (sender, receiver) = StepSender::channel(STEP_BUFFER);
        let scheduler = self.clone();
        let handle = tokio::spawn(async move { scheduler.execute(&mut run, &sender).await });
        AgentStream::new(receiver, handle)
    }

    /// Execute `run` in place until it completes, fails, pauses or is cancelled
    pub async fn execute<O: AgentOutput>(&self, run: &mut AgentRun, steps: &StepSender<O>) -> RunReport<O> {
        let mut usage = TokenUsage::default();
        let outcome = self.drive(run, steps, &mut usage).await;

        match &outcome {
            RunOutcome::Completed { .. } => run.state.mark_completed().await,
            RunOutcome::Failed(err) => warn!(error = %err, "Agent run failed"),
            RunOutcome::Cancelled => info!("Agent run cancelled"),
            RunOutcome::AwaitingUserInput { .. } => debug!("Agent run waiting for user input"),
        }

        RunReport {
            outcome,
            steps: run.state.current_step().await,
            usage,
        }
    }

    async fn drive<O: AgentOutput>(
        &self,
        run: &mut AgentRun,
        steps: &StepSender<O>,
        usage: &mut TokenUsage,
    ) -> RunOutcome<O> {
        if let Err(err) = run.tools.ensure_resolved().and_then(|_| run.tools.validate_unique_names()) {
            return RunOutcome::Failed(err);
        }
        if run.pending_input.is_some() {
            return RunOutcome::Failed(AgentError::InvalidState(
                "run is waiting for a user reply".to_string(),
            ));
        }

        let adapter = self.provider.backend().schema_adapter();
        let (system_prompt, output_schema) = self.prepare_output(adapter, run.output_schema.as_ref());
        let tools = prepare_tools(adapter, &run.tools);
        let tool_choice = if tools.is_empty() {
            None
        } else {
            self.config.tool_choice.clone()
        };

        loop {
            if run.cancel.is_cancelled() {
                return RunOutcome::Cancelled;
            }

            for message in run.interrupts.drain() {
                debug!(message = %message, "Processing interrupt");
                steps.emit(AgentStep::Interrupted(message.clone())).await;
                push_user_text(&mut run.messages, message);
            }

            let step = match run.state.increment_step().await {
                Ok(step) => step,
                Err(err) => return RunOutcome::Failed(err),
            };
            debug!(step, messages = run.messages.len(), "Agent step started");

            let request = StepRequest {
                messages: run.messages.clone(),
                model: self.config.model.clone(),
                system_prompt: system_prompt.clone(),
                tools: tools.clone(),
                tool_choice: tool_choice.clone(),
                output_schema: output_schema.clone(),
            };

            let turn = tokio::select! {
                biased;
                _ = run.cancel.cancelled() => return RunOutcome::Cancelled,
                result = self.provider.execute_step(request) => match result {
                    Ok(turn) => turn,
                    Err(err) => return RunOutcome::Failed(AgentError::Backend(err)),
                },
            };

            if let Some(turn_usage) = &turn.usage {
                usage.add(turn_usage);
            }
            debug!(step, tool_calls = turn.tool_calls.len(), "Backend turn received");
            steps.emit(AgentStep::Thinking(turn.clone())).await;

            if turn.has_tool_calls() {
                match self.run_tool_calls(run, &turn, steps).await {
                    ToolPhase::Committed => {}
                    ToolPhase::AwaitingUser { question, tool_call_id } => {
                        return RunOutcome::AwaitingUserInput { question, tool_call_id }
                    }
                    ToolPhase::Cancelled => return RunOutcome::Cancelled,
                }

                let repeats = run.state.count_consecutive_same_tool_calls().await;
                if self.config.max_consecutive_tool_calls > 0 && repeats >= self.config.max_consecutive_tool_calls {
                    let tool = run
                        .state
                        .last_tool_call()
                        .await
                        .map(|record| record.name)
                        .unwrap_or_default();
                    warn!(tool = %tool, repeats, "Tool call loop detected");
                    return RunOutcome::Failed(AgentError::LoopDetected { tool, repeats });
                }
                continue;
            }

            let text = turn.joined_text();
            match &run.output_schema {
                None => {
                    run.messages.push(Message::assistant(text.clone()));
                    steps.emit(AgentStep::TextResponse(text.clone())).await;
                    return RunOutcome::Completed {
                        output: None,
                        text: Some(text),
                    };
                }
                Some(schema) => {
                    let payload = final_payload(&turn);
                    let decoded = payload
                        .as_ref()
                        .map_err(|e| AgentError::OutputValidation(e.clone()))
                        .and_then(|value| decode_output::<O>(schema, value));

                    let committed_text = match (&payload, text.is_empty()) {
                        (Ok(value), true) => value.to_string(),
                        _ => text.clone(),
                    };
                    run.messages.push(Message::assistant(committed_text));

                    match decoded {
                        Ok(output) => {
                            steps.emit(AgentStep::FinalResponse(output.clone())).await;
                            return RunOutcome::Completed {
                                output: Some(output),
                                text: (!text.is_empty()).then_some(text),
                            };
                        }
                        Err(err) => {
                            warn!(step, error = %err, "Final response rejected");
                            push_user_text(&mut run.messages, corrective_message(&err));
                        }
                    }
                }
            }
        }
    }

    fn prepare_output(
        &self,
        adapter: &dyn SchemaAdapter,
        output_schema: Option<&Schema>,
    ) -> (Option<String>, Option<Schema>) {
        let base = self.config.system_prompt.as_deref();
        match output_schema {
            Some(schema) => {
                let adapted = adapter.adapt(schema);
                (
                    append_to_prompt(base, &adapted.removed_constraints),
                    Some(adapted.schema),
                )
            }
            None => (base.map(str::to_string), None),
        }
    }

    async fn run_tool_calls<O: AgentOutput>(
        &self,
        run: &mut AgentRun,
        turn: &ModelTurn,
        steps: &StepSender<O>,
    ) -> ToolPhase {
        let mut results: Vec<MessageContent> = Vec::new();
        let mut records: Vec<ToolCallRecord> = Vec::new();

        for (index, call) in turn.tool_calls.iter().enumerate() {
            if run.cancel.is_cancelled() {
                return ToolPhase::Cancelled;
            }
            steps.emit(AgentStep::ToolCall(call.clone())).await;

            if call.name == ASK_USER_TOOL_NAME && run.tools.contains(ASK_USER_TOOL_NAME) {
                match AskUserTool::question(&call.arguments_json) {
                    Ok(question) => {
                        steps.emit(AgentStep::AskingUser(question.clone())).await;
                        steps.emit(AgentStep::AwaitingUserInput(question.clone())).await;

                        let after = turn.tool_calls[index + 1..]
                            .iter()
                            .map(|skipped| {
                                Message::tool_result_content(skipped, &ToolResult::error(SKIPPED_FOR_USER_INPUT))
                            })
                            .collect();
                        run.messages
                            .push(Message::assistant_with_tools(&turn.text_parts, &turn.tool_calls));
                        run.state.record_tool_calls(records).await;
                        run.pending_input = Some(PendingUserInput {
                            question: question.clone(),
                            tool_call: call.clone(),
                            before: results,
                            after,
                        });
                        return ToolPhase::AwaitingUser {
                            question,
                            tool_call_id: call.id.clone(),
                        };
                    }
                    Err(err) => {
                        let result = ToolResult::error(format!("Invalid ask_user arguments: {}", err));
                        steps.emit(AgentStep::ToolResult(result.clone())).await;
                        results.push(Message::tool_result_content(call, &result));
                        continue;
                    }
                }
            }

            let result = tokio::select! {
                biased;
                _ = run.cancel.cancelled() => return ToolPhase::Cancelled,
                result = invoke_tool(&run.tools, call) => result,
            };

            steps.emit(AgentStep::ToolResult(result.clone())).await;
            results.push(Message::tool_result_content(call, &result));
            records.push(ToolCallRecord::from_call(call));
        }

        run.messages
            .push(Message::assistant_with_tools(&turn.text_parts, &turn.tool_calls));
        run.messages.push(Message::tool_results(results));
        run.state.record_tool_calls(records).await;
        ToolPhase::Committed
    }
}

/// Tool definitions with backend-adapted input schemas; dropped constraints go into the description
fn prepare_tools(adapter: &dyn SchemaAdapter, tools: &ToolSet) -> Vec<ToolDefinition> {
    tools
        .iter()
        .map(|tool| {
            let adapted = adapter.adapt(&tool.input_schema());
            let description = append_to_prompt(Some(tool.description()), &adapted.removed_constraints)
                .unwrap_or_default();
            ToolDefinition::new(tool.name(), description, adapted.schema)
        })
        .collect()
}

async fn invoke_tool(tools: &ToolSet, call: &ToolCall) -> ToolResult {
    let Some(tool) = tools.get(&call.name) else {
        warn!(tool = %call.name, "Model requested an unknown tool");
        return ToolResult::error(format!("Unknown tool '{}'", call.name));
    };

    match tool.execute(&call.arguments_json).await {
        Ok(result) => {
            info!(tool = %call.name, is_error = result.is_error, "Tool executed");
            result
        }
        Err(err) => {
            let err = tool_failure(&call.name, err);
            warn!(tool = %call.name, error = %err, "Tool execution failed");
            ToolResult::error(err.to_string())
        }
    }
}

fn tool_failure(tool: &str, err: ToolError) -> AgentError {
    AgentError::ToolExecutionFailed {
        tool: tool.to_string(),
        cause: err.to_string(),
    }
}

/// The turn's final payload: native structured output, else the text parsed as JSON
fn final_payload(turn: &ModelTurn) -> Result<Value, String> {
    if let Some(output) = &turn.structured_output {
        return Ok(output.clone());
    }
    let text = turn.joined_text();
    if text.trim().is_empty() {
        return Err("the response was empty".to_string());
    }
    serde_json::from_str(strip_code_fence(&text))
        .map_err(|e| format!("the response is not valid JSON: {}", e))
}

/// Strip one surrounding Markdown code fence, if present
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // drop the language tag line
    match body.find('\n') {
        Some(newline) => body[newline + 1..].trim(),
        None => body.trim(),
    }
}

/// Validate `value` against the canonical schema, then decode it
pub fn decode_output<O: AgentOutput>(schema: &Schema, value: &Value) -> AgentResult<O> {
    let value = validation::strip_optional_nulls(schema, value);
    if let Err(violations) = validation::validate(schema, &value) {
        return Err(AgentError::OutputValidation(violations.join("; ")));
    }
    serde_json::from_value(value).map_err(|e| AgentError::OutputValidation(e.to_string()))
}

fn corrective_message(err: &AgentError) -> String {
    let reason = match err {
        AgentError::OutputValidation(reason) => reason.clone(),
        other => other.to_string(),
    };
    format!(
        "Your previous response could not be accepted: {}. Reply again with only a JSON value that matches the required schema.",
        reason
    )
}
