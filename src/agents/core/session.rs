//! Conversational session
//!
//! Keeps one conversation alive across scheduler runs. Each `send` starts a run with a fresh step
//! budget on top of the existing history; `reply` answers a pending `ask_user` question and continues
//! the same run; a cancelled run parks the session in `Paused` with its history intact.

use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::scheduler::{push_user_text, AgentRun, AgentScheduler, InterruptQueue};
use super::AgentOutput;
use crate::agents::domain::{Message, RunOutcome, RunReport, SessionPhase, StepSender, STEP_BUFFER};
use crate::agents::error::{AgentError, AgentResult};
use crate::agents::state::LoopStateSnapshot;
use crate::agents::tool::ToolSet;
use crate::mcp::resolving_mcp_servers;
use crate::schema::Schema;

/// Cloneable handle for steering a session from another task
#[derive(Debug, Clone)]
pub struct SessionControl {
    cancel: Arc<Mutex<CancellationToken>>,
    interrupts: InterruptQueue,
}

impl SessionControl {
    fn new() -> Self {
        Self {
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
            interrupts: InterruptQueue::default(),
        }
    }

    /// Stop the current run at its next suspension point
    pub fn cancel(&self) {
        self.token().cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token().is_cancelled()
    }

    /// Queue a message for the next loop iteration
    pub fn interrupt(&self, message: impl Into<String>) {
        self.interrupts.push(message);
    }

    fn token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Token for a new run; a cancelled token is replaced
    fn reset_cancel(&self) -> CancellationToken {
        let mut guard = self.cancel.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if guard.is_cancelled() {
            *guard = CancellationToken::new();
        }
        guard.clone()
    }
}

/// A multi-turn conversation driven by an [`AgentScheduler`]
pub struct ConversationalSession<O: AgentOutput> {
    scheduler: AgentScheduler,
    run: AgentRun,
    phase: watch::Sender<SessionPhase<O>>,
    control: SessionControl,
    turn_count: u32,
}

impl<O: AgentOutput> ConversationalSession<O> {
    /// Session over an already-resolved tool set
    pub fn new(scheduler: AgentScheduler, tools: ToolSet) -> Self {
        let control = SessionControl::new();
        let mut run = scheduler.new_run().with_tools(tools);
        run.interrupts = control.interrupts.clone();
        run.cancel = control.token();
        let (phase, _) = watch::channel(SessionPhase::Idle);

        Self {
            scheduler,
            run,
            phase,
            control,
            turn_count: 0,
        }
    }

    /// Resolve MCP placeholders in `tools`, then build the session
    pub async fn connect(scheduler: AgentScheduler, tools: ToolSet) -> AgentResult<Self> {
        let tools = resolving_mcp_servers(tools).await?;
        Ok(Self::new(scheduler, tools))
    }

    /// Request typed answers matching `schema`
    pub fn with_output_schema(mut self, schema: Schema) -> Self {
        self.run.output_schema = Some(schema);
        self
    }

    /// Seed the conversation with earlier messages
    pub fn with_history(mut self, messages: Vec<Message>) -> Self {
        self.run.messages = messages;
        self
    }

    pub fn control(&self) -> SessionControl {
        self.control.clone()
    }

    pub fn phase(&self) -> SessionPhase<O> {
        self.phase.borrow().clone()
    }

    /// Watch phase changes, including each step while running
    pub fn subscribe(&self) -> watch::Receiver<SessionPhase<O>> {
        self.phase.subscribe()
    }

    /// Number of runs that reached a final answer
    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn messages(&self) -> &[Message] {
        &self.run.messages
    }

    pub async fn loop_state(&self) -> LoopStateSnapshot {
        self.run.state.snapshot().await
    }

    /// Start a new run with `text` as the user's message
    pub async fn send(&mut self, text: impl Into<String>) -> AgentResult<RunReport<O>> {
        if self.phase.borrow().is_awaiting_input() {
            return Err(AgentError::InvalidState(
                "the agent is waiting for a reply to its question".to_string(),
            ));
        }

        self.run.state.reset().await;
        push_user_text(&mut self.run.messages, text);
        Ok(self.execute().await)
    }

    /// Answer the pending `ask_user` question and continue the run
    pub async fn reply(&mut self, answer: impl Into<String>) -> AgentResult<RunReport<O>> {
        if !self.phase.borrow().is_awaiting_input() {
            return Err(AgentError::InvalidState("no question is waiting for a reply".to_string()));
        }
        let pending = self
            .run
            .take_pending_input()
            .ok_or_else(|| AgentError::InvalidState("no question is waiting for a reply".to_string()))?;

        self.run.messages.push(pending.answer(answer));
        Ok(self.execute().await)
    }

    /// Continue a cancelled run from where it stopped
    pub async fn resume(&mut self) -> AgentResult<RunReport<O>> {
        if !matches!(*self.phase.borrow(), SessionPhase::Paused) {
            return Err(AgentError::InvalidState("only a paused session can be resumed".to_string()));
        }
        Ok(self.execute().await)
    }

    /// Cancel the current run; history is kept
    pub fn cancel(&self) {
        self.control.cancel();
    }

    /// Queue a message for the running agent
    pub fn interrupt(&self, message: impl Into<String>) {
        self.control.interrupt(message);
    }

    /// Drop the whole conversation and start over
    pub async fn clear(&mut self) {
        self.run.messages.clear();
        self.run.state.reset().await;
        self.run.take_pending_input();
        self.run.interrupts.clear();
        self.turn_count = 0;
        self.set_phase(SessionPhase::Idle);
    }

    async fn execute(&mut self) -> RunReport<O> {
        self.run.cancel = self.control.reset_cancel();

        let (sender, mut receiver) = StepSender::<O>::channel(STEP_BUFFER);
        let Self {
            scheduler, run, phase, ..
        } = self;

        let exec = async move {
            // the sender drops with this block, which ends the drain below
            let sender = sender;
            scheduler.execute(run, &sender).await
        };
        let drain = async {
            while let Some(step) = receiver.recv().await {
                debug!(step = step.kind(), "Session step");
                phase.send_replace(SessionPhase::Running(step));
            }
        };
        let (report, ()) = tokio::join!(exec, drain);

        let next = match &report.outcome {
            RunOutcome::Completed { output, .. } => {
                self.turn_count += 1;
                SessionPhase::Completed(output.clone())
            }
            RunOutcome::AwaitingUserInput { question, .. } => SessionPhase::AwaitingUserInput(question.clone()),
            RunOutcome::Failed(err) => SessionPhase::Failed(err.to_string()),
            RunOutcome::Cancelled => SessionPhase::Paused,
        };
        self.set_phase(next);
        report
    }

    fn set_phase(&self, phase: SessionPhase<O>) {
        debug!(phase = phase_name(&phase), "Session phase changed");
        self.phase.send_replace(phase);
    }
}

fn phase_name<O>(phase: &SessionPhase<O>) -> &'static str {
    match phase {
        SessionPhase::Idle => "idle",
        SessionPhase::Running(_) => "running",
        SessionPhase::AwaitingUserInput(_) => "awaiting_user_input",
        SessionPhase::Paused => "paused",
        SessionPhase::Completed(_) => "completed",
        SessionPhase::Failed(_) => "failed",
    }
}
