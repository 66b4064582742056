//! Streaming types for agent runs

use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{AgentStep, RunOutcome, RunReport};
use crate::agents::error::AgentError;
use crate::agents::llm::TokenUsage;

/// Default channel capacity for step streams
pub const STEP_BUFFER: usize = 64;

/// Sender half handed to the scheduler
pub struct StepSender<O> {
    sender: mpsc::Sender<AgentStep<O>>,
}

impl<O> Clone for StepSender<O> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<O> StepSender<O> {
    /// Create a sender/receiver pair
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<AgentStep<O>>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { sender: tx }, rx)
    }

    /// Emit a step. A dropped receiver is not an error: the run keeps going unobserved.
    pub async fn emit(&self, step: AgentStep<O>) {
        if self.sender.send(step).await.is_err() {
            tracing::trace!("Step receiver dropped");
        }
    }

    /// Check if the receiver is closed
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Steps of a run executing on a background task, followed by its [`RunReport`]
pub struct AgentStream<O> {
    receiver: mpsc::Receiver<AgentStep<O>>,
    handle: JoinHandle<RunReport<O>>,
}

impl<O: Send + 'static> AgentStream<O> {
    pub(crate) fn new(receiver: mpsc::Receiver<AgentStep<O>>, handle: JoinHandle<RunReport<O>>) -> Self {
        Self { receiver, handle }
    }

    /// Receive the next step, or `None` once the run has ended
    pub async fn next_step(&mut self) -> Option<AgentStep<O>> {
        self.receiver.recv().await
    }

    /// Drain every remaining step and wait for the report
    pub async fn collect(mut self) -> (Vec<AgentStep<O>>, RunReport<O>) {
        let mut steps = Vec::new();
        while let Some(step) = self.receiver.recv().await {
            steps.push(step);
        }
        (steps, Self::join(self.handle).await)
    }

    /// Discard remaining steps and wait for the report
    pub async fn finish(self) -> RunReport<O> {
        self.collect().await.1
    }

    async fn join(handle: JoinHandle<RunReport<O>>) -> RunReport<O> {
        match handle.await {
            Ok(report) => report,
            Err(err) => {
                tracing::error!("Agent task failed: {}", err);
                RunReport {
                    outcome: RunOutcome::Failed(AgentError::InvalidState(format!(
                        "agent task failed: {}",
                        err
                    ))),
                    steps: 0,
                    usage: TokenUsage::default(),
                }
            }
        }
    }
}

impl<O> Stream for AgentStream<O> {
    type Item = AgentStep<O>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
