//! Per-run loop state: step budget and tool-call history.
//!
//! All mutation goes through the write half of a single `RwLock`, so reads such as
//! [`AgentLoopState::count_tool_calls`] always observe the latest recorded call. Cloning the handle
//! shares the same state.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::domain::{ToolCall, ToolCallRecord};
use super::error::{AgentError, AgentResult};

#[derive(Debug, Default)]
struct LoopInner {
    current_step: u32,
    history: Vec<ToolCallRecord>,
    is_completed: bool,
}

/// Read-only copy of the loop state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoopStateSnapshot {
    pub current_step: u32,
    pub max_steps: u32,
    pub tool_call_history: Vec<ToolCallRecord>,
    pub is_completed: bool,
}

#[derive(Debug, Clone)]
pub struct AgentLoopState {
    max_steps: u32,
    inner: Arc<RwLock<LoopInner>>,
}

impl AgentLoopState {
    pub fn new(max_steps: u32) -> Self {
        Self {
            max_steps,
            inner: Arc::new(RwLock::new(LoopInner::default())),
        }
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    /// Consume one step and return its 1-based number.
    ///
    /// Fails with `StepLimitExceeded` once the budget is spent; the counter is left unchanged.
    pub async fn increment_step(&self) -> AgentResult<u32> {
        let mut inner = self.inner.write().await;
        if inner.current_step >= self.max_steps {
            return Err(AgentError::StepLimitExceeded {
                max_steps: self.max_steps,
            });
        }
        inner.current_step += 1;
        Ok(inner.current_step)
    }

    pub async fn current_step(&self) -> u32 {
        self.inner.read().await.current_step
    }

    pub async fn record_tool_call(&self, call: &ToolCall) {
        self.inner.write().await.history.push(ToolCallRecord::from_call(call));
    }

    /// Append several records under one lock so readers never see a partial batch
    pub async fn record_tool_calls(&self, records: Vec<ToolCallRecord>) {
        if records.is_empty() {
            return;
        }
        self.inner.write().await.history.extend(records);
    }

    pub async fn count_tool_calls(&self, name: &str) -> usize {
        let inner = self.inner.read().await;
        inner.history.iter().filter(|r| r.name == name).count()
    }

    pub async fn count_duplicate_tool_calls(&self, name: &str, input_hash: &str) -> usize {
        let inner = self.inner.read().await;
        inner
            .history
            .iter()
            .filter(|r| r.name == name && r.input_hash == input_hash)
            .count()
    }

    /// Length of the trailing run of identical records (0 when the history is empty)
    pub async fn count_consecutive_same_tool_calls(&self) -> usize {
        let inner = self.inner.read().await;
        match inner.history.last() {
            Some(last) => inner.history.iter().rev().take_while(|r| *r == last).count(),
            None => 0,
        }
    }

    /// The most recent record, if any
    pub async fn last_tool_call(&self) -> Option<ToolCallRecord> {
        self.inner.read().await.history.last().cloned()
    }

    pub async fn mark_completed(&self) {
        self.inner.write().await.is_completed = true;
    }

    pub async fn is_completed(&self) -> bool {
        self.inner.read().await.is_completed
    }

    pub async fn snapshot(&self) -> LoopStateSnapshot {
        let inner = self.inner.read().await;
        LoopStateSnapshot {
            current_step: inner.current_step,
            max_steps: self.max_steps,
            tool_call_history: inner.history.clone(),
            is_completed: inner.is_completed,
        }
    }

    /// Back to the initial state. Only meant for use between runs.
    pub async fn reset(&self) {
        *self.inner.write().await = LoopInner::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &str) -> ToolCall {
        ToolCall::new(ToolCall::generate_id(), name, args)
    }

    #[tokio::test]
    async fn test_increment_step_until_limit() {
        let state = AgentLoopState::new(3);
        for expected in 1..=3 {
            assert_eq!(state.increment_step().await.unwrap(), expected);
        }

        let err = state.increment_step().await.unwrap_err();
        assert!(matches!(err, AgentError::StepLimitExceeded { max_steps: 3 }));
        assert_eq!(state.current_step().await, 3);
    }

    #[tokio::test]
    async fn test_zero_budget_fails_immediately() {
        let state = AgentLoopState::new(0);
        assert!(state.increment_step().await.is_err());
    }

    #[tokio::test]
    async fn test_consecutive_same_calls() {
        let state = AgentLoopState::new(10);
        assert_eq!(state.count_consecutive_same_tool_calls().await, 0);

        for _ in 0..3 {
            state.record_tool_call(&call("search", r#"{"q":"rust"}"#)).await;
        }
        assert_eq!(state.count_consecutive_same_tool_calls().await, 3);

        state.record_tool_call(&call("search", r#"{"q":"go"}"#)).await;
        assert_eq!(state.count_consecutive_same_tool_calls().await, 1);
    }

    #[tokio::test]
    async fn test_counts_by_name_and_hash() {
        let state = AgentLoopState::new(10);
        let a = call("search", r#"{"q":"a"}"#);
        let b = call("search", r#"{"q":"b"}"#);
        state
            .record_tool_calls(vec![
                ToolCallRecord::from_call(&a),
                ToolCallRecord::from_call(&b),
                ToolCallRecord::from_call(&a),
                ToolCallRecord::from_call(&call("fetch", "{}")),
            ])
            .await;

        assert_eq!(state.count_tool_calls("search").await, 3);
        assert_eq!(state.count_tool_calls("fetch").await, 1);
        assert_eq!(state.count_duplicate_tool_calls("search", &a.input_hash()).await, 2);
        assert_eq!(state.count_duplicate_tool_calls("search", &b.input_hash()).await, 1);
    }

    #[tokio::test]
    async fn test_snapshot_and_reset() {
        let state = AgentLoopState::new(5);
        state.increment_step().await.unwrap();
        state.record_tool_call(&call("x", "{}")).await;
        state.mark_completed().await;

        let snapshot = state.snapshot().await;
        assert_eq!(snapshot.current_step, 1);
        assert_eq!(snapshot.max_steps, 5);
        assert_eq!(snapshot.tool_call_history.len(), 1);
        assert!(snapshot.is_completed);

        state.reset().await;
        let snapshot = state.snapshot().await;
        assert_eq!(snapshot.current_step, 0);
        assert!(snapshot.tool_call_history.is_empty());
        assert!(!snapshot.is_completed);
        assert_eq!(snapshot.max_steps, 5);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let state = AgentLoopState::new(5);
        let other = state.clone();
        other.increment_step().await.unwrap();
        assert_eq!(state.current_step().await, 1);
    }
}
