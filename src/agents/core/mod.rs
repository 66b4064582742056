//! Agent loop
//!
//! - [`AgentScheduler`]: the step state machine driving one run against a backend
//! - [`ConversationalSession`]: a multi-run conversation with interrupt, reply, cancel and clear

mod scheduler;
mod session;

pub use scheduler::{decode_output, AgentRun, AgentScheduler, InterruptQueue, PendingUserInput};
pub use session::{ConversationalSession, SessionControl};

use serde::de::DeserializeOwned;

/// Bound for the typed final answer of a run
pub trait AgentOutput: DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> AgentOutput for T where T: DeserializeOwned + Clone + Send + Sync + 'static {}
