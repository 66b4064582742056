//! Domain types for the agent loop
//!
//! Messages exchanged with the backend, tool calls and their records, and the step/phase unions
//! emitted while a run is in progress.

mod message;
mod response;
mod step;
mod tool_call;

pub use message::*;
pub use response::*;
pub use step::*;
pub use tool_call::*;
