//! # agentrail
//!
//! A backend-agnostic agent loop: the model is called, the tools it asks for are run, and the loop
//! stops on a typed answer validated against a canonical schema.
//!
//! ## Features
//!
//! - **Schema adaptation**: one canonical `Schema`, adapted per backend; constraints a backend cannot
//!   express are turned into prompt instructions
//! - **Tools**: a `Tool` trait, `ToolSet` builder and the built-in `ask_user` tool
//! - **MCP**: tools hosted by MCP servers over stdio or HTTP, resolved lazily and filtered by
//!   selection rules
//! - **Scheduler**: a cancellable step state machine streaming every step it takes
//! - **Sessions**: multi-turn conversations with interrupt, reply, cancel and clear
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use agentrail::agents::{AgentConfig, AgentScheduler, ConversationalSession, LlmProvider, ToolSet};
//! use std::sync::Arc;
//!
//! async fn chat(provider: Arc<dyn LlmProvider>) -> anyhow::Result<()> {
//!     let scheduler = AgentScheduler::new(provider, AgentConfig::new("my-model"));
//!     let tools = ToolSet::builder().ask_user().build();
//!     let mut session = ConversationalSession::<serde_json::Value>::connect(scheduler, tools).await?;
//!
//!     let report = session.send("What's on my calendar today?").await?;
//!     println!("{:?}", report.outcome);
//!     Ok(())
//! }
//! ```

pub mod agents;
pub mod config;
pub mod mcp;
pub mod schema;
pub mod telemetry;
