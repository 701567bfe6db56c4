//! # Cogflow: Declarative Agent-Flow Orchestration
//!
//! Cogflow chains autonomous agents (units that transform a shared context
//! into an output, typically by invoking a language model) into multi-step
//! workflows. A flow document declares agent nodes, a transition graph, and
//! optional memory bindings; the engine drives execution from the start node
//! to a terminal transition, routing on fixed wiring or on decisions embedded
//! in an agent's own output.
//!
//! ## Core Concepts
//!
//! - **Agents**: Async units of work implementing the [`agent::Agent`] trait
//! - **Flow**: The declared graph of nodes and transition rules ([`flow::FlowDefinition`])
//! - **Transitions**: Direct hops, decision routing, and terminal `End` rules
//! - **Memory hooks**: Query-before / update-after bindings ([`memory::MemoryManager`])
//! - **Trail**: The ordered, timestamped record of executed nodes ([`trail::TrailRecorder`])
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use serde_json::{Value, json};
//! use cogflow::agent::{Agent, AgentError};
//! use cogflow::cog::Cog;
//! use cogflow::registry::AgentRegistry;
//! use cogflow::types::{Context, new_context};
//!
//! struct GreeterAgent;
//!
//! #[async_trait]
//! impl Agent for GreeterAgent {
//!     async fn execute(&self, _ctx: &Context) -> Result<Value, AgentError> {
//!         Ok(json!({"greeting": "hello"}))
//!     }
//! }
//!
//! # async fn example() -> miette::Result<()> {
//! let doc = r#"
//! cog:
//!   agents:
//!     - id: greeter
//!       type: greeter
//!   flow:
//!     start: greeter
//!     transitions:
//!       greeter:
//!         end: greeting
//! "#;
//!
//! let agents = AgentRegistry::new()
//!     .register("greeter", |_decl| Ok(Arc::new(GreeterAgent) as Arc<dyn Agent>));
//!
//! let cog = Cog::builder()
//!     .config_str(doc)
//!     .agents(agents)
//!     .build()?;
//!
//! let result = cog.run(new_context()).await?;
//! assert_eq!(result, json!("hello"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Execution Model
//!
//! Each [`cog::Cog::run`] call is strictly sequential: memory query hooks,
//! agent execution (with bounded retries), trail recording, memory update
//! hooks, and transition resolution happen in a fixed order per node. The
//! orchestrator is immutable after construction; all per-run state lives in
//! a fresh [`state::ExecutionState`], so independent runs may share one
//! `Cog` across tasks.
//!
//! ## Module Guide
//!
//! - [`agent`] - The agent collaborator trait and its error type
//! - [`config`] - The `cog:` document model and file/string loaders
//! - [`flow`] - Flow definition, transition rules, construction-time validation
//! - [`registry`] - Host-populated factories for agent and memory kinds
//! - [`runner`] - Per-node execution with bounded retries
//! - [`memory`] - Memory-node trait and the query/update hook coordinator
//! - [`resolver`] - The node-transition state machine
//! - [`trail`] - Execution-trail recording
//! - [`cog`] - The orchestrator composing all of the above

pub mod agent;
pub mod cog;
pub mod config;
pub mod flow;
pub mod memory;
pub mod registry;
pub mod resolver;
pub mod runner;
pub mod state;
pub mod telemetry;
pub mod trail;
pub mod types;
pub mod utils;
