//! Workflow Module
//!
//! - [`definition`] - the TOML workflow document
//! - [`compiler`] - definition to executable graph with a keyword route table
//! - [`state`] - per-turn conversation state and patches
//! - [`engine`] - walks the graph once per query
//!
//! # Usage
//!
//! ```ignore
//! let definition = WorkflowDefinition::load("agents.toml")?;
//! let graph = Arc::new(compile(&definition)?);
//! let engine = WorkflowEngine::with_keyword_routing(graph, agents)?;
//! let output = engine.run("What is asthma?", vec![]).await;
//! println!("{}", output.response);
//! ```

pub mod compiler;
pub mod definition;
pub mod engine;
pub mod state;

pub use compiler::{compile, CompiledGraph, GraphSummary, RouteTable};
pub use definition::{Edge, NodeKind, NodeSpec, WorkflowDefinition};
pub use engine::{TurnPhase, WorkflowEngine, WorkflowOutput, WorkflowStep};
pub use state::{ConversationState, RoutePatch, StateArena};
