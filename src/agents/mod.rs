//! Workflow node handlers.
//!
//! Every node of a compiled graph is run by a [`NodeHandler`] chosen from its
//! [`NodeKind`](crate::workflows::definition::NodeKind):
//!
//! - [`ModelNode`] - prompt + input to the model, text back
//! - [`RetrievalNode`] - document search against the vector store
//! - [`ToolNode`] - asks the model for a tool call and sends it to the tool service
//!
//! [`router`] holds the keyword resolver that picks the node after the entry node.

pub mod model;
pub mod registry;
pub mod retrieval;
pub mod router;
pub mod tool;

use crate::types::Result;
use crate::workflows::definition::NodeKind;
use crate::workflows::state::ConversationState;
use async_trait::async_trait;
use serde_json::Value;

pub use model::ModelNode;
pub use registry::{AgentRegistry, NodeServices};
pub use retrieval::RetrievalNode;
pub use router::{KeywordRouteResolver, RouteDecision, RouteResolver};
pub use tool::ToolNode;

/// Everything a handler sees of the turn when it runs.
#[derive(Debug, Clone, Copy)]
pub struct NodeContext<'a> {
    pub node_id: &'a str,
    /// Compiled node prompt
    pub prompt: &'a str,
    /// Effective input: the raw query, or the query wrapped with the turn's log
    pub input: &'a str,
    pub state: &'a ConversationState,
}

/// What a handler produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeOutcome {
    pub text: String,
    /// Set by specialised handlers (`<keyword>_completed` / `<keyword>_error`)
    pub routing_status: Option<String>,
    pub tool_result: Option<Value>,
}

impl NodeOutcome {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.routing_status = Some(status.into());
        self
    }

    pub fn with_tool_result(mut self, result: Value) -> Self {
        self.tool_result = Some(result);
        self
    }
}

/// Runs one node of the graph.
///
/// Specialised handlers turn their own failures into apology text and never
/// return `Err`; a model node returns `Err` when the model call fails so the
/// engine can decide between a fallback route and an error message.
#[async_trait]
pub trait NodeHandler: Send + Sync {
    async fn execute(&self, ctx: &NodeContext<'_>) -> Result<NodeOutcome>;

    fn kind(&self) -> NodeKind;
}

pub(crate) fn completed_status(kind: NodeKind) -> String {
    format!("{}_completed", kind.as_str())
}

pub(crate) fn error_status(kind: NodeKind) -> String {
    format!("{}_error", kind.as_str())
}
