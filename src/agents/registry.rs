//! Handler registry for workflow nodes
//!
//! Maps each [`NodeKind`] to the handler that runs nodes of that kind. All
//! clients are injected through [`NodeServices`]; the registry never creates
//! its own.

use crate::agents::{ModelNode, NodeHandler, RetrievalNode, ToolNode};
use crate::db::vectorstore::VectorSearch;
use crate::llm::LLMClient;
use crate::tools::{ToolDispatcher, ToolRegistry};
use crate::types::{AppError, Result};
use crate::workflows::compiler::CompiledGraph;
use crate::workflows::definition::NodeKind;
use std::collections::HashMap;
use std::sync::Arc;

/// Clients shared by the node handlers.
#[derive(Clone)]
pub struct NodeServices {
    pub llm: Arc<dyn LLMClient>,
    pub vector_store: Arc<dyn VectorSearch>,
    pub dispatcher: ToolDispatcher,
    pub tools: Arc<ToolRegistry>,
    /// Documents returned per retrieval
    pub top_k: usize,
}

pub struct AgentRegistry {
    handlers: HashMap<NodeKind, Arc<dyn NodeHandler>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry with the standard handler for every kind.
    pub fn from_services(services: NodeServices) -> Self {
        AgentRegistryBuilder::new()
            .handler(Arc::new(ModelNode::new(services.llm.clone())))
            .handler(Arc::new(RetrievalNode::new(
                services.vector_store,
                services.top_k,
            )))
            .handler(Arc::new(ToolNode::new(
                services.llm,
                services.dispatcher,
                services.tools,
            )))
            .build()
    }

    /// Register a handler, replacing any previous one for the same kind.
    pub fn register(&mut self, handler: Arc<dyn NodeHandler>) {
        self.handlers.insert(handler.kind(), handler);
    }

    pub fn handler(&self, kind: NodeKind) -> Option<Arc<dyn NodeHandler>> {
        self.handlers.get(&kind).cloned()
    }

    pub fn has_handler(&self, kind: NodeKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Check that every node in `graph` has a handler.
    pub fn check_graph(&self, graph: &CompiledGraph) -> Result<()> {
        let mut nodes = vec![graph.entry_node(), graph.final_node()];
        nodes.extend(graph.routing_targets().iter().map(String::as_str));

        for node in nodes {
            let kind = graph.kind(node);
            if !self.has_handler(kind) {
                return Err(AppError::Configuration(format!(
                    "No handler registered for node '{}' of kind '{}'",
                    node,
                    kind.as_str()
                )));
            }
        }
        Ok(())
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`AgentRegistry`]
pub struct AgentRegistryBuilder {
    registry: AgentRegistry,
}

impl AgentRegistryBuilder {
    pub fn new() -> Self {
        Self {
            registry: AgentRegistry::new(),
        }
    }

    pub fn handler(mut self, handler: Arc<dyn NodeHandler>) -> Self {
        self.registry.register(handler);
        self
    }

    pub fn build(self) -> AgentRegistry {
        self.registry
    }
}

impl Default for AgentRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{NodeContext, NodeOutcome};
    use crate::workflows::compiler::compile;
    use crate::workflows::definition::{NodeSpec, WorkflowDefinition};
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl NodeHandler for Echo {
        async fn execute(&self, ctx: &NodeContext<'_>) -> Result<NodeOutcome> {
            Ok(NodeOutcome::text(ctx.input))
        }

        fn kind(&self) -> NodeKind {
            NodeKind::Model
        }
    }

    fn graph() -> CompiledGraph {
        compile(&WorkflowDefinition {
            entry_node: "supervisor".to_string(),
            final_node: "responder".to_string(),
            nodes: vec![
                NodeSpec::new("supervisor", "router", "", "route"),
                NodeSpec::new("vector_db_agent", "search", "Vector search", ""),
                NodeSpec::new("responder", "writer", "", "answer"),
            ],
            edges: vec![],
        })
        .unwrap()
    }

    #[test]
    fn test_register_replaces_by_kind() {
        let mut registry = AgentRegistry::new();
        assert!(!registry.has_handler(NodeKind::Model));
        registry.register(Arc::new(Echo));
        registry.register(Arc::new(Echo));
        assert!(registry.has_handler(NodeKind::Model));
        assert_eq!(registry.handlers.len(), 1);
    }

    #[test]
    fn test_check_graph_reports_missing_kind() {
        let registry = AgentRegistryBuilder::new().handler(Arc::new(Echo)).build();
        let err = registry.check_graph(&graph()).unwrap_err();
        assert!(err.to_string().contains("vector_db_agent"));
        assert!(err.to_string().contains("vector_db"));
    }
}
