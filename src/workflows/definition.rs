//! Declarative workflow documents.
//!
//! A workflow is a TOML document with a `[flow]` table naming the entry and
//! final nodes, an optional edge list, and one `[[agents]]` entry per node:
//!
//! ```toml
//! [flow]
//! entry_node = "supervisor_agent"
//! final_node = "response_agent"
//!
//! [[flow.edges]]
//! from = "supervisor_agent"
//! to = "vector_db_agent"
//!
//! [[agents]]
//! name = "supervisor_agent"
//! role = "Supervisor"
//! description = "Classifies the user query"
//! prompt = "Decide which agent should answer."
//! ```

use crate::types::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which handler runs a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Plain model completion
    Model,
    /// Vector search over the document store
    VectorDb,
    /// Model-produced tool call sent to the tool execution service
    Tools,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Model => "model",
            NodeKind::VectorDb => "vector_db",
            NodeKind::Tools => "tools",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    #[serde(rename = "name")]
    pub id: String,

    #[serde(default)]
    pub role: String,

    #[serde(default)]
    pub description: String,

    #[serde(rename = "prompt", default)]
    pub prompt_template: String,

    /// Explicit handler binding; inferred from the routing keyword when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeKind>,
}

impl NodeSpec {
    pub fn new(
        id: impl Into<String>,
        role: impl Into<String>,
        description: impl Into<String>,
        prompt_template: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            description: description.into(),
            prompt_template: prompt_template.into(),
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowDefinition {
    pub entry_node: String,
    pub final_node: String,
    pub nodes: Vec<NodeSpec>,
    pub edges: Vec<Edge>,
}

// ============= TOML document shape =============

#[derive(Debug, Deserialize)]
struct WorkflowDocument {
    #[serde(default)]
    flow: FlowSection,
    #[serde(default)]
    agents: Vec<NodeSpec>,
}

#[derive(Debug, Default, Deserialize)]
struct FlowSection {
    #[serde(default)]
    entry_node: Option<String>,
    #[serde(default)]
    final_node: Option<String>,
    #[serde(default)]
    edges: Vec<RawEdge>,
}

#[derive(Debug, Deserialize)]
struct RawEdge {
    from: Option<String>,
    to: Option<String>,
}

impl WorkflowDefinition {
    /// Parse a workflow document. Missing entry/final designations are left
    /// empty and rejected by the compiler.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let doc: WorkflowDocument = toml::from_str(content)
            .map_err(|e| AppError::Configuration(format!("Invalid workflow document: {}", e)))?;

        let edges = doc
            .flow
            .edges
            .into_iter()
            .filter_map(|edge| match (edge.from, edge.to) {
                (Some(from), Some(to)) if !from.is_empty() && !to.is_empty() => {
                    Some(Edge { from, to })
                }
                _ => None,
            })
            .collect();

        Ok(Self {
            entry_node: doc.flow.entry_node.unwrap_or_default(),
            final_node: doc.flow.final_node.unwrap_or_default(),
            nodes: doc.agents,
            edges,
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Configuration(format!(
                "Failed to read workflow file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }
}
