//! Workflow Compiler
//!
//! Turns a [`WorkflowDefinition`] into an immutable [`CompiledGraph`]: one
//! prompt per node (the entry node's prompt enumerates the routing options),
//! the keyword route table consulted by the router, and the fallback node.

use crate::types::{AppError, Result};
use crate::workflows::definition::{Edge, NodeKind, NodeSpec, WorkflowDefinition};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Ordered keyword → node table.
///
/// Re-inserting an existing keyword replaces its target but keeps the
/// keyword's original position, so a later node silently takes over a
/// keyword claimed by an earlier one (last writer wins).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouteTable {
    entries: Vec<(String, String)>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a keyword. Returns the previous target on overwrite.
    pub fn insert(&mut self, keyword: impl Into<String>, target: &str) -> Option<String> {
        let keyword = keyword.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == keyword) {
            let previous = std::mem::replace(&mut entry.1, target.to_string());
            return Some(previous);
        }
        self.entries.push((keyword, target.to_string()));
        None
    }

    pub fn get(&self, keyword: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == keyword)
            .map(|(_, target)| target.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, t)| (k.as_str(), t.as_str()))
    }

    pub fn keywords(&self) -> Vec<&str> {
        self.entries.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Executable form of a workflow. Read-only once built; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct CompiledGraph {
    entry_node: String,
    final_node: String,
    fallback_node: String,
    prompts: HashMap<String, String>,
    kinds: HashMap<String, NodeKind>,
    routing_targets: Vec<String>,
    route_table: RouteTable,
    edges: Vec<Edge>,
}

impl CompiledGraph {
    pub fn entry_node(&self) -> &str {
        &self.entry_node
    }

    pub fn final_node(&self) -> &str {
        &self.final_node
    }

    pub fn fallback_node(&self) -> &str {
        &self.fallback_node
    }

    pub fn route_table(&self) -> &RouteTable {
        &self.route_table
    }

    /// Nodes other than entry and final, in declaration order
    pub fn routing_targets(&self) -> &[String] {
        &self.routing_targets
    }

    pub fn prompt(&self, node_id: &str) -> Option<&str> {
        self.prompts.get(node_id).map(String::as_str)
    }

    pub fn kind(&self, node_id: &str) -> NodeKind {
        self.kinds.get(node_id).copied().unwrap_or(NodeKind::Model)
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.prompts.contains_key(node_id)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Summary used by the CLI and the `/workflow` endpoint
    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            entry_node: self.entry_node.clone(),
            final_node: self.final_node.clone(),
            fallback_node: self.fallback_node.clone(),
            routing_targets: self
                .routing_targets
                .iter()
                .map(|id| TargetSummary {
                    id: id.clone(),
                    keyword: routing_keyword(id),
                    kind: self.kind(id),
                })
                .collect(),
            route_table: self
                .route_table
                .iter()
                .map(|(keyword, target)| RouteEntry {
                    keyword: keyword.to_string(),
                    target: target.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct GraphSummary {
    pub entry_node: String,
    pub final_node: String,
    pub fallback_node: String,
    pub routing_targets: Vec<TargetSummary>,
    /// Keyword/target pairs in match order
    pub route_table: Vec<RouteEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct RouteEntry {
    pub keyword: String,
    pub target: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct TargetSummary {
    pub id: String,
    pub keyword: String,
    #[schema(value_type = String)]
    pub kind: NodeKind,
}

/// Routing keyword advertised for a node: lowercase id without an `_agent` suffix.
pub fn routing_keyword(node_id: &str) -> String {
    let lower = node_id.to_lowercase();
    match lower.strip_suffix("_agent") {
        Some(stripped) => stripped.to_string(),
        None => lower,
    }
}

/// Base prompt for a node.
pub fn node_prompt(spec: &NodeSpec) -> String {
    format!(
        "Role: {}\nDescription: {}\nPrompt: {}",
        spec.role, spec.description, spec.prompt_template
    )
}

fn routing_line(spec: &NodeSpec) -> String {
    spec.description
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(String::from)
        .unwrap_or_else(|| format!("Handle {} related queries", spec.role))
}

fn augment_entry_prompt(base: String, targets: &[&NodeSpec]) -> String {
    if targets.is_empty() {
        return base;
    }

    let keywords: Vec<String> = targets
        .iter()
        .map(|spec| format!("'{}'", routing_keyword(&spec.id)))
        .collect();
    let bullets: Vec<String> = targets
        .iter()
        .map(|spec| format!("- '{}' -> {}", routing_keyword(&spec.id), routing_line(spec)))
        .collect();

    format!(
        "{}\n\nDYNAMIC ROUTING OPTIONS (based on available agents):\n\
         Return only **one word** from: {}.\n\
         Do NOT include JSON or extra text.\n\n\
         {}\n\n\
         Choose the most appropriate routing option based on the user's query.",
        base,
        keywords.join(", "),
        bullets.join("\n")
    )
}

fn build_route_table(targets: &[&NodeSpec]) -> RouteTable {
    let mut table = RouteTable::new();

    let insert = |table: &mut RouteTable, keyword: String, id: &str| {
        if let Some(previous) = table.insert(keyword.clone(), id) {
            if previous != id {
                warn!(
                    keyword = %keyword,
                    previous = %previous,
                    target = %id,
                    "Routing keyword claimed by a later node"
                );
            }
        }
    };

    for spec in targets {
        let id = spec.id.as_str();
        insert(&mut table, id.to_lowercase(), id);

        let role = spec.role.to_lowercase();
        if !role.is_empty() {
            insert(&mut table, role, id);
        }

        let description = spec.description.to_lowercase();
        if description.contains("vector") || description.contains("database") {
            insert(&mut table, "vector_db".to_string(), id);
            insert(&mut table, "database".to_string(), id);
        }
        if description.contains("tools") || description.contains("operations") {
            insert(&mut table, "tools".to_string(), id);
            insert(&mut table, "operations".to_string(), id);
        }
        if description.contains("fallback") || description.contains("default") {
            insert(&mut table, "fallback".to_string(), id);
            insert(&mut table, "fallback_agent".to_string(), id);
        }
    }

    table
}

fn select_fallback(targets: &[&NodeSpec], final_node: &str) -> String {
    targets
        .iter()
        .find(|spec| {
            spec.id.to_lowercase().contains("fallback")
                || spec.role.to_lowercase().contains("fallback")
                || spec.description.to_lowercase().contains("fallback")
        })
        .or_else(|| targets.first())
        .map(|spec| spec.id.clone())
        .unwrap_or_else(|| final_node.to_string())
}

fn infer_kind(spec: &NodeSpec) -> NodeKind {
    let keyword = routing_keyword(&spec.id);
    if keyword.contains("vector_db") {
        NodeKind::VectorDb
    } else if keyword.contains("tools") {
        NodeKind::Tools
    } else {
        NodeKind::Model
    }
}

/// Compile a workflow definition.
///
/// # Errors
///
/// Returns [`AppError::Configuration`] when the node list is empty, node ids
/// repeat, the entry or final node is unset or unknown, or the entry node is
/// bound to a non-model handler.
pub fn compile(definition: &WorkflowDefinition) -> Result<CompiledGraph> {
    if definition.nodes.is_empty() {
        return Err(AppError::Configuration(
            "No agents defined in workflow".to_string(),
        ));
    }

    if definition.entry_node.trim().is_empty() || definition.final_node.trim().is_empty() {
        return Err(AppError::Configuration(
            "flow must define entry_node and final_node".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for spec in &definition.nodes {
        if spec.id.trim().is_empty() {
            return Err(AppError::Configuration(
                "Every agent needs a non-empty name".to_string(),
            ));
        }
        if !seen.insert(spec.id.as_str()) {
            return Err(AppError::Configuration(format!(
                "Agent '{}' is defined more than once",
                spec.id
            )));
        }
    }

    for (label, id) in [
        ("entry_node", &definition.entry_node),
        ("final_node", &definition.final_node),
    ] {
        if !seen.contains(id.as_str()) {
            return Err(AppError::Configuration(format!(
                "{} '{}' does not match any agent",
                label, id
            )));
        }
    }

    let entry = &definition.entry_node;
    let terminal = &definition.final_node;

    let targets: Vec<&NodeSpec> = definition
        .nodes
        .iter()
        .filter(|spec| spec.id != *entry && spec.id != *terminal)
        .collect();

    let mut prompts = HashMap::new();
    let mut kinds = HashMap::new();
    for spec in &definition.nodes {
        let base = node_prompt(spec);
        let prompt = if spec.id == *entry {
            augment_entry_prompt(base, &targets)
        } else {
            base
        };
        prompts.insert(spec.id.clone(), prompt);

        let kind = if spec.id == *entry || spec.id == *terminal {
            spec.kind.unwrap_or(NodeKind::Model)
        } else {
            spec.kind.unwrap_or_else(|| infer_kind(spec))
        };
        kinds.insert(spec.id.clone(), kind);
    }

    if kinds.get(entry.as_str()) != Some(&NodeKind::Model) {
        return Err(AppError::Configuration(format!(
            "Entry node '{}' must be a model node",
            entry
        )));
    }

    let edges = definition
        .edges
        .iter()
        .filter(|edge| {
            let known = seen.contains(edge.from.as_str()) && seen.contains(edge.to.as_str());
            if !known {
                warn!(from = %edge.from, to = %edge.to, "Ignoring edge with unknown endpoint");
            }
            known
        })
        .cloned()
        .collect();

    let route_table = build_route_table(&targets);
    let fallback_node = select_fallback(&targets, terminal);

    for (keyword, target) in route_table.iter() {
        debug!(keyword, target, "Route table entry");
    }
    info!(
        entry = %entry,
        terminal = %terminal,
        fallback = %fallback_node,
        targets = targets.len(),
        keywords = route_table.len(),
        "Compiled workflow"
    );

    Ok(CompiledGraph {
        entry_node: entry.clone(),
        final_node: terminal.clone(),
        fallback_node,
        prompts,
        kinds,
        routing_targets: targets.iter().map(|spec| spec.id.clone()).collect(),
        route_table,
        edges,
    })
}
