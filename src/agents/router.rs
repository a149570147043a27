use crate::workflows::compiler::{CompiledGraph, RouteTable};
use tracing::{debug, warn};

/// Canonical form of a free-text routing answer.
///
/// Lowercases, trims, drops every `'`, `"` and `.`, then trims again:
/// `"  'Vector_DB'. "` becomes `vector_db`.
pub fn normalize_decision(text: &str) -> String {
    text.to_lowercase()
        .trim()
        .replace(['\'', '"', '.'], "")
        .trim()
        .to_string()
}

/// Whether a node prompt asks the model for a routing keyword rather than an answer.
pub fn is_routing_prompt(prompt: &str) -> bool {
    let prompt = prompt.to_lowercase();
    prompt.contains("routing")
        || (prompt.contains("supervisor") && prompt.contains("route"))
        || (prompt.contains("return only")
            && (prompt.contains("tools") || prompt.contains("vector_db")))
}

/// Outcome of resolving a routing answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision {
    pub target: String,
    /// Keyword that matched, `None` when the fallback node was chosen
    pub keyword: Option<String>,
}

impl RouteDecision {
    pub fn is_fallback(&self) -> bool {
        self.keyword.is_none()
    }
}

/// Maps the entry node's raw output to the next node.
///
/// `None` means the entry node produced no usable output (for example the
/// model call failed); implementations must still pick a node.
pub trait RouteResolver: Send + Sync {
    fn resolve(&self, raw: Option<&str>) -> RouteDecision;
}

/// Substring match against the compiled route table, first entry wins.
#[derive(Debug, Clone)]
pub struct KeywordRouteResolver {
    table: RouteTable,
    fallback: String,
}

impl KeywordRouteResolver {
    pub fn new(table: RouteTable, fallback: impl Into<String>) -> Self {
        Self {
            table,
            fallback: fallback.into(),
        }
    }

    pub fn from_graph(graph: &CompiledGraph) -> Self {
        Self::new(graph.route_table().clone(), graph.fallback_node())
    }

    fn fallback(&self) -> RouteDecision {
        RouteDecision {
            target: self.fallback.clone(),
            keyword: None,
        }
    }
}

impl RouteResolver for KeywordRouteResolver {
    fn resolve(&self, raw: Option<&str>) -> RouteDecision {
        let Some(raw) = raw else {
            warn!(fallback = %self.fallback, "No routing output, using fallback");
            return self.fallback();
        };

        let normalized = normalize_decision(raw);
        for (keyword, target) in self.table.iter() {
            if normalized.contains(keyword) {
                debug!(decision = %normalized, keyword, target, "Resolved route");
                return RouteDecision {
                    target: target.to_string(),
                    keyword: Some(keyword.to_string()),
                };
            }
        }

        debug!(
            decision = %normalized,
            fallback = %self.fallback,
            "Routing decision matched no keyword"
        );
        self.fallback()
    }
}
