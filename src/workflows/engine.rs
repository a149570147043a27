//! Workflow Engine
//!
//! Runs one conversation turn over a [`CompiledGraph`]:
//!
//! ```text
//! Entry ──▶ Routing ──▶ Agent(target) ──▶ Terminal
//!                 └──────────────────────────▲   (target is the final node)
//! ```
//!
//! Every step produces a [`RoutePatch`] that is merged into the turn's
//! [`StateArena`]. Nothing that happens inside a node ends the turn early: a
//! failed model call becomes an error string, an unusable routing answer goes
//! to the fallback node, and specialised handlers report their own failures as
//! apology text. `Terminal` is always reached and always yields a response.

use crate::agents::{AgentRegistry, KeywordRouteResolver, NodeContext, NodeOutcome, RouteResolver};
use crate::types::{AppError, HistoryEntry, Result};
use crate::workflows::compiler::CompiledGraph;
use crate::workflows::state::{tag, ConversationState, RoutePatch, StateArena};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;

/// Tag used for the routing step's log entry
pub const ROUTER_TAG: &str = "router";

pub const NO_RESPONSE: &str = "No response generated";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TurnPhase {
    Entry,
    Routing,
    Agent,
    Terminal,
}

/// Output from a workflow execution
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkflowOutput {
    pub turn_id: String,
    /// The final response from the workflow
    pub response: String,
    /// Node chosen by the routing step
    pub routed_to: String,
    pub routing_status: String,
    /// Detailed reasoning path showing each step
    pub steps: Vec<WorkflowStep>,
    pub message_log: Vec<String>,
    /// Result of the tool call, when a tool node ran
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub tool_result: Option<Value>,
}

/// A single step in the workflow execution
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkflowStep {
    pub node_id: String,
    pub phase: TurnPhase,
    /// The input provided to the node
    pub input: String,
    /// The output from the node
    pub output: String,
    /// Unix timestamp when this step was executed
    pub timestamp: i64,
    /// Duration of this step in milliseconds
    pub duration_ms: u64,
}

/// Workflow engine that walks a compiled graph once per turn
pub struct WorkflowEngine {
    graph: Arc<CompiledGraph>,
    resolver: Arc<dyn RouteResolver>,
    agents: Arc<AgentRegistry>,
}

struct Invocation {
    input: String,
    result: Result<NodeOutcome>,
    timestamp: i64,
    duration_ms: u64,
}

impl WorkflowEngine {
    /// # Errors
    ///
    /// [`AppError::Configuration`] when a node of the graph has no handler.
    pub fn new(
        graph: Arc<CompiledGraph>,
        resolver: Arc<dyn RouteResolver>,
        agents: Arc<AgentRegistry>,
    ) -> Result<Self> {
        agents.check_graph(&graph)?;
        Ok(Self {
            graph,
            resolver,
            agents,
        })
    }

    /// Engine using the graph's own keyword route table.
    pub fn with_keyword_routing(
        graph: Arc<CompiledGraph>,
        agents: Arc<AgentRegistry>,
    ) -> Result<Self> {
        let resolver = Arc::new(KeywordRouteResolver::from_graph(&graph));
        Self::new(graph, resolver, agents)
    }

    pub fn graph(&self) -> &CompiledGraph {
        &self.graph
    }

    /// Input text a node receives.
    ///
    /// Nodes after the entry node see the original query wrapped with the
    /// turn's message log; the entry node sees the query itself. Both get the
    /// prior-conversation block appended when history is present.
    pub fn effective_input(&self, node_id: &str, state: &ConversationState) -> String {
        if node_id != self.graph.entry_node() && !state.message_log.is_empty() {
            format!(
                "Original Query: {}\n\nConversation History:\n{}{}\n\nPlease provide your response based on the above context.",
                state.input,
                state.message_log.join("\n"),
                state.history_block()
            )
        } else {
            format!("{}{}", state.input, state.history_block())
        }
    }

    async fn invoke(&self, node_id: &str, state: &ConversationState) -> Invocation {
        let input = self.effective_input(node_id, state);
        let prompt = self.graph.prompt(node_id).unwrap_or_default();
        let timestamp = Utc::now().timestamp();
        let started = Instant::now();

        let kind = self.graph.kind(node_id);
        let result = match self.agents.handler(kind) {
            Some(handler) => {
                let ctx = NodeContext {
                    node_id,
                    prompt,
                    input: &input,
                    state,
                };
                debug!(node = node_id, kind = kind.as_str(), "Invoking node");
                handler.execute(&ctx).await
            }
            None => Err(AppError::Internal(format!(
                "No handler for node '{}' of kind '{}'",
                node_id,
                kind.as_str()
            ))),
        };

        Invocation {
            input,
            result,
            timestamp,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Run one turn and return its output.
    pub async fn run(&self, query: &str, history: Vec<HistoryEntry>) -> WorkflowOutput {
        self.run_traced(query, history).await.0
    }

    /// Run one turn, returning every state snapshot alongside the output.
    pub async fn run_traced(
        &self,
        query: &str,
        history: Vec<HistoryEntry>,
    ) -> (WorkflowOutput, StateArena) {
        let turn_id = uuid::Uuid::new_v4().to_string();
        let mut arena = StateArena::new(ConversationState::new(query, history));
        let mut steps = Vec::new();
        let mut tool_result = None;
        let mut routing_answer: Option<String> = None;
        let mut target = self.graph.final_node().to_string();
        let mut phase = TurnPhase::Entry;

        info!(turn = %turn_id, entry = self.graph.entry_node(), "Starting turn");

        loop {
            match phase {
                TurnPhase::Entry => {
                    let node = self.graph.entry_node();
                    let call = self.invoke(node, arena.current()).await;
                    let text = match call.result {
                        Ok(outcome) => {
                            routing_answer = Some(outcome.text.clone());
                            outcome.text
                        }
                        Err(e) => {
                            error!(node, error = %e, "Error calling LLM");
                            format!("Error calling LLM: {}", e)
                        }
                    };
                    info!(node, output = %text, "Entry node answered");

                    arena.apply(
                        RoutePatch::new()
                            .append(tag(node, &text))
                            .prompt(self.graph.prompt(node).unwrap_or_default())
                            .response(text.clone()),
                    );
                    steps.push(step(node, phase, call.input, text, call.timestamp, call.duration_ms));
                    phase = TurnPhase::Routing;
                }

                TurnPhase::Routing => {
                    let timestamp = Utc::now().timestamp();
                    let started = Instant::now();
                    let decision = self.resolver.resolve(routing_answer.as_deref());

                    let (next, fallback) = if self.graph.contains(&decision.target) {
                        (decision.target.clone(), decision.is_fallback())
                    } else {
                        warn!(
                            target = %decision.target,
                            fallback = self.graph.fallback_node(),
                            "Resolver chose an unknown node, using fallback"
                        );
                        (self.graph.fallback_node().to_string(), true)
                    };

                    if fallback {
                        warn!(answer = ?routing_answer, target = %next, "Routing to fallback");
                    } else {
                        info!(keyword = ?decision.keyword, target = %next, "Routing decision");
                    }

                    arena.apply(
                        RoutePatch::new()
                            .append(tag(ROUTER_TAG, &next))
                            .routing_status(if fallback { "fallback" } else { "routed" })
                            .progress_message(format!("Routing to {}", next)),
                    );
                    steps.push(step(
                        ROUTER_TAG,
                        phase,
                        routing_answer.clone().unwrap_or_default(),
                        next.clone(),
                        timestamp,
                        started.elapsed().as_millis() as u64,
                    ));

                    phase = if next == self.graph.final_node() {
                        TurnPhase::Terminal
                    } else {
                        TurnPhase::Agent
                    };
                    target = next;
                }

                TurnPhase::Agent => {
                    let call = self.invoke(&target, arena.current()).await;
                    let mut patch = RoutePatch::new();
                    let text = match call.result {
                        Ok(outcome) => {
                            if let Some(status) = outcome.routing_status {
                                patch = patch.routing_status(status);
                            }
                            if outcome.tool_result.is_some() {
                                tool_result = outcome.tool_result;
                            }
                            outcome.text
                        }
                        Err(e) => {
                            error!(node = %target, error = %e, "Error calling LLM");
                            format!("Error calling LLM: {}", e)
                        }
                    };

                    arena.apply(
                        patch
                            .append(tag(&target, &text))
                            .prompt(self.graph.prompt(&target).unwrap_or_default())
                            .response(text.clone()),
                    );
                    steps.push(step(&target, phase, call.input, text, call.timestamp, call.duration_ms));
                    phase = TurnPhase::Terminal;
                }

                TurnPhase::Terminal => {
                    let node = self.graph.final_node();
                    let call = self.invoke(node, arena.current()).await;
                    let text = match call.result {
                        Ok(outcome) => outcome.text,
                        Err(e) => {
                            error!(node, error = %e, "Error calling LLM");
                            format!("Error calling LLM: {}", e)
                        }
                    };

                    arena.apply(
                        RoutePatch::new()
                            .append(tag(node, &text))
                            .prompt(self.graph.prompt(node).unwrap_or_default())
                            .response(text.clone()),
                    );
                    steps.push(step(node, phase, call.input, text, call.timestamp, call.duration_ms));
                    break;
                }
            }
        }

        let state = arena.current();
        let response = final_response(state, self.graph.final_node());
        info!(turn = %turn_id, routed_to = %target, steps = steps.len(), "Turn completed");

        let output = WorkflowOutput {
            turn_id,
            response,
            routed_to: target,
            routing_status: state.routing_status.clone(),
            steps,
            message_log: state.message_log.clone(),
            tool_result,
        };
        (output, arena)
    }
}

fn step(
    node_id: &str,
    phase: TurnPhase,
    input: String,
    output: String,
    timestamp: i64,
    duration_ms: u64,
) -> WorkflowStep {
    WorkflowStep {
        node_id: node_id.to_string(),
        phase,
        input,
        output,
        timestamp,
        duration_ms,
    }
}

/// Last `[final_node]` entry, else the state's response, else [`NO_RESPONSE`].
pub fn final_response(state: &ConversationState, final_node: &str) -> String {
    if let Some(text) = state.last_tagged(final_node) {
        return text.to_string();
    }
    if !state.response.is_empty() {
        return state.response.clone();
    }
    NO_RESPONSE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::state::RoutePatch;

    #[test]
    fn test_final_response_prefers_tagged_entry() {
        let state = ConversationState::new("q", vec![]).merged(
            RoutePatch::new()
                .append(tag("responder", " first "))
                .append(tag("vector_db_agent", "docs"))
                .append(tag("responder", " final answer "))
                .response("docs"),
        );
        assert_eq!(final_response(&state, "responder"), "final answer");
    }

    #[test]
    fn test_final_response_falls_back_to_response() {
        let state = ConversationState::new("q", vec![])
            .merged(RoutePatch::new().append(tag("other", "x")).response("carried"));
        assert_eq!(final_response(&state, "responder"), "carried");
    }

    #[test]
    fn test_final_response_default() {
        let state = ConversationState::new("q", vec![]);
        assert_eq!(final_response(&state, "responder"), NO_RESPONSE);
    }

    #[test]
    fn test_turn_phase_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&TurnPhase::Terminal).unwrap(), "\"terminal\"");
    }
}
