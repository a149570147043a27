use crate::agents::router::{is_routing_prompt, normalize_decision};
use crate::agents::{NodeContext, NodeHandler, NodeOutcome};
use crate::llm::LLMClient;
use crate::types::Result;
use crate::workflows::definition::NodeKind;
use crate::workflows::state::ConversationState;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Plain model-backed node.
///
/// Routing prompts (the entry node's) get their answer normalized so the
/// resolver sees a bare keyword.
pub struct ModelNode {
    llm: Arc<dyn LLMClient>,
}

impl ModelNode {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self { llm }
    }

    /// System prompt for a node, continuing from a specialised node's result
    /// when the state carries one.
    ///
    /// Only `<keyword>_completed` / `<keyword>_error` count; the router's own
    /// `routed` / `fallback` marks do not.
    pub fn system_prompt(prompt: &str, state: &ConversationState) -> String {
        if !state.response.is_empty() && is_specialised_status(&state.routing_status) {
            format!(
                "\nPrevious Router Response: {}\nRouting Status: {}\nCurrent Prompt: {}\n\n\
                 Please continue from the previous response and provide the appropriate response based on the routing context.\n",
                state.response, state.routing_status, prompt
            )
        } else {
            format!("\nPrompt: {}\n", prompt)
        }
    }
}

fn is_specialised_status(status: &str) -> bool {
    status.ends_with("_completed") || status.ends_with("_error")
}

#[async_trait]
impl NodeHandler for ModelNode {
    async fn execute(&self, ctx: &NodeContext<'_>) -> Result<NodeOutcome> {
        let system = Self::system_prompt(ctx.prompt, ctx.state);
        debug!(node = ctx.node_id, model = self.llm.model_name(), "Calling model");

        let answer = self.llm.generate_with_system(&system, ctx.input).await?;

        if is_routing_prompt(ctx.prompt) {
            let route = normalize_decision(&answer);
            debug!(node = ctx.node_id, raw = %answer, route = %route, "Routing answer");
            return Ok(NodeOutcome::text(route));
        }

        Ok(NodeOutcome::text(answer))
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Model
    }
}
