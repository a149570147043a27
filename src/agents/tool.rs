use crate::agents::model::ModelNode;
use crate::agents::{completed_status, error_status, NodeContext, NodeHandler, NodeOutcome};
use crate::llm::LLMClient;
use crate::tools::payload::{extract_tool_payload, is_error_payload, ToolPayload};
use crate::tools::{ToolDispatcher, ToolRegistry};
use crate::types::{AppError, Result};
use crate::workflows::definition::NodeKind;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Asks the model for a `{tool, method, data}` call, recovers it from the
/// answer and forwards it to the tool execution service.
pub struct ToolNode {
    llm: Arc<dyn LLMClient>,
    dispatcher: ToolDispatcher,
    registry: Arc<ToolRegistry>,
}

impl ToolNode {
    pub fn new(
        llm: Arc<dyn LLMClient>,
        dispatcher: ToolDispatcher,
        registry: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            llm,
            dispatcher,
            registry,
        }
    }

    /// Node prompt followed by the clock and the tool catalog.
    pub fn tool_prompt(&self, prompt: &str, now: DateTime<Local>) -> String {
        format!(
            "{}\ncurrent_date = {}\ncurrent_time = {}\navailable_tools = {}\n",
            prompt,
            now.format("%Y-%m-%d"),
            now.format("%H:%M:%S"),
            self.registry.render_catalog()
        )
    }

    async fn invoke(&self, ctx: &NodeContext<'_>) -> Result<Value> {
        let prompt = self.tool_prompt(ctx.prompt, Local::now());
        let system = ModelNode::system_prompt(&prompt, ctx.state);
        let raw = self
            .llm
            .generate_with_system(&system, &ctx.state.input)
            .await?;

        let extracted = extract_tool_payload(&Value::String(raw));
        if is_error_payload(&extracted) {
            warn!(node = ctx.node_id, "No tool call in model output");
            return Ok(extracted);
        }

        let mut payload = ToolPayload::from_value(&extracted).map_err(AppError::Tool)?;
        // an empty catalog leaves the choice to the service
        if !self.registry.is_empty() && !self.registry.has_tool(&payload.tool) {
            return Err(AppError::Tool(format!(
                "Tool '{}' is not in the catalog (available: {})",
                payload.tool,
                self.registry.tool_names().join(", ")
            )));
        }
        if payload.method.is_none() {
            payload.method = self.registry.default_method(&payload.tool);
        }

        info!(node = ctx.node_id, tool = %payload.tool, method = %payload.http_method(), "Dispatching tool call");
        Ok(self.dispatcher.dispatch(&payload).await)
    }
}

#[async_trait]
impl NodeHandler for ToolNode {
    async fn execute(&self, ctx: &NodeContext<'_>) -> Result<NodeOutcome> {
        match self.invoke(ctx).await {
            Ok(result) => {
                if let Some(err) = result.get("error") {
                    warn!(node = ctx.node_id, error = %err, "Tool call returned an error payload");
                }
                Ok(NodeOutcome::text(result.to_string())
                    .with_status(completed_status(self.kind()))
                    .with_tool_result(result))
            }
            Err(e) => {
                error!(node = ctx.node_id, error = %e, "Tool node failed");
                Ok(NodeOutcome::text(format!(
                    "I encountered an error while processing the request: {}. \
                     Please try again or rephrase your question.",
                    e
                ))
                .with_status(error_status(self.kind())))
            }
        }
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Tools
    }
}
