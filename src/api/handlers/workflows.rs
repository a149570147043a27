//! Workflow inspection and execution handlers

use crate::{
    AppState,
    types::{AppError, ChatRequest, Result},
    workflows::{GraphSummary, WorkflowOutput},
};
use axum::{Json, extract::State};

/// Run one turn and return every step of it
///
/// Same input as `/api/chat`, but the response carries the routing decision,
/// the per-node steps, the message log and any tool result.
#[utoipa::path(
    post,
    path = "/api/workflow/run",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Workflow executed successfully", body = WorkflowOutput),
        (status = 400, description = "Invalid input")
    ),
    tag = "workflow"
)]
pub async fn run_workflow(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<WorkflowOutput>> {
    let query = payload.query.trim();
    if query.is_empty() {
        return Err(AppError::InvalidInput("query must not be empty".to_string()));
    }

    Ok(Json(
        state.engine.run(query, payload.conversation_history).await,
    ))
}

/// Describe the compiled workflow graph
#[utoipa::path(
    get,
    path = "/api/workflow",
    responses(
        (status = 200, description = "Compiled graph summary", body = GraphSummary)
    ),
    tag = "workflow"
)]
pub async fn workflow_summary(State(state): State<AppState>) -> Json<GraphSummary> {
    Json(state.engine.graph().summary())
}
