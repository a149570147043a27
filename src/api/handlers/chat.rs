use crate::{
    AppState,
    types::{AppError, ChatRequest, ChatResponse, Result},
};
use axum::{Json, extract::State};

/// Run one conversation turn and return the final answer
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Chat response", body = ChatResponse),
        (status = 400, description = "Invalid input")
    ),
    tag = "chat"
)]
pub async fn chat(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    let query = payload.query.trim();
    if query.is_empty() {
        return Err(AppError::InvalidInput("query must not be empty".to_string()));
    }

    let output = state.engine.run(query, payload.conversation_history).await;

    Ok(Json(ChatResponse {
        response: output.response,
    }))
}
