use crate::AppState;
use crate::api::handlers::{chat, health, workflows};
use crate::types::{ChatRequest, ChatResponse, HealthResponse, HistoryEntry};
use crate::workflows::compiler::{GraphSummary, RouteEntry, TargetSummary};
use crate::workflows::engine::{TurnPhase, WorkflowOutput, WorkflowStep};
use axum::{
    Json, Router,
    http::HeaderValue,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        chat::chat,
        workflows::run_workflow,
        workflows::workflow_summary,
    ),
    components(schemas(
        ChatRequest,
        ChatResponse,
        HealthResponse,
        HistoryEntry,
        GraphSummary,
        RouteEntry,
        TargetSummary,
        TurnPhase,
        WorkflowOutput,
        WorkflowStep,
    )),
    tags(
        (name = "chat", description = "Conversation turns"),
        (name = "workflow", description = "Workflow graph"),
        (name = "health", description = "Health check")
    )
)]
pub struct ApiDoc;

/// API routes, to be nested under the configured prefix.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/chat", post(chat::chat))
        .route("/workflow", get(workflows::workflow_summary))
        .route("/workflow/run", post(workflows::run_workflow))
        .route("/openapi.json", get(openapi))
}

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// CORS layer for the configured origins; any origin when the list is empty.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}
