//! HTTP API Handlers and Routes
//!
//! Built on the Axum web framework. All routes are nested under the
//! configured prefix (`/api` by default).
//!
//! # API Endpoints
//!
//! - `GET /api/health` - Health check
//! - `POST /api/chat` - Run one turn, returns `{response}`
//! - `POST /api/workflow/run` - Run one turn, returns the full workflow output
//! - `GET /api/workflow` - Compiled graph summary (entry, final, fallback, route table)
//! - `GET /api/openapi.json` - OpenAPI document

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

use crate::AppState;
use axum::Router;
use tower_http::trace::TraceLayer;

/// Full application router with CORS and request tracing.
pub fn build_app(state: AppState) -> Router {
    let prefix = normalize_prefix(&state.config.server.api_prefix);
    let cors = routes::cors_layer(&state.config.server.allowed_origins);

    let api = routes::create_router();
    let router = if prefix.is_empty() {
        api
    } else {
        Router::new().nest(&prefix, api)
    };

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `api/` → `/api`; `/` or empty → no prefix.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
