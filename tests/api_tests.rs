//! HTTP surface tests over an in-process server.

mod common;

use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use common::mocks::MockLLMClient;
use common::UNREACHABLE_TOOLS;
use graphflow::api::build_app;
use graphflow::{AppError, AppState, GraphflowConfig};
use serde_json::{json, Value};
use std::sync::Arc;

fn create_test_server(llm: MockLLMClient) -> TestServer {
    let engine = common::engine(Arc::new(llm), common::medical_store(), UNREACHABLE_TOOLS);
    let state = AppState::new(GraphflowConfig::default(), engine);
    TestServer::new(build_app(state)).expect("Failed to create test server")
}

fn routed_llm() -> MockLLMClient {
    MockLLMClient::new("unused")
        .on("Role: Supervisor", "vector_db")
        .on("Role: Responder", "Asthma causes wheezing.")
}

// ============= Health =============

#[tokio::test]
async fn test_health() {
    let server = create_test_server(MockLLMClient::new("ok"));

    let response = server.get("/api/health").await;
    response.assert_status_ok();
    response.assert_json(&json!({"status": "ok"}));
}

#[tokio::test]
async fn test_routes_live_under_prefix() {
    let server = create_test_server(MockLLMClient::new("ok"));

    server.get("/health").await.assert_status_not_found();
}

#[tokio::test]
async fn test_cors_allows_any_origin_by_default() {
    let server = create_test_server(MockLLMClient::new("ok"));

    let response = server
        .get("/api/health")
        .add_header(
            HeaderName::from_static("origin"),
            HeaderValue::from_static("http://localhost:5173"),
        )
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("access-control-allow-origin"), "*");
}

// ============= Chat =============

#[tokio::test]
async fn test_chat_returns_final_response() {
    let server = create_test_server(routed_llm());

    let response = server
        .post("/api/chat")
        .json(&json!({"query": "What are the symptoms of asthma?"}))
        .await;

    response.assert_status_ok();
    response.assert_json(&json!({"response": "Asthma causes wheezing."}));
}

#[tokio::test]
async fn test_chat_accepts_history() {
    let llm = Arc::new(routed_llm());
    let engine = common::engine(llm.clone(), common::medical_store(), UNREACHABLE_TOOLS);
    let server =
        TestServer::new(build_app(AppState::new(GraphflowConfig::default(), engine))).unwrap();

    let response = server
        .post("/api/chat")
        .json(&json!({
            "query": "And asthma?",
            "conversation_history": [
                {"role": "user", "content": "What is diabetes?"},
                {"role": "assistant", "content": "A metabolic disease."}
            ]
        }))
        .await;

    response.assert_status_ok();
    let entry = &llm.calls_matching("Role: Supervisor")[0];
    assert_eq!(
        entry.prompt,
        "And asthma?\n\nPrevious User Conversations:\nuser: What is diabetes?\nassistant: A metabolic disease."
    );
}

#[tokio::test]
async fn test_chat_rejects_blank_query() {
    let server = create_test_server(routed_llm());

    let response = server.post("/api/chat").json(&json!({"query": "   "})).await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["error"], "query must not be empty");
}

#[tokio::test]
async fn test_chat_model_failure_is_still_a_response() {
    let server = create_test_server(MockLLMClient::failing());

    let response = server.post("/api/chat").json(&json!({"query": "hello"})).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["response"]
        .as_str()
        .unwrap()
        .starts_with("Error calling LLM:"));
}

// ============= Workflow =============

#[tokio::test]
async fn test_workflow_run_returns_steps() {
    let server = create_test_server(routed_llm());

    let response = server
        .post("/api/workflow/run")
        .json(&json!({"query": "asthma symptoms"}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["response"], "Asthma causes wheezing.");
    assert_eq!(body["routed_to"], "vector_db_agent");
    assert_eq!(body["routing_status"], "vector_db_completed");
    assert_eq!(body["steps"].as_array().unwrap().len(), 4);
    assert_eq!(body["steps"][0]["phase"], "entry");
    assert_eq!(body["steps"][1]["node_id"], "router");
    assert_eq!(body["message_log"][1], "[router] vector_db_agent");
    assert!(body.get("tool_result").is_none());
}

#[tokio::test]
async fn test_workflow_summary() {
    let server = create_test_server(MockLLMClient::new("ok"));

    let response = server.get("/api/workflow").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["entry_node"], "supervisor_agent");
    assert_eq!(body["final_node"], "response_agent");
    assert_eq!(body["fallback_node"], "fallback_agent");

    let targets: Vec<&str> = body["routing_targets"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert_eq!(targets, vec!["vector_db_agent", "tools_agent", "fallback_agent"]);
    assert_eq!(body["route_table"][0]["keyword"], "vector_db_agent");
}

#[tokio::test]
async fn test_openapi_document() {
    let server = create_test_server(MockLLMClient::new("ok"));

    let response = server.get("/api/openapi.json").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["paths"].get("/api/chat").is_some());
    assert!(body["paths"].get("/api/workflow/run").is_some());
}

// ============= Startup =============

fn write_deployment(dir: &std::path::Path, workflow: &str) -> std::path::PathBuf {
    std::fs::write(dir.join("agents.toml"), workflow).unwrap();
    let config = dir.join("graphflow.toml");
    std::fs::write(
        &config,
        r#"
[llm]
provider = "ollama"
model = "llama3.2"

[vector_store]
provider = "memory"
collection = "medical_documents"

[workflow]
path = "agents.toml"
"#,
    )
    .unwrap();
    config
}

#[cfg(feature = "ollama")]
#[tokio::test]
async fn test_state_from_config_wires_every_service() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_deployment(dir.path(), common::WORKFLOW);

    let config = GraphflowConfig::load(&path).unwrap();
    let state = AppState::from_config(config).await.unwrap();

    assert_eq!(state.engine.graph().entry_node(), "supervisor_agent");
    assert_eq!(state.engine.graph().fallback_node(), "fallback_agent");
}

#[tokio::test]
async fn test_invalid_workflow_is_a_startup_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_deployment(
        dir.path(),
        r#"
[flow]
entry_node = "supervisor_agent"
final_node = "missing_agent"

[[agents]]
name = "supervisor_agent"
prompt = "route"
"#,
    );

    let config = GraphflowConfig::load(&path).unwrap();
    let result = AppState::from_config(config).await;

    assert!(matches!(result, Err(AppError::Configuration(_))));
}
