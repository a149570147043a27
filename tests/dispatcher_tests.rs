//! Tool execution service calls against a local mock server.

use graphflow::tools::{ToolDispatcher, ToolPayload};
use rstest::rstest;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn payload(value: Value) -> ToolPayload {
    ToolPayload::from_value(&value).unwrap()
}

fn dispatcher(server: &MockServer) -> ToolDispatcher {
    ToolDispatcher::new(server.uri(), Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn test_get_sends_data_as_query_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search_doctors"))
        .and(query_param("specialty", "cardiology"))
        .and(query_param("limit", "5"))
        .and(query_param("open", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"doctors": ["Dr. Lee"]})))
        .expect(1)
        .mount(&server)
        .await;

    let result = dispatcher(&server)
        .dispatch(&payload(json!({
            "tool": "search_doctors",
            "method": "get",
            "data": {"specialty": "cardiology", "limit": 5, "open": true}
        })))
        .await;

    assert_eq!(result, json!({"doctors": ["Dr. Lee"]}));
}

#[tokio::test]
async fn test_post_sends_whole_payload_as_body() {
    let server = MockServer::start().await;
    let call = json!({
        "tool": "book_appointment",
        "method": "POST",
        "data": {"doctor": "Dr. Lee", "slot": "09:00"},
        "reason": "checkup"
    });
    Mock::given(method("POST"))
        .and(path("/book_appointment"))
        .and(body_json(call.clone()))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"booked": true})))
        .expect(1)
        .mount(&server)
        .await;

    let result = dispatcher(&server).dispatch(&payload(call)).await;

    assert_eq!(result, json!({"booked": true}));
}

#[tokio::test]
async fn test_missing_method_defaults_to_post() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"pong": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let result = dispatcher(&server)
        .dispatch(&payload(json!({"tool": "ping"})))
        .await;

    assert_eq!(result["pong"], 1);
}

#[rstest]
#[case(404)]
#[case(500)]
#[case(503)]
#[tokio::test]
async fn test_error_status_is_classified(#[case] status: u16) {
    let server = MockServer::start().await;
    Mock::given(path("/lookup"))
        .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
        .mount(&server)
        .await;

    let result = dispatcher(&server)
        .dispatch(&payload(json!({"tool": "lookup"})))
        .await;

    assert_eq!(result["statusCode"], status);
    assert!(result["error"].as_str().unwrap().starts_with("HTTP error:"));
}

#[tokio::test]
async fn test_empty_body() {
    let server = MockServer::start().await;
    Mock::given(path("/lookup"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let result = dispatcher(&server)
        .dispatch(&payload(json!({"tool": "lookup"})))
        .await;

    assert_eq!(result, json!({"error": "empty response", "statusCode": 204}));
}

#[tokio::test]
async fn test_non_json_body_keeps_raw_text() {
    let server = MockServer::start().await;
    Mock::given(path("/lookup"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&server)
        .await;

    let result = dispatcher(&server)
        .dispatch(&payload(json!({"tool": "lookup"})))
        .await;

    assert_eq!(result["error"], "invalid JSON response");
    assert_eq!(result["rawResponse"], "<html>ok</html>");
    assert_eq!(result["statusCode"], 200);
}

#[tokio::test]
async fn test_name_leaving_the_service_prefix_is_refused() {
    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = dispatcher(&server)
        .dispatch(&payload(json!({"tool": "../admin", "method": "GET"})))
        .await;

    assert_eq!(result["error"], "invalid tool name: '../admin'");
    assert!(result["statusCode"].is_null());
}

#[tokio::test]
async fn test_unreachable_service() {
    let dispatcher = ToolDispatcher::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();

    let result = dispatcher
        .dispatch(&payload(json!({"tool": "lookup"})))
        .await;

    assert!(result["error"].as_str().unwrap().starts_with("HTTP error:"));
    assert!(result["statusCode"].is_null());
}
