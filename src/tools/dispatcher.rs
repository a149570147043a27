//! HTTP client for the external tool execution service.
//!
//! A payload `{tool, method, data}` becomes a request to `<base>/<tool>`.
//! `GET` sends `data` as query parameters, every other method sends the
//! whole payload as a JSON body. Outcomes are always returned as JSON values:
//!
//! | Outcome | Result |
//! |---------|--------|
//! | tool name is not a single path segment | `{"error": "invalid tool name: ...", "statusCode": null}` |
//! | transport failure or non-2xx | `{"error": "HTTP error: ...", "statusCode": <code or null>}` |
//! | 2xx, empty body | `{"error": "empty response", "statusCode": <code>}` |
//! | 2xx, body is not JSON | `{"error": "invalid JSON response", "rawResponse": ..., "statusCode": <code>}` |
//! | 2xx, JSON body | the parsed body |

use crate::tools::payload::ToolPayload;
use crate::types::{AppError, Result};
use crate::utils::toml_config::ToolsConfig;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ToolDispatcher {
    client: Client,
    base_url: String,
}

impl ToolDispatcher {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Tool(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ToolsConfig) -> Result<Self> {
        Self::new(&config.service_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `<base>/<tool>`, or `None` when the name would leave the service prefix.
    pub fn url_for(&self, tool: &str) -> Option<String> {
        is_path_segment(tool).then(|| format!("{}/{}", self.base_url, tool))
    }

    /// Call the tool execution service. Never returns an error; failures are
    /// classified into an error payload.
    pub async fn dispatch(&self, payload: &ToolPayload) -> Value {
        let Some(url) = self.url_for(&payload.tool) else {
            warn!(tool = %payload.tool, "Refusing to dispatch tool with an invalid name");
            return json!({
                "error": format!("invalid tool name: '{}'", payload.tool),
                "statusCode": Value::Null,
            });
        };
        let method_name = payload.http_method();
        info!(url = %url, method = %method_name, "Calling tool execution service");

        let request = if method_name == "GET" {
            let params: Vec<(String, String)> = payload
                .data
                .iter()
                .map(|(key, value)| (key.clone(), query_value(value)))
                .collect();
            self.client.get(&url).query(&params)
        } else {
            let method = match Method::from_bytes(method_name.as_bytes()) {
                Ok(method) => method,
                Err(_) => {
                    return json!({
                        "error": format!("HTTP error: unsupported method '{}'", method_name),
                        "statusCode": Value::Null,
                    });
                }
            };
            self.client.request(method, &url).json(payload)
        };

        let response = match request
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, error = %e, "Tool execution service unreachable");
                return json!({
                    "error": format!("HTTP error: {}", e),
                    "statusCode": e.status().map(|s| s.as_u16()),
                });
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "Tool execution service returned an error status");
            return json!({
                "error": format!("HTTP error: {} returned status {}", url, status),
                "statusCode": status.as_u16(),
            });
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return json!({
                    "error": format!("HTTP error: failed to read response body: {}", e),
                    "statusCode": status.as_u16(),
                });
            }
        };

        if body.trim().is_empty() {
            warn!(url = %url, "Tool execution service returned an empty body");
            return json!({
                "error": "empty response",
                "statusCode": status.as_u16(),
            });
        }

        match serde_json::from_str::<Value>(&body) {
            Ok(parsed) => {
                debug!(url = %url, "Tool call succeeded");
                parsed
            }
            Err(_) => {
                warn!(url = %url, "Tool execution service returned non-JSON body");
                json!({
                    "error": "invalid JSON response",
                    "rawResponse": body,
                    "statusCode": status.as_u16(),
                })
            }
        }
    }
}

fn is_path_segment(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_joins_cleanly() {
        let dispatcher =
            ToolDispatcher::new("http://localhost:3000/", Duration::from_secs(1)).unwrap();
        assert_eq!(dispatcher.base_url(), "http://localhost:3000");
        assert_eq!(
            dispatcher.url_for("lookup_patient").as_deref(),
            Some("http://localhost:3000/lookup_patient")
        );
    }

    #[test]
    fn test_url_for_rejects_names_outside_the_prefix() {
        let dispatcher = ToolDispatcher::new("http://localhost:3000/tools", Duration::from_secs(1)).unwrap();
        for name in ["../admin", "/lookup", "a/b", "..", ".", "", "lookup?x=1", "lookup#frag", "a b"] {
            assert_eq!(dispatcher.url_for(name), None, "name {name:?}");
        }
    }

    #[test]
    fn test_query_value_rendering() {
        assert_eq!(query_value(&json!("x")), "x");
        assert_eq!(query_value(&json!(5)), "5");
        assert_eq!(query_value(&json!(true)), "true");
    }
}
