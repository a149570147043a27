//! Mock implementations for testing.
//!
//! Shared by the integration test files so that none of them needs a model
//! server, a vector database or a tool service.

#![allow(dead_code)]

use async_trait::async_trait;
use graphflow::db::{SearchOutcome, VectorSearch, VectorStatus};
use graphflow::llm::LLMClient;
use graphflow::types::{AppError, Result};
use mockall::mock;
use parking_lot::Mutex;

#[derive(Clone)]
enum Reply {
    Text(String),
    Fail,
}

/// One recorded model call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: String,
    pub prompt: String,
}

/// Scripted LLM client.
///
/// Replies are chosen by the first rule whose needle occurs in the system
/// prompt; every node prompt starts with `Role: <role>`, so a needle such as
/// `"Role: Supervisor"` targets a single node.
///
/// ```ignore
/// let llm = MockLLMClient::new("default answer")
///     .on("Role: Supervisor", "vector_db")
///     .fail_on("Role: Responder");
/// ```
pub struct MockLLMClient {
    rules: Vec<(String, Reply)>,
    default: Reply,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockLLMClient {
    /// Client answering `response` to anything without a matching rule.
    pub fn new(response: &str) -> Self {
        Self {
            rules: Vec::new(),
            default: Reply::Text(response.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Client whose every call fails.
    pub fn failing() -> Self {
        Self {
            rules: Vec::new(),
            default: Reply::Fail,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn on(mut self, needle: &str, response: &str) -> Self {
        self.rules
            .push((needle.to_string(), Reply::Text(response.to_string())));
        self
    }

    pub fn fail_on(mut self, needle: &str) -> Self {
        self.rules.push((needle.to_string(), Reply::Fail));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Calls whose system prompt contains `needle`.
    pub fn calls_matching(&self, needle: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.system.contains(needle))
            .collect()
    }

    fn reply(&self, system: &str, prompt: &str) -> Result<String> {
        self.calls.lock().push(RecordedCall {
            system: system.to_string(),
            prompt: prompt.to_string(),
        });

        let reply = self
            .rules
            .iter()
            .find(|(needle, _)| system.contains(needle.as_str()))
            .map(|(_, reply)| reply)
            .unwrap_or(&self.default);

        match reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Fail => Err(AppError::LLM("Mock LLM failure".to_string())),
        }
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.reply(system, prompt)
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

// Vector store with per-test expectations
mock! {
    pub Store {}

    #[async_trait]
    impl VectorSearch for Store {
        fn provider_name(&self) -> &'static str;
        async fn status(&self) -> VectorStatus;
        async fn search(&self, query: &str, k: usize) -> Result<SearchOutcome>;
    }
}
