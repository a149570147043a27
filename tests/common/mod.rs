#![allow(dead_code)]

pub mod mocks;

use graphflow::agents::{AgentRegistry, NodeServices};
use graphflow::db::{InMemoryVectorSearch, SearchHit, VectorSearch};
use graphflow::llm::LLMClient;
use graphflow::tools::{ToolDispatcher, ToolRegistry};
use graphflow::utils::toml_config::ToolEntry;
use graphflow::workflows::{compile, CompiledGraph, WorkflowDefinition, WorkflowEngine};
use std::sync::Arc;
use std::time::Duration;

pub const COLLECTION: &str = "medical_documents";

/// Nothing listens on the discard port.
pub const UNREACHABLE_TOOLS: &str = "http://127.0.0.1:9";

/// Supervisor, three routing targets and a responder.
pub const WORKFLOW: &str = r#"
[flow]
entry_node = "supervisor_agent"
final_node = "response_agent"

[[agents]]
name = "supervisor_agent"
role = "Supervisor"
description = "Classifies each query"
prompt = "Pick the agent that should answer."

[[agents]]
name = "vector_db_agent"
role = "Researcher"
description = "Searches the medical vector database"
prompt = "Find supporting documents."

[[agents]]
name = "tools_agent"
role = "Operator"
description = "Runs operations through tools"
prompt = "Emit exactly one tool call as JSON."

[[agents]]
name = "fallback_agent"
role = "Generalist"
description = "Default fallback for everything else"
prompt = "Answer directly."

[[agents]]
name = "response_agent"
role = "Responder"
description = "Writes the final answer"
prompt = "Write the final answer for the user."
"#;

pub fn graph() -> Arc<CompiledGraph> {
    let definition = WorkflowDefinition::from_toml_str(WORKFLOW).unwrap();
    Arc::new(compile(&definition).unwrap())
}

pub fn medical_store() -> Arc<InMemoryVectorSearch> {
    let store = InMemoryVectorSearch::new(COLLECTION);
    store.add(
        SearchHit::new("Asthma symptoms include wheezing, coughing and shortness of breath.")
            .with_metadata("file_name", "asthma.pdf")
            .with_metadata("file_type", "pdf"),
    );
    store.add(
        SearchHit::new("Diabetes is managed with diet, exercise and insulin.")
            .with_metadata("file_name", "diabetes.txt")
            .with_metadata("file_type", "txt"),
    );
    Arc::new(store)
}

pub fn lookup_tool() -> ToolEntry {
    ToolEntry {
        name: "lookup_patient".to_string(),
        description: "Fetch a patient record by id".to_string(),
        method: "GET".to_string(),
        parameters: serde_json::json!({"id": "integer"}),
    }
}

pub fn booking_tool() -> ToolEntry {
    ToolEntry {
        name: "book_appointment".to_string(),
        description: "Book an appointment slot".to_string(),
        method: "POST".to_string(),
        parameters: serde_json::json!({"slot": "string"}),
    }
}

pub fn services(
    llm: Arc<dyn LLMClient>,
    store: Arc<dyn VectorSearch>,
    tools_url: &str,
) -> NodeServices {
    NodeServices {
        llm,
        vector_store: store,
        dispatcher: ToolDispatcher::new(tools_url, Duration::from_secs(2)).unwrap(),
        tools: Arc::new(ToolRegistry::from_catalog(&[lookup_tool(), booking_tool()])),
        top_k: 3,
    }
}

pub fn engine(llm: Arc<dyn LLMClient>, store: Arc<dyn VectorSearch>, tools_url: &str) -> WorkflowEngine {
    let agents = Arc::new(AgentRegistry::from_services(services(llm, store, tools_url)));
    WorkflowEngine::with_keyword_routing(graph(), agents).unwrap()
}
