//! # graphflow - config-driven agent orchestration
//!
//! Routes each user query through a small graph of model-backed agents that
//! is declared in TOML, chosen at runtime from the entry agent's free-text
//! answer, and finished by a final response agent.
//!
//! ## Overview
//!
//! graphflow can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `graphflow-server` binary
//! 2. **As a library** - Compile a workflow and drive the engine yourself
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use graphflow::{compile, AgentRegistry, NodeServices, WorkflowDefinition, WorkflowEngine};
//! use std::sync::Arc;
//!
//! let definition = WorkflowDefinition::load("agents.toml")?;
//! let graph = Arc::new(compile(&definition)?);
//!
//! let agents = Arc::new(AgentRegistry::from_services(services));
//! let engine = WorkflowEngine::with_keyword_routing(graph, agents)?;
//!
//! let output = engine.run("What are the symptoms of asthma?", vec![]).await;
//! println!("{} (via {})", output.response, output.routed_to);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama local inference (default) |
//! | `openai` | OpenAI API support |
//!
//! ## Modules
//!
//! - [`workflows`] - Workflow definition, compiler, state and engine
//! - [`agents`] - Node handlers and the keyword route resolver
//! - [`tools`] - Tool payload extraction, dispatch and catalog
//! - [`db`] - Document stores for the retrieval node
//! - [`ingest`] - Loading, chunking and storing documents for retrieval
//! - [`llm`] - LLM client implementations
//! - [`api`] - REST API handlers and routes
//! - [`types`] - Common types and error handling
//!
//! ## Architecture
//!
//! Two TOML files drive a deployment:
//!
//! - **`graphflow.toml`**: Infrastructure config (server, model provider,
//!   vector store, tool service)
//! - **`agents.toml`**: The workflow (entry/final nodes and agents)
//!
//! The workflow is compiled once at startup; a malformed workflow aborts
//! startup. Each request then runs one turn over the shared compiled graph.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// Workflow node handlers and route resolution.
pub mod agents;
/// HTTP API handlers and routes.
pub mod api;
/// Command-line interface.
pub mod cli;
/// Vector stores (ChromaDB, in-memory).
pub mod db;
/// Document ingestion into the retrieval collection.
pub mod ingest;
/// LLM provider clients and abstractions.
pub mod llm;
/// Tool payload extraction and dispatch.
pub mod tools;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;
/// Workflow compiler and execution engine.
pub mod workflows;

// Re-export commonly used types
pub use agents::{AgentRegistry, KeywordRouteResolver, NodeServices, RouteResolver};
pub use db::{create_store, VectorSearch};
pub use llm::{LLMClient, LLMClientFactory, Provider};
pub use tools::{ToolDispatcher, ToolRegistry};
pub use types::{AppError, Result};
pub use utils::toml_config::GraphflowConfig;
pub use workflows::{compile, CompiledGraph, WorkflowDefinition, WorkflowEngine, WorkflowOutput};

use std::sync::Arc;
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Loaded `graphflow.toml`
    pub config: Arc<GraphflowConfig>,
    /// Engine over the compiled workflow graph
    pub engine: Arc<WorkflowEngine>,
}

impl AppState {
    pub fn new(config: GraphflowConfig, engine: WorkflowEngine) -> Self {
        Self {
            config: Arc::new(config),
            engine: Arc::new(engine),
        }
    }

    /// Load and compile the workflow and connect every collaborator named in
    /// the config.
    ///
    /// # Errors
    ///
    /// Any failure here is a startup failure: an unreadable or invalid
    /// workflow, a provider whose feature is disabled, or a missing API key.
    pub async fn from_config(config: GraphflowConfig) -> Result<Self> {
        let graph = Arc::new(load_graph(&config)?);

        let llm = LLMClientFactory::from_config(&config.llm)?
            .create_default()
            .await?;
        info!(model = llm.model_name(), "LLM client ready");

        let vector_store = create_store(&config.vector_store)?;
        info!(
            provider = vector_store.provider_name(),
            collection = %config.vector_store.collection,
            "Vector store ready"
        );

        let services = NodeServices {
            llm,
            vector_store,
            dispatcher: ToolDispatcher::from_config(&config.tools)?,
            tools: Arc::new(ToolRegistry::from_catalog(&config.tools.catalog)),
            top_k: config.vector_store.top_k,
        };

        let engine =
            WorkflowEngine::with_keyword_routing(graph, Arc::new(AgentRegistry::from_services(services)))?;
        Ok(Self::new(config, engine))
    }
}

/// Read and compile the workflow file named by `[workflow] path`.
pub fn load_graph(config: &GraphflowConfig) -> Result<CompiledGraph> {
    let definition = WorkflowDefinition::load(&config.workflow.path)?;
    compile(&definition)
}
