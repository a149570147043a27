//! The sample deployment shipped at the repository root.

use graphflow::utils::toml_config::{LlmConfig, VectorBackend};
use graphflow::workflows::NodeKind;
use graphflow::{load_graph, GraphflowConfig, KeywordRouteResolver, RouteResolver};
use std::path::PathBuf;

fn sample_config() -> GraphflowConfig {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("graphflow.toml");
    let content = std::fs::read_to_string(&path).unwrap();
    let mut config: GraphflowConfig = toml::from_str(&content).unwrap();
    config.workflow.path = path.parent().unwrap().join(&config.workflow.path);
    config.validate().unwrap();
    config
}

#[test]
fn test_sample_config_parses() {
    let config = sample_config();

    assert!(matches!(config.llm, LlmConfig::Ollama { .. }));
    assert_eq!(config.vector_store.provider, VectorBackend::ChromaDB);
    assert_eq!(config.vector_store.resolved_port(), 5001);
    assert_eq!(config.tools.catalog.len(), 3);
    assert_eq!(config.bind_address(), "127.0.0.1:8000");
    assert!(config.ingest.data_dir.ends_with("data"));
    assert_eq!(config.ingest.chunk_size, 350);
    assert_eq!(config.ingest.chunk_overlap, 50);
}

#[test]
fn test_sample_workflow_compiles() {
    let graph = load_graph(&sample_config()).unwrap();

    assert_eq!(graph.entry_node(), "supervisor_agent");
    assert_eq!(graph.final_node(), "response_agent");
    assert_eq!(graph.fallback_node(), "fallback_agent");
    assert_eq!(graph.kind("vector_db_agent"), NodeKind::VectorDb);
    assert_eq!(graph.kind("tools_agent"), NodeKind::Tools);
    assert_eq!(graph.kind("fallback_agent"), NodeKind::Model);
}

#[test]
fn test_sample_routing_keywords() {
    let graph = load_graph(&sample_config()).unwrap();
    let resolver = KeywordRouteResolver::from_graph(&graph);

    for (answer, target) in [
        ("vector_db", "vector_db_agent"),
        ("Tools.", "tools_agent"),
        ("'fallback'", "fallback_agent"),
        ("no idea", "fallback_agent"),
    ] {
        assert_eq!(resolver.resolve(Some(answer)).target, target, "answer {answer:?}");
    }

    let prompt = graph.prompt("supervisor_agent").unwrap();
    assert!(prompt.contains("Return only **one word** from: 'vector_db', 'tools', 'fallback'."));
}
