//! TOML-based configuration for graphflow
//!
//! Infrastructure settings (server, model provider, vector store, tool
//! execution service) live in `graphflow.toml`. The agent graph itself is a
//! separate document referenced by `[workflow].path`, see
//! [`crate::workflows::definition`].
//!
//! A `.env` file is loaded first (via `dotenvy`), then a small set of
//! environment variables override values from the file:
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `GRAPHFLOW_HOST` | `server.host` |
//! | `GRAPHFLOW_PORT` | `server.port` |
//! | `ALLOWED_ORIGINS` | `server.allowed_origins` (comma separated) |
//! | `LLM_SERVER_MODEL` | `llm.model` |
//! | `CHROMADB_HOST` | `vector_store.host` |
//! | `CHROMADB_PORT` | `vector_store.port` |
//! | `CHROMADB_COLLECTION` | `vector_store.collection` |
//! | `MCP_SERVER_URL` | `tools.service_url` |

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Root configuration structure loaded from graphflow.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphflowConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub workflow: WorkflowSource,

    #[serde(default)]
    pub ingest: IngestConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prefix all API routes are nested under
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// CORS origins; empty means any origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            api_prefix: default_api_prefix(),
            allowed_origins: Vec::new(),
        }
    }
}

// ============= LLM Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum LlmConfig {
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        #[serde(default = "default_ollama_model")]
        model: String,
    },
    OpenAI {
        /// Environment variable containing API key
        #[serde(default = "default_openai_key_env")]
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
        #[serde(default = "default_openai_model")]
        model: String,
    },
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2".to_string()
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig::Ollama {
            base_url: default_ollama_url(),
            model: default_ollama_model(),
        }
    }
}

impl LlmConfig {
    pub fn model(&self) -> &str {
        match self {
            LlmConfig::Ollama { model, .. } | LlmConfig::OpenAI { model, .. } => model,
        }
    }

    fn set_model(&mut self, value: String) {
        match self {
            LlmConfig::Ollama { model, .. } | LlmConfig::OpenAI { model, .. } => *model = value,
        }
    }
}

// ============= Vector Store Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    #[default]
    ChromaDB,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default)]
    pub provider: VectorBackend,

    #[serde(default = "default_chroma_host")]
    pub host: String,

    /// When unset, 5001 is used for localhost and 5000 otherwise
    pub port: Option<u16>,

    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_vector_timeout")]
    pub timeout_secs: u64,
}

fn default_chroma_host() -> String {
    "localhost".to_string()
}

fn default_collection() -> String {
    "documents".to_string()
}

fn default_top_k() -> usize {
    5
}

fn default_vector_timeout() -> u64 {
    10
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            provider: VectorBackend::default(),
            host: default_chroma_host(),
            port: None,
            collection: default_collection(),
            top_k: default_top_k(),
            timeout_secs: default_vector_timeout(),
        }
    }
}

impl VectorStoreConfig {
    pub fn resolved_port(&self) -> u16 {
        self.port
            .unwrap_or(if self.host == "localhost" { 5001 } else { 5000 })
    }

    pub fn base_url(&self) -> String {
        if self.host.starts_with("http://") || self.host.starts_with("https://") {
            format!("{}:{}", self.host.trim_end_matches('/'), self.resolved_port())
        } else {
            format!("http://{}:{}", self.host, self.resolved_port())
        }
    }
}

// ============= Tool Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Base URL of the external tool execution service
    #[serde(default = "default_service_url")]
    pub service_url: String,

    #[serde(default = "default_tool_timeout")]
    pub timeout_secs: u64,

    /// Tools advertised to the tool-invocation node
    #[serde(default)]
    pub catalog: Vec<ToolEntry>,
}

fn default_service_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_tool_timeout() -> u64 {
    30
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            service_url: default_service_url(),
            timeout_secs: default_tool_timeout(),
            catalog: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolEntry {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_tool_method")]
    pub method: String,

    /// Free-form parameter description shown to the model
    #[serde(default)]
    pub parameters: serde_json::Value,
}

fn default_tool_method() -> String {
    "POST".to_string()
}

// ============= Workflow Source =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSource {
    #[serde(default = "default_workflow_path")]
    pub path: PathBuf,
}

fn default_workflow_path() -> PathBuf {
    PathBuf::from("agents.toml")
}

impl Default for WorkflowSource {
    fn default() -> Self {
        Self {
            path: default_workflow_path(),
        }
    }
}

// ============= Ingestion =============

/// Settings for `graphflow-server ingest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Directory scanned when no directory is given on the command line
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Maximum chunk length in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Chunks sent to the store per request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Heartbeat attempts before giving up on the store
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,

    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_chunk_size() -> usize {
    350
}

fn default_chunk_overlap() -> usize {
    50
}

fn default_batch_size() -> usize {
    100
}

fn default_connect_attempts() -> u32 {
    10
}

fn default_retry_delay() -> u64 {
    3
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            batch_size: default_batch_size(),
            connect_attempts: default_connect_attempts(),
            retry_delay_secs: default_retry_delay(),
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' has an invalid value: {1}")]
    InvalidEnvVar(String, String),
}

impl GraphflowConfig {
    /// Load configuration from a TOML file, apply environment overrides and validate.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let mut config: GraphflowConfig = toml::from_str(&content)?;

        // relative paths are relative to the config file
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if config.workflow.path.is_relative() {
                config.workflow.path = dir.join(&config.workflow.path);
            }
            if config.ingest.data_dir.is_relative() {
                config.ingest.data_dir = dir.join(&config.ingest.data_dir);
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Like [`load`](Self::load), but falls back to built-in defaults (plus
    /// environment overrides) when the file does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        match Self::load(path.as_ref()) {
            Err(ConfigError::FileNotFound(missing)) => {
                info!(
                    path = %missing.display(),
                    "No configuration file found, using defaults"
                );
                let mut config = GraphflowConfig::default();
                config.apply_env_overrides()?;
                config.validate()?;
                Ok(config)
            }
            other => other,
        }
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable source
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("GRAPHFLOW_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("GRAPHFLOW_PORT") {
            self.server.port = parse_env("GRAPHFLOW_PORT", &port)?;
        }
        if let Some(origins) = lookup("ALLOWED_ORIGINS") {
            self.server.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(model) = lookup("LLM_SERVER_MODEL") {
            self.llm.set_model(model);
        }
        if let Some(host) = lookup("CHROMADB_HOST") {
            self.vector_store.host = host;
        }
        if let Some(port) = lookup("CHROMADB_PORT") {
            self.vector_store.port = Some(parse_env("CHROMADB_PORT", &port)?);
        }
        if let Some(collection) = lookup("CHROMADB_COLLECTION") {
            self.vector_store.collection = collection;
        }
        if let Some(url) = lookup("MCP_SERVER_URL") {
            self.tools.service_url = url;
        }

        debug!("Applied environment overrides");
        Ok(())
    }

    /// Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server.port must be non-zero".to_string(),
            ));
        }

        if !self.server.api_prefix.starts_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "server.api_prefix must start with '/', got '{}'",
                self.server.api_prefix
            )));
        }

        if self.llm.model().trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "llm.model must not be empty".to_string(),
            ));
        }

        if self.vector_store.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "vector_store.top_k must be at least 1".to_string(),
            ));
        }

        let url = self.tools.service_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "tools.service_url must be an http(s) URL, got '{}'",
                self.tools.service_url
            )));
        }

        if self.tools.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "tools.timeout_secs must be at least 1".to_string(),
            ));
        }

        if self.vector_store.collection.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "vector_store.collection must not be empty".to_string(),
            ));
        }

        let ingest = &self.ingest;
        if ingest.chunk_size == 0 || ingest.chunk_overlap >= ingest.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "ingest.chunk_overlap ({}) must be smaller than a non-zero ingest.chunk_size ({})",
                ingest.chunk_overlap, ingest.chunk_size
            )));
        }
        if ingest.batch_size == 0 || ingest.connect_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "ingest.batch_size and ingest.connect_attempts must be at least 1".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for entry in &self.tools.catalog {
            if entry.name.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "tools.catalog entries need a name".to_string(),
                ));
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "Tool '{}' is listed more than once in tools.catalog",
                    entry.name
                )));
            }
        }

        Ok(())
    }

    /// Address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnvVar(name.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn create_test_config() -> String {
        r#"
[server]
host = "127.0.0.1"
port = 8080
log_level = "debug"
allowed_origins = ["http://localhost:5173"]

[llm]
provider = "openai"
api_key_env = "TEST_OPENAI_KEY"
model = "gpt-4o-mini"

[vector_store]
provider = "chromadb"
host = "chromadb_server"
collection = "medical"

[tools]
service_url = "http://localhost:3000"
timeout_secs = 15

[[tools.catalog]]
name = "appointments"
description = "Book or list appointments"
method = "GET"

[[tools.catalog]]
name = "notify"
description = "Send a notification"

[workflow]
path = "config/agents.toml"
"#
        .to_string()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_parse_config() {
        let config: GraphflowConfig =
            toml::from_str(&create_test_config()).expect("Failed to parse config");

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.llm.model(), "gpt-4o-mini");
        assert!(matches!(config.llm, LlmConfig::OpenAI { .. }));
        assert_eq!(config.vector_store.collection, "medical");
        assert_eq!(config.tools.catalog.len(), 2);
        assert_eq!(config.tools.catalog[0].method, "GET");
        assert_eq!(config.tools.catalog[1].method, "POST");
        assert_eq!(config.workflow.path, PathBuf::from("config/agents.toml"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config: GraphflowConfig = toml::from_str("").unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.api_prefix, "/api");
        assert!(matches!(config.llm, LlmConfig::Ollama { .. }));
        assert_eq!(config.vector_store.top_k, 5);
        assert_eq!(config.tools.service_url, "http://localhost:3000");
        assert_eq!(config.tools.timeout_secs, 30);
        assert_eq!(config.workflow.path, PathBuf::from("agents.toml"));
        assert_eq!(config.ingest.data_dir, PathBuf::from("data"));
        assert_eq!(config.ingest.chunk_size, 350);
        assert_eq!(config.ingest.chunk_overlap, 50);
    }

    #[test]
    fn test_validation_rejects_overlap_not_below_chunk_size() {
        let config: GraphflowConfig = toml::from_str(
            r#"
[ingest]
chunk_size = 50
chunk_overlap = 50
"#,
        )
        .unwrap();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(msg)) if msg.contains("chunk_overlap")
        ));
    }

    #[test]
    fn test_chroma_port_depends_on_host() {
        let mut vector = VectorStoreConfig::default();
        assert_eq!(vector.resolved_port(), 5001);
        assert_eq!(vector.base_url(), "http://localhost:5001");

        vector.host = "chromadb_server".to_string();
        assert_eq!(vector.resolved_port(), 5000);

        vector.port = Some(8000);
        assert_eq!(vector.base_url(), "http://chromadb_server:8000");
    }

    #[test]
    fn test_env_overrides() {
        let mut config: GraphflowConfig = toml::from_str(&create_test_config()).unwrap();
        let env: HashMap<&str, &str> = [
            ("GRAPHFLOW_PORT", "9000"),
            ("LLM_SERVER_MODEL", "gpt-4o"),
            ("CHROMADB_PORT", "8001"),
            ("CHROMADB_COLLECTION", "medical_docs"),
            ("MCP_SERVER_URL", "http://tools:3000"),
            ("ALLOWED_ORIGINS", "http://a.test, http://b.test,"),
        ]
        .into_iter()
        .collect();

        config
            .apply_overrides(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.llm.model(), "gpt-4o");
        assert_eq!(config.vector_store.port, Some(8001));
        assert_eq!(config.vector_store.collection, "medical_docs");
        assert_eq!(config.tools.service_url, "http://tools:3000");
        assert_eq!(
            config.server.allowed_origins,
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }

    #[test]
    fn test_invalid_env_port() {
        let mut config = GraphflowConfig::default();
        let result = config.apply_overrides(|name| {
            (name == "GRAPHFLOW_PORT").then(|| "not-a-port".to_string())
        });

        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(name, _)) if name == "GRAPHFLOW_PORT"));
    }

    #[test]
    fn test_no_overrides_keeps_file_values() {
        let mut config: GraphflowConfig = toml::from_str(&create_test_config()).unwrap();
        config.apply_overrides(no_env).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.tools.service_url, "http://localhost:3000");
    }

    #[test]
    fn test_validation_rejects_bad_service_url() {
        let config: GraphflowConfig = toml::from_str(
            r#"
[tools]
service_url = "localhost:3000"
"#,
        )
        .unwrap();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validation_rejects_duplicate_tools() {
        let config: GraphflowConfig = toml::from_str(
            r#"
[[tools.catalog]]
name = "lookup"

[[tools.catalog]]
name = "lookup"
"#,
        )
        .unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("lookup"));
    }

    #[test]
    fn test_validation_rejects_zero_top_k() {
        let config: GraphflowConfig = toml::from_str(
            r#"
[vector_store]
top_k = 0
"#,
        )
        .unwrap();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let result = GraphflowConfig::load("/nonexistent/graphflow.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graphflow.toml");
        std::fs::write(&path, create_test_config()).unwrap();

        let config = GraphflowConfig::load(&path).unwrap();
        assert_eq!(config.tools.catalog[0].name, "appointments");
        assert_eq!(config.vector_store.collection, "medical");
    }

    #[test]
    fn test_relative_workflow_path_follows_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graphflow.toml");
        std::fs::write(&path, "[workflow]\npath = \"flows/agents.toml\"\n").unwrap();

        let config = GraphflowConfig::load(&path).unwrap();
        assert_eq!(config.workflow.path, dir.path().join("flows/agents.toml"));
        assert_eq!(config.ingest.data_dir, dir.path().join("data"));
    }
}
