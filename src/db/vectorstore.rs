//! Vector Store Abstraction Layer
//!
//! The retrieval node only needs two things from a document store: whether it
//! is reachable (and which collections it holds), and a text search returning
//! the best matching documents with their metadata.
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │          VectorSearch Trait          │
//! ├──────────────────────────────────────┤
//! │        status       │     search     │
//! └──────────────────────────────────────┘
//!          ▲                    ▲
//!    ┌─────┴────┐        ┌──────┴─────┐
//!    │ ChromaDB │        │  InMemory  │
//!    │ (default)│        │  (testing) │
//!    └──────────┘        └────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let store = create_store(&config.vector_store)?;
//! if store.status().await.connected {
//!     let outcome = store.search("asthma treatment", 5).await?;
//! }
//! ```

use crate::types::{AppError, Result};
use crate::utils::toml_config::{VectorBackend, VectorStoreConfig};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

// ============================================================================
// Result types
// ============================================================================

/// Reachability of a document store.
///
/// `connected` is only true when the configured collection exists; a store
/// that answers but lacks the collection reports `connected = false` with the
/// collections it does have.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorStatus {
    pub connected: bool,
    pub collections: Vec<String>,
    pub error: Option<String>,
}

impl VectorStatus {
    pub fn connected(collections: Vec<String>) -> Self {
        Self {
            connected: true,
            collections,
            error: None,
        }
    }

    pub fn disconnected(collections: Vec<String>, error: impl Into<String>) -> Self {
        Self {
            connected: false,
            collections,
            error: Some(error.into()),
        }
    }
}

/// A single matching document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl SearchHit {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub found: bool,
    pub results: Vec<SearchHit>,
}

impl SearchOutcome {
    pub fn from_hits(results: Vec<SearchHit>) -> Self {
        Self {
            found: !results.is_empty(),
            results,
        }
    }
}

/// A piece of a source document, as written by ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

// ============================================================================
// Trait
// ============================================================================

/// Document store used by the retrieval node.
///
/// # Implementors
///
/// - `ChromaClient` - ChromaDB over its REST API (default)
/// - `InMemoryVectorSearch` - keyword matching, for tests and local runs
#[async_trait]
pub trait VectorSearch: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Reachability and collection availability. Never fails; problems are
    /// reported through [`VectorStatus::error`].
    async fn status(&self) -> VectorStatus;

    /// Up to `k` documents matching `query`, best first.
    async fn search(&self, query: &str, k: usize) -> Result<SearchOutcome>;
}

/// Build the configured store.
pub fn create_store(config: &VectorStoreConfig) -> Result<Arc<dyn VectorSearch>> {
    match config.provider {
        VectorBackend::ChromaDB => Ok(Arc::new(super::chromadb::ChromaClient::from_config(
            config,
        )?)),
        VectorBackend::Memory => Ok(Arc::new(InMemoryVectorSearch::new(&config.collection))),
    }
}

// ============================================================================
// In-Memory store
// ============================================================================

/// In-memory document store.
///
/// Scores documents by how many query terms they contain. Data is not
/// persisted.
pub struct InMemoryVectorSearch {
    collection: String,
    collections: Arc<RwLock<HashMap<String, Vec<SearchHit>>>>,
}

impl InMemoryVectorSearch {
    /// Store that expects `collection` to exist; it starts out present and empty.
    pub fn new(collection: impl Into<String>) -> Self {
        let collection = collection.into();
        let mut collections = HashMap::new();
        collections.insert(collection.clone(), Vec::new());
        Self {
            collection,
            collections: Arc::new(RwLock::new(collections)),
        }
    }

    pub fn add(&self, hit: SearchHit) {
        self.add_to(&self.collection, hit);
    }

    pub fn add_to(&self, collection: &str, hit: SearchHit) {
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .push(hit);
    }

    pub fn drop_collection(&self, collection: &str) -> Result<()> {
        self.collections
            .write()
            .remove(collection)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Collection '{}' not found", collection)))
    }

    fn terms(text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() > 2)
            .map(str::to_lowercase)
            .collect()
    }
}

#[async_trait]
impl VectorSearch for InMemoryVectorSearch {
    fn provider_name(&self) -> &'static str {
        "memory"
    }

    async fn status(&self) -> VectorStatus {
        let collections = self.collections.read();
        let mut names: Vec<String> = collections.keys().cloned().collect();
        names.sort();

        if collections.contains_key(&self.collection) {
            VectorStatus::connected(names)
        } else {
            VectorStatus::disconnected(
                names,
                format!("Collection '{}' not found", self.collection),
            )
        }
    }

    async fn search(&self, query: &str, k: usize) -> Result<SearchOutcome> {
        let collections = self.collections.read();
        let documents = collections.get(&self.collection).ok_or_else(|| {
            AppError::VectorStore(format!("Collection '{}' not found", self.collection))
        })?;

        let terms = Self::terms(query);
        let mut scored: Vec<(usize, &SearchHit)> = documents
            .iter()
            .map(|hit| {
                let content = hit.content.to_lowercase();
                let score = terms.iter().filter(|t| content.contains(t.as_str())).count();
                (score, hit)
            })
            .filter(|(score, _)| *score > 0)
            .collect();

        // stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(SearchOutcome::from_hits(
            scored.into_iter().take(k).map(|(_, hit)| hit.clone()).collect(),
        ))
    }
}
