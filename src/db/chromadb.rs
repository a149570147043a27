//! ChromaDB vector database integration.
//!
//! Talks to a ChromaDB server over its REST API (`/api/v1`). The server embeds
//! query text itself, so no embedding model is needed on this side.
//!
//! ```rust,ignore
//! let client = ChromaClient::new("http://localhost:5001", "documents", Duration::from_secs(10))?;
//! let status = client.status().await;
//! let outcome = client.search("asthma", 5).await?;
//!
//! // ingestion
//! client.wait_until_ready(10, Duration::from_secs(3)).await?;
//! let id = client.get_or_create_collection().await?;
//! client.upsert(&id, &chunks).await?;
//! ```

use crate::db::vectorstore::{DocumentChunk, SearchHit, SearchOutcome, VectorSearch, VectorStatus};
use crate::types::{AppError, Result};
use crate::utils::toml_config::VectorStoreConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Deserialize)]
struct CollectionRecord {
    name: String,
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    documents: Vec<Vec<Option<String>>>,
    #[serde(default)]
    metadatas: Vec<Vec<Option<Map<String, Value>>>>,
}

/// ChromaDB REST client bound to one collection.
#[derive(Debug, Clone)]
pub struct ChromaClient {
    client: Client,
    base_url: String,
    collection: String,
}

impl ChromaClient {
    pub fn new(
        base_url: impl Into<String>,
        collection: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::VectorStore(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            collection: collection.into(),
        })
    }

    pub fn from_config(config: &VectorStoreConfig) -> Result<Self> {
        Self::new(
            config.base_url(),
            &config.collection,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub async fn heartbeat(&self) -> Result<()> {
        let url = format!("{}/api/v1/heartbeat", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::VectorStore(format!("ChromaDB unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::VectorStore(format!(
                "ChromaDB heartbeat failed with status {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// Poll the heartbeat until it answers, at most `attempts` times.
    pub async fn wait_until_ready(&self, attempts: u32, delay: Duration) -> Result<()> {
        let mut last_error = None;
        for attempt in 1..=attempts {
            match self.heartbeat().await {
                Ok(()) => {
                    info!(attempt, "Connected to ChromaDB");
                    return Ok(());
                }
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "ChromaDB not ready");
                    last_error = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            AppError::VectorStore("ChromaDB readiness check was not attempted".to_string())
        }))
    }

    /// Id of the bound collection, creating the collection when it is missing.
    pub async fn get_or_create_collection(&self) -> Result<String> {
        if let Some(existing) = self
            .list_collections()
            .await?
            .into_iter()
            .find(|c| c.name == self.collection)
        {
            debug!(collection = %self.collection, id = %existing.id, "Using existing collection");
            return Ok(existing.id);
        }

        let url = format!("{}/api/v1/collections", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "name": self.collection }))
            .send()
            .await
            .map_err(|e| AppError::VectorStore(format!("Failed to create collection: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::VectorStore(format!(
                "Creating collection '{}' failed with status {}: {}",
                self.collection, status, body
            )));
        }

        let created: CollectionRecord = response
            .json()
            .await
            .map_err(|e| AppError::VectorStore(format!("Invalid create response: {}", e)))?;
        info!(collection = %created.name, id = %created.id, "Created ChromaDB collection");
        Ok(created.id)
    }

    /// Write chunks into a collection. Chunks whose id already exists are replaced.
    pub async fn upsert(&self, collection_id: &str, chunks: &[DocumentChunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let url = format!(
            "{}/api/v1/collections/{}/upsert",
            self.base_url, collection_id
        );
        let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        let documents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let metadatas: Vec<&Map<String, Value>> = chunks.iter().map(|c| &c.metadata).collect();

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "ids": ids,
                "documents": documents,
                "metadatas": metadatas,
            }))
            .send()
            .await
            .map_err(|e| AppError::VectorStore(format!("Upsert failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::VectorStore(format!(
                "Upsert failed with status {}: {}",
                status, body
            )));
        }

        debug!(collection = %self.collection, chunks = chunks.len(), "Upserted chunks");
        Ok(chunks.len())
    }

    async fn list_collections(&self) -> Result<Vec<CollectionRecord>> {
        let url = format!("{}/api/v1/collections", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::VectorStore(format!("Failed to list collections: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::VectorStore(format!(
                "Listing collections failed with status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::VectorStore(format!("Invalid collections response: {}", e)))
    }

    async fn collection_id(&self) -> Result<String> {
        self.list_collections()
            .await?
            .into_iter()
            .find(|c| c.name == self.collection)
            .map(|c| c.id)
            .ok_or_else(|| {
                AppError::VectorStore(format!("Collection '{}' not found", self.collection))
            })
    }
}

#[async_trait]
impl VectorSearch for ChromaClient {
    fn provider_name(&self) -> &'static str {
        "chromadb"
    }

    async fn status(&self) -> VectorStatus {
        if let Err(e) = self.heartbeat().await {
            warn!(error = %e, "ChromaDB heartbeat failed");
            return VectorStatus::disconnected(Vec::new(), e.to_string());
        }

        match self.list_collections().await {
            Ok(records) => {
                let names: Vec<String> = records.into_iter().map(|c| c.name).collect();
                if names.iter().any(|n| n == &self.collection) {
                    VectorStatus::connected(names)
                } else {
                    warn!(
                        collection = %self.collection,
                        available = ?names,
                        "ChromaDB reachable but collection missing"
                    );
                    let error = format!("Collection '{}' not found", self.collection);
                    VectorStatus::disconnected(names, error)
                }
            }
            Err(e) => VectorStatus::disconnected(Vec::new(), e.to_string()),
        }
    }

    async fn search(&self, query: &str, k: usize) -> Result<SearchOutcome> {
        let id = self.collection_id().await?;
        let url = format!("{}/api/v1/collections/{}/query", self.base_url, id);
        info!(collection = %self.collection, k, "Querying ChromaDB");

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "query_texts": [query],
                "n_results": k,
                "include": ["documents", "metadatas"],
            }))
            .send()
            .await
            .map_err(|e| AppError::VectorStore(format!("Query failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::VectorStore(format!(
                "Query failed with status {}: {}",
                status, body
            )));
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| AppError::VectorStore(format!("Invalid query response: {}", e)))?;

        // one query text, so only the first row is relevant
        let documents = parsed.documents.into_iter().next().unwrap_or_default();
        let mut metadatas = parsed
            .metadatas
            .into_iter()
            .next()
            .unwrap_or_default()
            .into_iter();

        let hits: Vec<SearchHit> = documents
            .into_iter()
            .map(|doc| {
                let metadata = metadatas.next().flatten().unwrap_or_default();
                (doc, metadata)
            })
            .filter_map(|(doc, metadata)| {
                doc.map(|content| SearchHit { content, metadata })
            })
            .collect();

        debug!(hits = hits.len(), "ChromaDB query finished");
        Ok(SearchOutcome::from_hits(hits))
    }
}
