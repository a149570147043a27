//! Document ingestion into the retrieval collection.
//!
//! Fills the ChromaDB collection the retrieval node searches:
//!
//! 1. [`loader`] reads every supported file under a data directory
//! 2. [`chunker`] splits each document into overlapping chunks
//! 3. chunks are upserted into the collection, which is created on first use
//!
//! Every chunk carries `source`, `file_name`, `file_type` and `chunk_index`
//! metadata. Chunk ids are `<source>#<chunk_index>`, so ingesting the same
//! directory twice replaces chunks instead of duplicating them.
//!
//! ```rust,ignore
//! let ingestor = Ingestor::from_config(&config)?;
//! let report = ingestor.ingest_directory(&config.ingest.data_dir).await?;
//! println!("{} chunks in '{}'", report.chunks, report.collection);
//! ```

pub mod chunker;
pub mod loader;

pub use chunker::TextChunker;
pub use loader::{load_directory, LoadedDirectory, SourceDocument};

use crate::db::{ChromaClient, DocumentChunk};
use crate::types::{AppError, Result};
use crate::utils::toml_config::{GraphflowConfig, IngestConfig, VectorBackend};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Counts from one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub collection: String,
    pub documents: usize,
    pub skipped: usize,
    pub chunks: usize,
}

/// Split documents into store-ready chunks.
pub fn chunk_documents(documents: &[SourceDocument], chunker: &TextChunker) -> Vec<DocumentChunk> {
    documents
        .iter()
        .flat_map(|doc| {
            let base = doc.metadata();
            let source = doc.path.display().to_string();
            chunker
                .chunk(&doc.text)
                .into_iter()
                .enumerate()
                .map(move |(index, content)| {
                    let mut metadata = base.clone();
                    metadata.insert("chunk_index".to_string(), Value::from(index));
                    DocumentChunk {
                        id: format!("{}#{}", source, index),
                        content,
                        metadata,
                    }
                })
        })
        .collect()
}

pub struct Ingestor {
    store: ChromaClient,
    chunker: TextChunker,
    batch_size: usize,
    connect_attempts: u32,
    retry_delay: Duration,
}

impl Ingestor {
    pub fn new(store: ChromaClient, chunker: TextChunker) -> Self {
        let defaults = IngestConfig::default();
        Self {
            store,
            chunker,
            batch_size: defaults.batch_size,
            connect_attempts: defaults.connect_attempts,
            retry_delay: Duration::from_secs(defaults.retry_delay_secs),
        }
    }

    /// # Errors
    ///
    /// [`AppError::Configuration`] unless `[vector_store] provider` is
    /// `chromadb`, or when the chunking settings are invalid.
    pub fn from_config(config: &GraphflowConfig) -> Result<Self> {
        if config.vector_store.provider != VectorBackend::ChromaDB {
            return Err(AppError::Configuration(
                "Ingestion writes to ChromaDB; set [vector_store] provider = \"chromadb\""
                    .to_string(),
            ));
        }

        let ingest = &config.ingest;
        Ok(Self::new(
            ChromaClient::from_config(&config.vector_store)?,
            TextChunker::from_config(ingest)?,
        )
        .with_batch_size(ingest.batch_size)
        .with_retry(ingest.connect_attempts, Duration::from_secs(ingest.retry_delay_secs)))
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.connect_attempts = attempts.max(1);
        self.retry_delay = delay;
        self
    }

    /// Load, chunk and store every supported file under `dir`.
    pub async fn ingest_directory(&self, dir: &Path) -> Result<IngestReport> {
        let started = Instant::now();

        let loaded = load_directory(dir)?;
        info!(
            dir = %dir.display(),
            documents = loaded.documents.len(),
            skipped = loaded.skipped.len(),
            "Loaded documents"
        );

        let chunks = chunk_documents(&loaded.documents, &self.chunker);
        info!(
            chunks = chunks.len(),
            chunk_size = self.chunker.chunk_size(),
            chunk_overlap = self.chunker.chunk_overlap(),
            "Chunked documents"
        );

        self.store
            .wait_until_ready(self.connect_attempts, self.retry_delay)
            .await?;
        let collection_id = self.store.get_or_create_collection().await?;

        let mut written = 0;
        for batch in chunks.chunks(self.batch_size) {
            written += self.store.upsert(&collection_id, batch).await?;
            debug!(written, total = chunks.len(), "Stored batch");
        }

        info!(
            collection = self.store.collection(),
            chunks = written,
            duration_ms = started.elapsed().as_millis() as u64,
            "Ingestion finished"
        );

        Ok(IngestReport {
            collection: self.store.collection().to_string(),
            documents: loaded.documents.len(),
            skipped: loaded.skipped.len(),
            chunks: written,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_chunk_documents_numbers_chunks_per_document() {
        let chunker = TextChunker::new(40, 10).unwrap();
        let documents = vec![
            SourceDocument {
                path: PathBuf::from("data/asthma.txt"),
                text: "Asthma narrows the airways. Inhalers open them again quickly.".to_string(),
            },
            SourceDocument {
                path: PathBuf::from("data/flu.md"),
                text: "Rest and fluids.".to_string(),
            },
        ];

        let chunks = chunk_documents(&documents, &chunker);

        let asthma: Vec<&DocumentChunk> = chunks
            .iter()
            .filter(|c| c.metadata["file_name"] == "asthma.txt")
            .collect();
        assert!(asthma.len() >= 2);
        for (index, chunk) in asthma.iter().enumerate() {
            assert_eq!(chunk.id, format!("data/asthma.txt#{}", index));
            assert_eq!(chunk.metadata["chunk_index"], index);
            assert_eq!(chunk.metadata["file_type"], "txt");
            assert_eq!(chunk.metadata["source"], "data/asthma.txt");
        }

        let last = chunks.last().unwrap();
        assert_eq!(last.id, "data/flu.md#0");
        assert_eq!(last.content, "Rest and fluids.");
        assert_eq!(last.metadata["file_type"], "md");
    }

    #[test]
    fn test_memory_backend_cannot_ingest() {
        let mut config = GraphflowConfig::default();
        config.vector_store.provider = VectorBackend::Memory;

        assert!(matches!(
            Ingestor::from_config(&config),
            Err(AppError::Configuration(_))
        ));
    }
}
