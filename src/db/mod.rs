//! Document stores for the retrieval node.
//!
//! - `chromadb` - ChromaDB over HTTP (default)
//! - in-memory keyword store, for tests and local runs
//!
//! Select the backend with `[vector_store] provider` in `graphflow.toml`.

pub mod chromadb;
pub mod vectorstore;

pub use chromadb::ChromaClient;
pub use vectorstore::{
    create_store, DocumentChunk, InMemoryVectorSearch, SearchHit, SearchOutcome, VectorSearch,
    VectorStatus,
};
