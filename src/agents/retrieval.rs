use crate::agents::{completed_status, error_status, NodeContext, NodeHandler, NodeOutcome};
use crate::db::vectorstore::{SearchHit, VectorSearch};
use crate::types::Result;
use crate::workflows::definition::NodeKind;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

const PREVIEW_CHARS: usize = 500;

const NO_RESULTS: &str = "I couldn't find any relevant information in the medical database for your query. \
Please try rephrasing your question or ask about a different medical topic.";

const UNAVAILABLE: &str = "I am unable to access the medical database at the moment. \
The database may not be properly set up or the data ingestion process may not have completed. \
Please try again later or contact support if the issue persists.";

/// Searches the document store with the user's query and returns the hits as
/// a context block for the next node.
pub struct RetrievalNode {
    store: Arc<dyn VectorSearch>,
    top_k: usize,
}

impl RetrievalNode {
    pub fn new(store: Arc<dyn VectorSearch>, top_k: usize) -> Self {
        Self { store, top_k }
    }

    fn missing_collection(collections: &[String]) -> String {
        format!(
            "I can connect to the medical database, but the expected collection is not available. \
             Available collections: {}. \
             Please ensure the data ingestion process has completed successfully.",
            collections.join(", ")
        )
    }

    /// `Document i (Source: .., Type: ..):` blocks, content cut to 500 characters.
    pub fn build_context(hits: &[SearchHit]) -> String {
        hits.iter()
            .enumerate()
            .map(|(i, hit)| {
                let n = i + 1;
                let default_name = format!("Document {}", n);
                let file_name = hit.metadata_str("file_name").unwrap_or(&default_name);
                let file_type = hit.metadata_str("file_type").unwrap_or("unknown");

                let preview = if hit.content.chars().count() > PREVIEW_CHARS {
                    let cut: String = hit.content.chars().take(PREVIEW_CHARS).collect();
                    format!("{}...", cut)
                } else {
                    hit.content.clone()
                };

                format!(
                    "Document {} (Source: {}, Type: {}):\n{}",
                    n, file_name, file_type, preview
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[async_trait]
impl NodeHandler for RetrievalNode {
    async fn execute(&self, ctx: &NodeContext<'_>) -> Result<NodeOutcome> {
        let query = ctx.state.input.as_str();
        info!(node = ctx.node_id, provider = self.store.provider_name(), "Searching documents");

        let status = self.store.status().await;
        if !status.connected {
            let text = if status.collections.is_empty() {
                error!(
                    error = status.error.as_deref().unwrap_or("unknown"),
                    "Vector store unavailable"
                );
                UNAVAILABLE.to_string()
            } else {
                error!(available = ?status.collections, "Vector store collection missing");
                Self::missing_collection(&status.collections)
            };
            return Ok(NodeOutcome::text(text).with_status(completed_status(self.kind())));
        }

        match self.store.search(query, self.top_k).await {
            Ok(outcome) if outcome.results.is_empty() => {
                warn!(node = ctx.node_id, "No documents matched");
                Ok(NodeOutcome::text(NO_RESULTS).with_status(completed_status(self.kind())))
            }
            Ok(outcome) => {
                info!(node = ctx.node_id, hits = outcome.results.len(), "Search completed");
                Ok(NodeOutcome::text(Self::build_context(&outcome.results))
                    .with_status(completed_status(self.kind())))
            }
            Err(e) => {
                error!(node = ctx.node_id, error = %e, "Search failed");
                Ok(NodeOutcome::text(format!(
                    "I encountered an error while searching the medical database: {}. \
                     Please try again or rephrase your question.",
                    e
                ))
                .with_status(error_status(self.kind())))
            }
        }
    }

    fn kind(&self) -> NodeKind {
        NodeKind::VectorDb
    }
}
