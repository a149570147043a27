use crate::types::{AppError, Result};
use crate::utils::toml_config::IngestConfig;
use text_splitter::{Characters, ChunkConfig, TextSplitter};

/// Splits document text into overlapping chunks of at most `chunk_size`
/// characters.
///
/// Splitting prefers the largest semantic unit that fits (paragraphs, then
/// lines, sentences and words), so chunks rarely cut a word in half.
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    splitter: TextSplitter<Characters>,
}

impl TextChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        let config = ChunkConfig::new(chunk_size)
            .with_overlap(chunk_overlap)
            .map_err(|e| AppError::Configuration(format!("Invalid chunking settings: {}", e)))?;

        Ok(Self {
            chunk_size,
            chunk_overlap,
            splitter: TextSplitter::new(config),
        })
    }

    pub fn from_config(config: &IngestConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        self.splitter.chunks(text).map(str::to_string).collect()
    }
}
