use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Uniform text produced by the loader for one file (or one PDF page).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRecord {
    pub content: String,
    pub source: PathBuf,
    pub page: Option<u32>,
}

impl TextRecord {
    pub fn new(content: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
            page: None,
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub text: String,
    pub source_path: String,
    pub page: Option<u32>,
    pub chunk_index: u64,
}

/// A chunk returned by the retriever, most similar first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub similarity: f32,
}

impl RetrievedChunk {
    /// Cosine distance to the query vector.
    pub fn distance(&self) -> f32 {
        1.0 - self.similarity
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub chunk_max_chars: usize,
    pub chunk_overlap_chars: usize,
    pub embed_batch_size: usize,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_max_chars: 500,
            chunk_overlap_chars: 50,
            embed_batch_size: 32,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub top_k: usize,
    pub min_max_tokens: u32,
    pub max_max_tokens: u32,
}

impl ChatOptions {
    pub fn clamp_max_tokens(&self, requested: u32) -> u32 {
        requested.clamp(self.min_max_tokens, self.max_max_tokens)
    }
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            top_k: 3,
            min_max_tokens: 10,
            max_max_tokens: 300,
        }
    }
}
