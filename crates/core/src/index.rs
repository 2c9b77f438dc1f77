use crate::traits::VectorIndex;
use crate::{Chunk, RetrievedChunk, SearchError};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
struct IndexEntry {
    chunk: Chunk,
    embedding: Vec<f32>,
}

/// Exact cosine-similarity index held in memory. Entries keep insertion
/// order, which is also the tie-break order for equal scores.
#[derive(Debug, Clone)]
pub struct MemoryIndex {
    entries: Vec<IndexEntry>,
    dimensions: usize,
    built_at: DateTime<Utc>,
}

impl MemoryIndex {
    pub fn build(
        dimensions: usize,
        chunks: Vec<Chunk>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<Self, SearchError> {
        if dimensions == 0 {
            return Err(SearchError::Request(
                "index dimensions must be greater than zero".to_string(),
            ));
        }

        if chunks.len() != embeddings.len() {
            return Err(SearchError::Request(format!(
                "embedding count {} doesn't match chunk count {}",
                embeddings.len(),
                chunks.len()
            )));
        }

        let entries = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                if embedding.len() != dimensions {
                    return Err(SearchError::DimensionMismatch {
                        expected: dimensions,
                        actual: embedding.len(),
                    });
                }
                Ok(IndexEntry { chunk, embedding })
            })
            .collect::<Result<Vec<_>, SearchError>>()?;

        Ok(Self {
            entries,
            dimensions,
            built_at: Utc::now(),
        })
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }
}

impl VectorIndex for MemoryIndex {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn search_vector(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, SearchError> {
        if top_k == 0 {
            return Err(SearchError::Request("top_k must be at least 1".to_string()));
        }

        if query_vector.len() != self.dimensions {
            return Err(SearchError::DimensionMismatch {
                expected: self.dimensions,
                actual: query_vector.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (position, cosine_similarity(query_vector, &entry.embedding)))
            .collect();

        // sort_by is stable, so equal scores stay in insertion order.
        scored.sort_by(|left, right| right.1.total_cmp(&left.1));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(position, similarity)| RetrievedChunk {
                chunk: self.entries[position].chunk.clone(),
                similarity,
            })
            .collect())
    }
}

pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    let dot = left.iter().zip(right).map(|(a, b)| a * b).sum::<f32>();
    let left_norm = left.iter().map(|value| value * value).sum::<f32>().sqrt();
    let right_norm = right.iter().map(|value| value * value).sum::<f32>().sqrt();

    if left_norm == 0.0 || right_norm == 0.0 {
        0.0
    } else {
        dot / (left_norm * right_norm)
    }
}
