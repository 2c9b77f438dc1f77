use crate::embeddings::Embedder;
use crate::traits::VectorIndex;
use crate::{RetrievedChunk, SearchError};
use std::sync::Arc;

/// Embeds a query and looks up its nearest chunks. The embedder must be the
/// one the index was built with.
pub struct Retriever<E, V>
where
    E: Embedder + ?Sized,
    V: VectorIndex + ?Sized,
{
    embedder: Arc<E>,
    index: Arc<V>,
}

impl<E, V> Clone for Retriever<E, V>
where
    E: Embedder + ?Sized,
    V: VectorIndex + ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            embedder: Arc::clone(&self.embedder),
            index: Arc::clone(&self.index),
        }
    }
}

impl<E, V> Retriever<E, V>
where
    E: Embedder + ?Sized,
    V: VectorIndex + ?Sized,
{
    pub fn new(embedder: Arc<E>, index: Arc<V>) -> Result<Self, SearchError> {
        if embedder.dimensions() != index.dimensions() {
            return Err(SearchError::DimensionMismatch {
                expected: index.dimensions(),
                actual: embedder.dimensions(),
            });
        }
        Ok(Self { embedder, index })
    }

    pub fn index(&self) -> &V {
        &self.index
    }

    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>, SearchError> {
        if top_k == 0 {
            return Err(SearchError::Request("top_k must be at least 1".to_string()));
        }

        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query).await?;
        self.index.search_vector(&query_vector, top_k)
    }
}
