use crate::{RetrievedChunk, SearchError};

/// Nearest-neighbour lookup over chunk embeddings. Implementations are
/// read-only once built and safe to query from many tasks.
pub trait VectorIndex: Send + Sync {
    fn dimensions(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn search_vector(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, SearchError>;
}
