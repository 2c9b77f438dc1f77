pub mod chunking;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod loader;
pub mod memory;
pub mod models;
pub mod prompt;
pub mod retriever;
pub mod traits;

pub use chunking::{build_chunks, split_text, ChunkingConfig};
pub use embeddings::{
    CharacterNgramEmbedder, Embedder, EmbeddingBackend, HttpEmbedder, HttpEmbedderConfig,
    DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use engine::{ConversationEngine, EngineState, NOT_READY_MESSAGE};
pub use error::{ChatError, IngestError, SearchError};
pub use index::MemoryIndex;
pub use ingest::{
    build_index, discover_supported_files, ingest_folder_chunks, load_corpus, split_records,
    ChunkedCorpus, IndexBuild, IngestionReport, SkippedFile,
};
pub use llm::{ChatModel, OpenAiChatConfig, OpenAiChatModel};
pub use loader::{load_file, DocumentFormat};
pub use memory::ConversationMemory;
pub use models::{ChatOptions, Chunk, IngestionOptions, RetrievedChunk, TextRecord, Turn};
pub use prompt::{Prompt, PromptSection, SectionKind, REFUSAL_PHRASE};
pub use retriever::Retriever;
pub use traits::VectorIndex;
