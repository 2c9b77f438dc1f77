use crate::embeddings::Embedder;
use crate::index::MemoryIndex;
use crate::llm::ChatModel;
use crate::memory::ConversationMemory;
use crate::prompt::Prompt;
use crate::retriever::Retriever;
use crate::traits::VectorIndex;
use crate::{ChatError, ChatOptions, RetrievedChunk, SearchError, Turn};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Answer returned when a question arrives before the engine is ready.
pub const NOT_READY_MESSAGE: &str = "No documents loaded. Check the corpus folder path.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Indexed,
    Ready,
}

/// Answers questions from the indexed corpus and keeps the session history.
pub struct ConversationEngine<E, M>
where
    E: Embedder + ?Sized,
    M: ChatModel + ?Sized,
{
    embedder: Arc<E>,
    retriever: Option<Retriever<E, MemoryIndex>>,
    model: Option<Arc<M>>,
    memory: Mutex<ConversationMemory>,
    options: ChatOptions,
}

impl<E, M> ConversationEngine<E, M>
where
    E: Embedder + ?Sized,
    M: ChatModel + ?Sized,
{
    pub fn new(embedder: Arc<E>, memory: ConversationMemory, options: ChatOptions) -> Self {
        Self {
            embedder,
            retriever: None,
            model: None,
            memory: Mutex::new(memory),
            options,
        }
    }

    pub fn state(&self) -> EngineState {
        match (&self.retriever, &self.model) {
            (None, _) => EngineState::Uninitialized,
            (Some(_), None) => EngineState::Indexed,
            (Some(_), Some(_)) => EngineState::Ready,
        }
    }

    pub fn install_index(&mut self, index: Arc<MemoryIndex>) -> Result<(), SearchError> {
        let retriever = Retriever::new(Arc::clone(&self.embedder), index)?;
        info!(chunks = retriever.index().len(), "index installed");
        self.retriever = Some(retriever);
        Ok(())
    }

    pub fn install_model(&mut self, model: Arc<M>) {
        info!(model = model.name(), "model installed");
        self.model = Some(model);
    }

    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>, SearchError> {
        match &self.retriever {
            Some(retriever) => retriever.search(query, top_k).await,
            None => Err(SearchError::NotReady("no index has been built".to_string())),
        }
    }

    /// Runs one turn: retrieve, assemble, generate, remember.
    ///
    /// The memory lock is held for the whole turn, so concurrent calls are
    /// serialized and each prompt sees every turn that completed before it.
    pub async fn respond(
        &self,
        question: &str,
        system_prompt: &str,
        max_tokens: u32,
    ) -> Result<String, ChatError> {
        let (Some(retriever), Some(model)) = (&self.retriever, &self.model) else {
            return Ok(NOT_READY_MESSAGE.to_string());
        };

        if question.trim().is_empty() {
            return Err(ChatError::EmptyQuestion);
        }

        let mut memory = self.memory.lock().await;
        let hits = retriever.search(question, self.options.top_k).await?;
        debug!(hits = hits.len(), "retrieved context");

        let prompt = Prompt::assemble(system_prompt, &hits, question, &memory.render_history());
        let answer = model
            .complete(&prompt.render(), self.options.clamp_max_tokens(max_tokens))
            .await?;

        memory.append(Turn {
            question: question.to_string(),
            answer: answer.clone(),
        });

        Ok(answer)
    }

    pub async fn history(&self) -> Vec<Turn> {
        self.memory.lock().await.snapshot()
    }

    pub async fn reset_memory(&self) {
        self.memory.lock().await.clear();
    }
}
