use anyhow::Context;
use askdocs_core::{
    build_index, CharacterNgramEmbedder, ChatOptions, ConversationEngine, ConversationMemory,
    EmbeddingBackend, HttpEmbedder, HttpEmbedderConfig, IndexBuild, IngestionOptions,
    OpenAiChatConfig, OpenAiChatModel, Retriever, VectorIndex,
};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_SYSTEM_PROMPT: &str = "You are Meera, an assistant AI chatbot.";

type Engine = ConversationEngine<EmbeddingBackend, OpenAiChatModel>;

#[derive(Parser)]
#[command(name = "askdocs", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Folder with PDF, Word, text and markdown files, read recursively
    #[arg(long, env = "ASKDOCS_CORPUS", default_value = "./documents")]
    corpus: PathBuf,

    /// Maximum chunk length in characters
    #[arg(long, default_value = "500")]
    chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[arg(long, default_value = "50")]
    chunk_overlap: usize,

    /// Embedding backend used for both indexing and queries
    #[arg(long, value_enum, env = "ASKDOCS_EMBEDDING_BACKEND", default_value_t = EmbeddingKind::Ngram)]
    embedding_backend: EmbeddingKind,

    /// OpenAI-compatible embeddings API base URL
    #[arg(long, env = "ASKDOCS_EMBEDDING_URL", default_value = "http://localhost:11434/v1")]
    embedding_url: String,

    /// Embedding model name
    #[arg(
        long,
        env = "ASKDOCS_EMBEDDING_MODEL",
        default_value = "sentence-transformers/all-mpnet-base-v2"
    )]
    embedding_model: String,

    /// Vector size produced by the embedding backend
    #[arg(long, env = "ASKDOCS_EMBEDDING_DIMENSIONS", default_value = "768")]
    embedding_dimensions: usize,

    /// Credential for the embeddings API
    #[arg(long, env = "ASKDOCS_EMBEDDING_API_KEY", hide_env_values = true)]
    embedding_api_key: Option<String>,

    /// OpenAI-compatible chat completions API base URL
    #[arg(long, env = "ASKDOCS_LLM_URL", default_value = "https://api.groq.com/openai/v1")]
    llm_url: String,

    /// Chat model name
    #[arg(long, env = "ASKDOCS_LLM_MODEL", default_value = "llama3-8b-8192")]
    llm_model: String,

    /// Credential for the chat completions API
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    llm_api_key: Option<String>,

    /// Timeout for each embedding or model request, in seconds
    #[arg(long, default_value = "60")]
    request_timeout_secs: u64,

    /// Number of chunks placed in each prompt
    #[arg(long, default_value = "3")]
    context_chunks: usize,

    /// Keep only the most recent N turns in the conversation history
    #[arg(long)]
    max_history_turns: Option<usize>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EmbeddingKind {
    /// Local hashed character trigrams, no network
    Ngram,
    /// Remote embeddings API
    Http,
}

#[derive(Subcommand)]
enum Command {
    /// Build the index and report what was loaded.
    Index,
    /// Print the chunks retrieved for a query.
    Search {
        /// Search query
        #[arg(long)]
        query: String,
        /// Number of chunks to return.
        #[arg(long, default_value = "3")]
        top_k: usize,
    },
    /// Ask a single question and print the answer.
    Ask {
        /// Question about the documents
        #[arg(long)]
        question: String,
        #[arg(long, default_value = DEFAULT_SYSTEM_PROMPT)]
        system_prompt: String,
        /// Upper bound on answer length.
        #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(10..=300))]
        max_tokens: u32,
    },
    /// Interactive chat. `/reset` clears history, `/quit` exits.
    Chat {
        #[arg(long, default_value = DEFAULT_SYSTEM_PROMPT)]
        system_prompt: String,
        /// Upper bound on answer length.
        #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(10..=300))]
        max_tokens: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        corpus = %cli.corpus.display(),
        "askdocs boot"
    );

    let embedder = Arc::new(build_embedder(&cli)?);
    let options = IngestionOptions {
        chunk_max_chars: cli.chunk_size,
        chunk_overlap_chars: cli.chunk_overlap,
        ..IngestionOptions::default()
    };

    match &cli.command {
        Command::Index => {
            let build = index_corpus(&cli.corpus, &options, &embedder).await?;
            println!(
                "{} chunks from {} records in {} files (built at {})",
                build.index.len(),
                build.record_count,
                build.loaded_files,
                build.index.built_at().to_rfc3339()
            );
            for skipped in &build.skipped_files {
                println!("  skipped {}: {}", skipped.path.display(), skipped.reason);
            }
        }
        Command::Search { query, top_k } => {
            let build = index_corpus(&cli.corpus, &options, &embedder).await?;
            let retriever = Retriever::new(Arc::clone(&embedder), Arc::new(build.index))?;
            let hits = retriever.search(query, *top_k).await?;

            println!("query: {query}");
            for hit in hits {
                let page = hit
                    .chunk
                    .page
                    .map(|page| format!(" page={page}"))
                    .unwrap_or_default();
                println!(
                    "[{}] distance={:.4} source={}{}",
                    hit.chunk.chunk_index,
                    hit.distance(),
                    hit.chunk.source_path,
                    page
                );
                println!("  chunk_text:\n{}", hit.chunk.text);
            }
        }
        Command::Ask {
            question,
            system_prompt,
            max_tokens,
        } => {
            let engine = ready_engine(&cli, &options, embedder).await?;
            let answer = engine.respond(question, system_prompt, *max_tokens).await?;
            println!("{answer}");
        }
        Command::Chat {
            system_prompt,
            max_tokens,
        } => {
            let engine = ready_engine(&cli, &options, embedder).await?;
            chat_loop(&engine, system_prompt, *max_tokens).await?;
        }
    }

    Ok(())
}

fn build_embedder(cli: &Cli) -> anyhow::Result<EmbeddingBackend> {
    Ok(match cli.embedding_backend {
        EmbeddingKind::Ngram => EmbeddingBackend::Ngram(CharacterNgramEmbedder::default()),
        EmbeddingKind::Http => EmbeddingBackend::Http(
            HttpEmbedder::new(HttpEmbedderConfig {
                base_url: cli.embedding_url.clone(),
                model: cli.embedding_model.clone(),
                api_key: cli.embedding_api_key.clone(),
                dimensions: cli.embedding_dimensions,
                timeout: Duration::from_secs(cli.request_timeout_secs),
            })
            .context("invalid embedding backend configuration")?,
        ),
    })
}

async fn index_corpus(
    corpus: &Path,
    options: &IngestionOptions,
    embedder: &EmbeddingBackend,
) -> anyhow::Result<IndexBuild> {
    let build = build_index(corpus, options, embedder)
        .await
        .with_context(|| format!("failed to index corpus at {}", corpus.display()))?;

    if !build.skipped_files.is_empty() {
        warn!(
            "skipped_files={} for corpus={}",
            build.skipped_files.len(),
            corpus.display()
        );
    }
    info!(chunk_count = build.index.len(), "index ready");

    Ok(build)
}

async fn ready_engine(
    cli: &Cli,
    options: &IngestionOptions,
    embedder: Arc<EmbeddingBackend>,
) -> anyhow::Result<Engine> {
    let build = index_corpus(&cli.corpus, options, &embedder).await?;

    let memory = match cli.max_history_turns {
        Some(max_turns) => ConversationMemory::with_max_turns(max_turns),
        None => ConversationMemory::new(),
    };
    let chat_options = ChatOptions {
        top_k: cli.context_chunks.max(1),
        ..ChatOptions::default()
    };

    let mut engine = ConversationEngine::new(embedder, memory, chat_options);
    engine.install_index(Arc::new(build.index))?;

    if cli.llm_api_key.is_none() {
        warn!("no chat API key configured; the model endpoint may reject requests");
    }
    let model = OpenAiChatModel::new(OpenAiChatConfig {
        base_url: cli.llm_url.clone(),
        model: cli.llm_model.clone(),
        api_key: cli.llm_api_key.clone(),
        temperature: None,
        timeout: Duration::from_secs(cli.request_timeout_secs),
    })
    .context("invalid chat model configuration")?;
    engine.install_model(Arc::new(model));

    Ok(engine)
}

async fn chat_loop(engine: &Engine, system_prompt: &str, max_tokens: u32) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let question = line.trim();
        match question {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                engine.reset_memory().await;
                println!("(conversation history cleared)\n");
                continue;
            }
            "/history" => {
                for turn in engine.history().await {
                    println!("Q: {}\nA: {}\n", turn.question, turn.answer);
                }
                continue;
            }
            _ => {}
        }

        match engine.respond(question, system_prompt, max_tokens).await {
            Ok(answer) => println!("{answer}\n"),
            Err(error) => {
                warn!(%error, "turn failed");
                println!("error: {error}\n");
            }
        }
    }

    Ok(())
}
