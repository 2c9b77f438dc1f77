use crate::chunking::{build_chunks, ChunkingConfig};
use crate::embeddings::Embedder;
use crate::index::MemoryIndex;
use crate::loader::{load_file, DocumentFormat};
use crate::{Chunk, IngestError, IngestionOptions, TextRecord};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub fn discover_supported_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for item in WalkDir::new(folder) {
        let entry = match item {
            Ok(entry) => entry,
            Err(error) => {
                warn!(folder = %folder.display(), reason = %error, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        if DocumentFormat::from_path(entry.path()).is_some() {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct IngestionReport {
    pub records: Vec<TextRecord>,
    pub loaded_files: usize,
    pub skipped_files: Vec<SkippedFile>,
}

/// Result of a full startup indexing run.
pub struct IndexBuild {
    pub index: MemoryIndex,
    pub record_count: usize,
    pub loaded_files: usize,
    pub skipped_files: Vec<SkippedFile>,
}

fn ensure_corpus_root(folder: &Path) -> Result<(), IngestError> {
    if folder.is_dir() {
        Ok(())
    } else {
        Err(IngestError::InvalidCorpusRoot(folder.display().to_string()))
    }
}

/// Loads every supported file under `folder`. Files that fail to load are
/// logged and reported, never fatal.
pub fn load_corpus(folder: &Path) -> Result<IngestionReport, IngestError> {
    ensure_corpus_root(folder)?;

    let mut report = IngestionReport::default();
    for path in discover_supported_files(folder) {
        match load_file(&path) {
            Ok(records) => {
                debug!(path = %path.display(), records = records.len(), "loaded file");
                report.loaded_files += 1;
                report.records.extend(records);
            }
            Err(error) => {
                warn!(path = %path.display(), reason = %error, "skipping file");
                report.skipped_files.push(SkippedFile {
                    path,
                    reason: error.to_string(),
                });
            }
        }
    }

    Ok(report)
}

pub fn split_records(
    records: &[TextRecord],
    config: ChunkingConfig,
) -> Result<Vec<Chunk>, IngestError> {
    let mut chunks = Vec::new();
    let mut cursor = 0u64;

    for record in records {
        let (record_chunks, next_cursor) = build_chunks(record, config, cursor)?;
        cursor = next_cursor;
        chunks.extend(record_chunks);
    }

    Ok(chunks)
}

/// Loaded and chunked corpus, ready to embed.
pub struct ChunkedCorpus {
    pub report: IngestionReport,
    pub chunks: Vec<Chunk>,
}

/// Loads and chunks the corpus without embedding it. A corpus that yields no
/// chunks is an error.
pub fn ingest_folder_chunks(
    folder: &Path,
    options: &IngestionOptions,
) -> Result<ChunkedCorpus, IngestError> {
    let report = load_corpus(folder)?;
    let chunks = split_records(&report.records, ChunkingConfig::from(options))?;

    if chunks.is_empty() {
        return Err(IngestError::EmptyCorpus(folder.display().to_string()));
    }

    Ok(ChunkedCorpus { report, chunks })
}

/// Loads, chunks and embeds the corpus into a searchable index.
pub async fn build_index<E>(
    folder: &Path,
    options: &IngestionOptions,
    embedder: &E,
) -> Result<IndexBuild, IngestError>
where
    E: Embedder + ?Sized,
{
    let ChunkedCorpus { report, chunks } = ingest_folder_chunks(folder, options)?;

    info!(
        folder = %folder.display(),
        files = report.loaded_files,
        skipped = report.skipped_files.len(),
        chunk_count = chunks.len(),
        "embedding chunks"
    );

    let batch_size = options.embed_batch_size.max(1);
    let mut embeddings = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(batch_size) {
        let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
        embeddings.extend(embedder.embed_batch(&texts).await?);
    }

    let index = MemoryIndex::build(embedder.dimensions(), chunks, embeddings)?;

    Ok(IndexBuild {
        index,
        record_count: report.records.len(),
        loaded_files: report.loaded_files,
        skipped_files: report.skipped_files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;
    use crate::traits::VectorIndex;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn discover_supported_files_is_recursive() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        let nested = base.join("nested");
        fs::create_dir(&nested)?;

        fs::write(base.join("a.txt"), "a")?;
        fs::write(nested.join("b.MD"), "b")?;
        fs::write(nested.join("c.png"), "c")?;

        let files = discover_supported_files(base);
        assert_eq!(files.len(), 2);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subdirectory_does_not_stop_discovery() -> Result<(), Box<dyn std::error::Error>> {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir()?;
        let locked = dir.path().join("locked");
        fs::create_dir(&locked)?;
        fs::write(locked.join("hidden.txt"), "hidden")?;
        fs::write(dir.path().join("visible.txt"), "visible")?;
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000))?;

        let files = discover_supported_files(dir.path());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))?;

        assert!(files.contains(&dir.path().join("visible.txt")));
        Ok(())
    }

    #[test]
    fn missing_root_is_a_configuration_error() {
        let result = load_corpus(Path::new("/definitely/not/here"));
        assert!(matches!(result, Err(IngestError::InvalidCorpusRoot(_))));
    }

    #[test]
    fn file_root_is_a_configuration_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let file = dir.path().join("a.txt");
        fs::write(&file, "text")?;

        assert!(matches!(
            load_corpus(&file),
            Err(IngestError::InvalidCorpusRoot(_))
        ));
        Ok(())
    }

    #[test]
    fn unsupported_files_only_is_an_empty_corpus() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("photo.png"), [0x89, 0x50])?;

        let result = ingest_folder_chunks(dir.path(), &IngestionOptions::default());
        assert!(matches!(result, Err(IngestError::EmptyCorpus(_))));
        Ok(())
    }

    #[tokio::test]
    async fn build_index_rejects_corpus_without_chunks() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("photo.png"), [0x89, 0x50])?;
        fs::write(dir.path().join("blank.txt"), "  \n\n ")?;

        let embedder = CharacterNgramEmbedder { dimensions: 32 };
        let result = build_index(dir.path(), &IngestionOptions::default(), &embedder).await;

        assert!(matches!(result, Err(IngestError::EmptyCorpus(_))));
        Ok(())
    }

    #[test]
    fn best_effort_skips_unreadable_files() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("unreadable.pdf"), b"%PDF-1.4\n%broken")?;
        fs::write(dir.path().join("notes.txt"), "readable notes")?;

        let report = load_corpus(dir.path())?;

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.loaded_files, 1);
        assert_eq!(report.skipped_files.len(), 1);
        assert_eq!(
            report.skipped_files[0]
                .path
                .file_name()
                .and_then(|name| name.to_str()),
            Some("unreadable.pdf")
        );
        Ok(())
    }

    #[test]
    fn chunking_is_reproducible_across_runs() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(
            dir.path().join("long.md"),
            "# Heading\n\nSome paragraph text. ".repeat(60),
        )?;
        fs::write(dir.path().join("short.txt"), "alpha beta gamma")?;

        let options = IngestionOptions::default();
        let first = ingest_folder_chunks(dir.path(), &options)?.chunks;
        let second = ingest_folder_chunks(dir.path(), &options)?.chunks;

        assert!(first.len() > 2);
        assert_eq!(first, second);
        assert!(first
            .iter()
            .enumerate()
            .all(|(position, chunk)| chunk.chunk_index == position as u64));
        Ok(())
    }

    #[tokio::test]
    async fn build_index_embeds_every_chunk() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("notes.txt"), "alpha beta gamma")?;
        fs::write(dir.path().join("ignored.png"), [0u8; 4])?;

        let embedder = CharacterNgramEmbedder { dimensions: 64 };
        let options = IngestionOptions {
            embed_batch_size: 1,
            ..IngestionOptions::default()
        };
        let build = build_index(dir.path(), &options, &embedder).await?;

        assert_eq!(build.index.len(), 1);
        assert_eq!(build.index.dimensions(), 64);
        assert_eq!(build.loaded_files, 1);
        assert!(build.skipped_files.is_empty());
        Ok(())
    }
}
