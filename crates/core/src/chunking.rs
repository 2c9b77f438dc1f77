use crate::error::IngestError;
use crate::models::{Chunk, IngestionOptions, TextRecord};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;

/// Split points tried in order: paragraph, line, sentence, word, then a hard
/// character cut (the empty separator).
pub const SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl From<&IngestionOptions> for ChunkingConfig {
    fn from(value: &IngestionOptions) -> Self {
        Self {
            max_chars: value.chunk_max_chars,
            overlap_chars: value.chunk_overlap_chars,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self::from(&IngestionOptions::default())
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.max_chars == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "max_chars must be greater than zero".to_string(),
            ));
        }
        if self.overlap_chars >= self.max_chars {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {} must be smaller than max_chars {}",
                self.overlap_chars, self.max_chars
            )));
        }
        Ok(())
    }
}

/// Splits `text` into trimmed pieces of at most `config.max_chars` characters,
/// consecutive pieces sharing up to `config.overlap_chars` characters.
pub fn split_text(text: &str, config: ChunkingConfig) -> Vec<String> {
    split_recursive(text, &SEPARATORS, config)
}

fn split_recursive(text: &str, separators: &[&str], config: ChunkingConfig) -> Vec<String> {
    let (index, separator) = separators
        .iter()
        .enumerate()
        .find(|(_, separator)| separator.is_empty() || text.contains(**separator))
        .map(|(index, separator)| (index, *separator))
        .unwrap_or((separators.len(), ""));
    let remaining = separators.get(index + 1..).unwrap_or(&[]);

    let pieces: Vec<&str> = if separator.is_empty() {
        text.char_indices()
            .map(|(start, ch)| &text[start..start + ch.len_utf8()])
            .collect()
    } else {
        text.split_inclusive(separator).collect()
    };

    let mut chunks = Vec::new();
    let mut pending: Vec<&str> = Vec::new();

    for piece in pieces {
        if char_len(piece) <= config.max_chars {
            pending.push(piece);
            continue;
        }

        if !pending.is_empty() {
            chunks.extend(merge_pieces(&pending, config));
            pending.clear();
        }

        if remaining.is_empty() {
            chunks.extend(merge_pieces(&[piece], config));
        } else {
            chunks.extend(split_recursive(piece, remaining, config));
        }
    }

    if !pending.is_empty() {
        chunks.extend(merge_pieces(&pending, config));
    }

    chunks
}

fn merge_pieces(pieces: &[&str], config: ChunkingConfig) -> Vec<String> {
    let mut merged = Vec::new();
    let mut window: VecDeque<&str> = VecDeque::new();
    let mut window_len = 0usize;

    for &piece in pieces {
        let piece_len = char_len(piece);

        if piece_len > config.max_chars {
            push_window(&mut merged, &window);
            window.clear();
            window_len = 0;
            let chars: Vec<char> = piece.chars().collect();
            for slice in chars.chunks(config.max_chars.max(1)) {
                let text: String = slice.iter().collect();
                push_trimmed(&mut merged, &text);
            }
            continue;
        }

        if !window.is_empty() && window_len + piece_len > config.max_chars {
            push_window(&mut merged, &window);
            while window_len > config.overlap_chars
                || (window_len > 0 && window_len + piece_len > config.max_chars)
            {
                match window.pop_front() {
                    Some(front) => window_len -= char_len(front),
                    None => break,
                }
            }
        }

        window.push_back(piece);
        window_len += piece_len;
    }

    push_window(&mut merged, &window);
    merged
}

fn push_window(target: &mut Vec<String>, window: &VecDeque<&str>) {
    let joined: String = window.iter().copied().collect();
    push_trimmed(target, &joined);
}

fn push_trimmed(target: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        target.push(trimmed.to_string());
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Splits one record into chunks, numbering them from `global_index`.
/// Returns the chunks and the next free index.
pub fn build_chunks(
    record: &TextRecord,
    config: ChunkingConfig,
    global_index: u64,
) -> Result<(Vec<Chunk>, u64), IngestError> {
    config.validate()?;

    let source_path = record.source.to_string_lossy().to_string();
    let mut chunks = Vec::new();
    let mut cursor = global_index;

    for text in split_text(&record.content, config) {
        chunks.push(Chunk {
            chunk_id: make_chunk_id(&source_path, record.page, cursor, &text),
            text,
            source_path: source_path.clone(),
            page: record.page,
            chunk_index: cursor,
        });
        cursor = cursor.saturating_add(1);
    }

    Ok((chunks, cursor))
}

fn make_chunk_id(source_path: &str, page: Option<u32>, index: u64, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_path.as_bytes());
    hasher.update(page.unwrap_or(0).to_le_bytes());
    hasher.update(index.to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ChunkingConfig {
        ChunkingConfig {
            max_chars: 500,
            overlap_chars: 50,
        }
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = split_text("alpha beta gamma", config());
        assert_eq!(chunks, vec!["alpha beta gamma".to_string()]);
    }

    #[test]
    fn blank_text_produces_no_chunks() {
        assert!(split_text("  \n\n \t ", config()).is_empty());
    }

    #[test]
    fn paragraphs_are_preferred_split_points() {
        let first = "alpha ".repeat(50).trim().to_string();
        let second = "omega ".repeat(50).trim().to_string();
        let text = format!("{first}\n\n{second}");

        let chunks = split_text(&text, config());
        assert_eq!(chunks, vec![first, second]);
    }

    #[test]
    fn word_split_chunks_respect_limit_and_overlap() {
        let text = (0..200)
            .map(|index| format!("word{index}"))
            .collect::<Vec<_>>()
            .join(" ");

        let chunks = split_text(&text, config());
        assert!(chunks.len() >= 2);
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 500));

        let opening = chunks[1].split_whitespace().next().unwrap_or_default();
        assert_ne!(opening, "word0");
        assert!(chunks[0].split_whitespace().any(|word| word == opening));
    }

    #[test]
    fn unbroken_text_falls_back_to_hard_cut() {
        let text = "x".repeat(1_200);
        let chunks = split_text(&text, config());

        let lengths: Vec<usize> = chunks.iter().map(|chunk| chunk.chars().count()).collect();
        assert_eq!(lengths, vec![500, 500, 300]);
    }

    #[test]
    fn multibyte_text_is_cut_on_char_boundaries() {
        let text = "é".repeat(600);
        let chunks = split_text(&text, config());
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 500));
        assert_eq!(chunks[0].chars().count(), 500);
    }

    #[test]
    fn splitting_is_deterministic() {
        let text = "First sentence here. Second sentence follows.\nA new line.\n\n".repeat(40);
        assert_eq!(split_text(&text, config()), split_text(&text, config()));
    }

    #[test]
    fn build_chunks_inherits_source_and_numbers_sequentially() {
        let record = TextRecord::new("one two three", "/tmp/notes.txt").with_page(4);
        let (chunks, next) = build_chunks(&record, config(), 7).expect("chunking should succeed");

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].source_path, "/tmp/notes.txt");
        assert_eq!(chunks[0].page, Some(4));
        assert_eq!(chunks[0].chunk_index, 7);
        assert_eq!(next, 8);
    }

    #[test]
    fn overlap_not_smaller_than_max_is_rejected() {
        let invalid = ChunkingConfig {
            max_chars: 50,
            overlap_chars: 50,
        };
        assert!(matches!(
            invalid.validate(),
            Err(IngestError::InvalidChunkConfig(_))
        ));
    }
}
