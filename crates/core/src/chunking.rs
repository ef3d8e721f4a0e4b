use crate::error::IngestError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Boundaries tried in order: paragraph, line, sentence, word, then a hard
/// character cut.
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "chunk_overlap {} must be smaller than chunk_size {}",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1_000,
            chunk_overlap: 200,
        }
    }
}

pub fn normalize_whitespace(text: &str) -> String {
    text.replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits text into chunks of at most `chunk_size` characters, preferring the
/// coarsest boundary that fits. Consecutive chunks share up to
/// `chunk_overlap` characters taken from the tail of the previous chunk.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    config: ChunkingConfig,
    separators: Vec<String>,
}

impl RecursiveSplitter {
    pub fn new(config: ChunkingConfig) -> Result<Self, IngestError> {
        Self::with_separators(config, &DEFAULT_SEPARATORS)
    }

    pub fn with_separators(config: ChunkingConfig, separators: &[&str]) -> Result<Self, IngestError> {
        config.validate()?;
        let mut separators: Vec<String> = separators.iter().map(|sep| sep.to_string()).collect();
        if separators.last().map_or(true, |last| !last.is_empty()) {
            separators.push(String::new());
        }
        Ok(Self { config, separators })
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_with(text, &self.separators)
    }

    fn split_with(&self, text: &str, separators: &[String]) -> Vec<String> {
        let position = separators
            .iter()
            .position(|sep| sep.is_empty() || text.contains(sep.as_str()))
            .unwrap_or(separators.len().saturating_sub(1));
        let separator = separators[position].as_str();
        let finer = &separators[position + 1..];

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();

        for piece in split_keeping_chars(text, separator) {
            if char_len(piece) <= self.config.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting));
                fitting.clear();
            }

            if finer.is_empty() {
                chunks.push(piece.trim().to_string());
            } else {
                chunks.extend(self.split_with(piece, finer));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting));
        }

        chunks
    }

    /// Pieces still carry their separators, so joining is plain
    /// concatenation and lengths add up exactly.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut merged = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);

            if !current.is_empty() && total + len > self.config.chunk_size {
                push_joined(&mut merged, &current);

                while !current.is_empty()
                    && (total > self.config.chunk_overlap || total + len > self.config.chunk_size)
                {
                    if let Some(first) = current.pop_front() {
                        total -= char_len(first);
                    }
                }
            }

            total += len;
            current.push_back(piece);
        }

        push_joined(&mut merged, &current);
        merged
    }
}

fn push_joined(target: &mut Vec<String>, pieces: &VecDeque<&str>) {
    let joined: String = pieces.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        target.push(trimmed.to_string());
    }
}

/// Splits after each separator, leaving it on the end of the preceding piece.
fn split_keeping_chars<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(start, ch)| &text[start..start + ch.len_utf8()])
            .collect();
    }

    text.split_inclusive(separator).collect()
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
