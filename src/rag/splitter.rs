//! Recursive character text splitting.
//!
//! Text is split on the coarsest separator that occurs in it (paragraphs,
//! then lines, then words, then characters). Pieces that are still too large
//! are split again with the finer separators; small pieces are merged back
//! into chunks of at most `chunk_size` characters, carrying up to
//! `chunk_overlap` characters of the previous chunk forward.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitterConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Characters shared with the previous chunk
    pub chunk_overlap: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SplitterError {
    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,
    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({size})")]
    OverlapTooLarge { overlap: usize, size: usize },
}

/// A fragment of the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub text: String,
    /// Position within the split sequence
    pub index: usize,
    /// Byte offset of the chunk in the source text
    pub start_offset: usize,
}

#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: SplitterConfig,
}

impl TextSplitter {
    pub fn new(config: SplitterConfig) -> Result<Self, SplitterError> {
        if config.chunk_size == 0 {
            return Err(SplitterError::ZeroChunkSize);
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(SplitterError::OverlapTooLarge {
                overlap: config.chunk_overlap,
                size: config.chunk_size,
            });
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    pub fn split(&self, text: &str) -> Vec<TextChunk> {
        let pieces = self.split_recursive(text, &SEPARATORS);

        let mut chunks = Vec::with_capacity(pieces.len());
        let mut search_from = 0;
        for (index, piece) in pieces.into_iter().enumerate() {
            let start_offset = match text[search_from..].find(&piece) {
                Some(pos) => search_from + pos,
                None => text.find(&piece).unwrap_or(search_from),
            };
            search_from = next_char_boundary(text, start_offset);
            chunks.push(TextChunk {
                text: piece,
                index,
                start_offset,
            });
        }
        chunks
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut separator = "";
        let mut finer: &[&str] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = candidate;
                break;
            }
            if text.contains(candidate) {
                separator = candidate;
                finer = &separators[i + 1..];
                break;
            }
        }

        let splits: Vec<&str> = if separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split(separator).collect()
        };

        let mut output = Vec::new();
        let mut small: Vec<&str> = Vec::new();
        for piece in splits {
            if char_len(piece) < self.config.chunk_size {
                small.push(piece);
                continue;
            }
            if !small.is_empty() {
                output.extend(self.merge(&small, separator));
                small.clear();
            }
            if finer.is_empty() {
                output.push(piece.to_string());
            } else {
                output.extend(self.split_recursive(piece, finer));
            }
        }
        if !small.is_empty() {
            output.extend(self.merge(&small, separator));
        }
        output
    }

    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;
        let sep_len = char_len(separator);

        let mut docs = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);
            let joined_len = |total: usize, current: &VecDeque<&str>| {
                total + len + if current.is_empty() { 0 } else { sep_len }
            };

            if joined_len(total, &current) > size && !current.is_empty() {
                if let Some(doc) = join(&current, separator) {
                    docs.push(doc);
                }
                while total > overlap || (joined_len(total, &current) > size && total > 0) {
                    let Some(front) = current.pop_front() else {
                        break;
                    };
                    total -= char_len(front) + if current.is_empty() { 0 } else { sep_len };
                }
            }

            current.push_back(piece);
            total += len + if current.len() > 1 { sep_len } else { 0 };
        }

        if let Some(doc) = join(&current, separator) {
            docs.push(doc);
        }
        docs
    }
}

fn join(pieces: &VecDeque<&str>, separator: &str) -> Option<String> {
    let text = pieces
        .iter()
        .copied()
        .collect::<Vec<_>>()
        .join(separator);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn next_char_boundary(text: &str, from: usize) -> usize {
    text[from..]
        .chars()
        .next()
        .map(|c| from + c.len_utf8())
        .unwrap_or(from)
}
