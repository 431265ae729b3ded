//! Separator-based character splitter.
//!
//! Text is cut on a separator, then the pieces are greedily merged back
//! (joined with the separator) into chunks of at most `chunk_size`
//! characters. When a chunk is emitted, trailing pieces worth at most
//! `chunk_overlap` characters are carried into the next one.

use std::collections::VecDeque;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct CharacterSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separator: String,
}

impl Default for CharacterSplitter {
    fn default() -> Self {
        Self { chunk_size: 500, chunk_overlap: 50, separator: "\n\n".to_string() }
    }
}

impl CharacterSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize, separator: impl Into<String>) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be positive".into()));
        }
        if chunk_overlap > chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({chunk_overlap}) is larger than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap, separator: separator.into() })
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        let pieces: Vec<&str> = if self.separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split(self.separator.as_str()).filter(|s| !s.is_empty()).collect()
        };
        self.merge(&pieces)
    }

    fn merge<'a>(&self, pieces: &[&'a str]) -> Vec<String> {
        let sep_len = char_len(&self.separator);
        let mut chunks = Vec::new();
        let mut current: VecDeque<&'a str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            let joiner = |current: &VecDeque<&str>| if current.is_empty() { 0 } else { sep_len };

            if total + len + joiner(&current) > self.chunk_size {
                if total > self.chunk_size {
                    tracing::warn!(
                        size = total,
                        limit = self.chunk_size,
                        "created a chunk longer than the configured chunk size"
                    );
                }
                if !current.is_empty() {
                    if let Some(chunk) = self.join(&current) {
                        chunks.push(chunk);
                    }
                    // Keep a tail no larger than the overlap that still leaves room for `piece`.
                    while total > self.chunk_overlap
                        || (total > 0 && total + len + joiner(&current) > self.chunk_size)
                    {
                        let Some(first) = current.pop_front() else { break };
                        let dropped = char_len(first) + if current.is_empty() { 0 } else { sep_len };
                        total = total.saturating_sub(dropped);
                    }
                }
            }

            current.push_back(piece);
            total += len + if current.len() > 1 { sep_len } else { 0 };
        }

        if let Some(chunk) = self.join(&current) {
            chunks.push(chunk);
        }
        chunks
    }

    fn join(&self, pieces: &VecDeque<&str>) -> Option<String> {
        let joined = pieces.iter().copied().collect::<Vec<_>>().join(&self.separator);
        let trimmed = joined.trim();
        if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
