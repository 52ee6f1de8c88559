//! Deterministic text chunking along natural boundaries.
//!
//! Text is first split into pieces at the highest-priority boundary that
//! keeps each piece within `chunk_size` (paragraph break, then line break,
//! sentence end, space, and finally raw characters). Each piece retains its
//! trailing separator, so the ordered concatenation of pieces reconstructs
//! the source exactly. Pieces are then merged greedily into chunks of at
//! most `chunk_size` bytes; consecutive chunks share the smallest trailing
//! run of pieces totaling at least `chunk_overlap` bytes, except where the
//! size bound forces a shorter overlap.

use crate::types::{Chunk, ChunkMetadata, Document};
use std::collections::VecDeque;

const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    /// Panics if `chunk_overlap >= chunk_size` or `chunk_size == 0`; both
    /// would make the merge step unable to advance.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        assert!(chunk_size > 0, "chunk_size must be positive");
        assert!(
            chunk_overlap < chunk_size,
            "chunk_overlap must be smaller than chunk_size"
        );
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Split `text` into chunks of at most `chunk_size` bytes.
    ///
    /// Deterministic for fixed configuration and input. A document shorter
    /// than `chunk_size` yields exactly one chunk.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut pieces = Vec::new();
        self.split_pieces(text, &SEPARATORS, &mut pieces);

        self.merge_pieces(&pieces)
    }

    /// Chunk a document, carrying its provenance metadata onto every chunk.
    pub fn chunk_document(&self, document: &Document) -> Vec<Chunk> {
        let parts = self.chunk(&document.content);
        let total_chunks = parts.len();

        parts
            .into_iter()
            .enumerate()
            .map(|(chunk_index, content)| Chunk {
                content,
                metadata: ChunkMetadata {
                    source_path: document.metadata.source_path.clone(),
                    display_name: document.metadata.display_name.clone(),
                    token_count: document.metadata.token_count,
                    chunk_index,
                    total_chunks,
                },
            })
            .collect()
    }

    /// Recursively split on the highest-priority boundary until every piece
    /// fits in `chunk_size`. Separators stay attached to the preceding piece.
    fn split_pieces<'a>(&self, text: &'a str, separators: &[&str], out: &mut Vec<&'a str>) {
        if text.len() <= self.chunk_size {
            if !text.is_empty() {
                out.push(text);
            }
            return;
        }

        match separators.split_first() {
            Some((separator, rest)) => {
                for part in text.split_inclusive(separator) {
                    if part.len() <= self.chunk_size {
                        out.push(part);
                    } else {
                        self.split_pieces(part, rest, out);
                    }
                }
            }
            None => {
                // No boundary left: hard split at char boundaries.
                let mut start = 0;
                while start < text.len() {
                    let mut end = (start + self.chunk_size).min(text.len());
                    while !text.is_char_boundary(end) {
                        end -= 1;
                    }
                    out.push(&text[start..end]);
                    start = end;
                }
            }
        }
    }

    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut window_len = 0usize;

        for &piece in pieces {
            if window_len + piece.len() > self.chunk_size && !window.is_empty() {
                chunks.push(window.iter().copied().collect());

                // Retain the smallest trailing run of at least chunk_overlap
                // bytes as shared context for the next chunk.
                while let Some(front) = window.front() {
                    if window_len - front.len() < self.chunk_overlap {
                        break;
                    }
                    window_len -= front.len();
                    window.pop_front();
                }
                // The size bound wins over the overlap target.
                while window_len + piece.len() > self.chunk_size {
                    match window.pop_front() {
                        Some(front) => window_len -= front.len(),
                        None => break,
                    }
                }
            }

            window.push_back(piece);
            window_len += piece.len();
        }

        if !window.is_empty() {
            chunks.push(window.iter().copied().collect());
        }

        chunks
    }
}
