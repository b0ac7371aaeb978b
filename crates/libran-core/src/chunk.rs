//! Recursive character text splitter.
//!
//! Splits page text into [`Chunk`]s no longer than `chunk_size` characters.
//! The splitter tries a hierarchy of separators, coarsest first: paragraph
//! breaks, line breaks, sentence punctuation, commas, spaces, and finally
//! individual characters. Small pieces are merged back together greedily so
//! chunks stay close to `chunk_size`, with up to `chunk_overlap` characters
//! repeated between neighbouring chunks.
//!
//! The separator a piece was split on is dropped and re-inserted between
//! pieces when they are merged, so it counts towards the chunk length only
//! where it joins two pieces. Lengths are counted in Unicode scalar values,
//! so multi-byte text is never cut inside a character.
//!
//! Each chunk receives a deterministic UUID derived from its document
//! fingerprint and provenance tag, plus a SHA-256 hash of its text.

use std::collections::VecDeque;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::{Chunk, Page};

/// Separator hierarchy, coarsest first. `""` splits into characters.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", ".", "!", "?", ",", " ", ""];

/// Default maximum chunk length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 2000;

#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveSplitter {
    /// Create a splitter with the default separator hierarchy.
    ///
    /// `chunk_size` must be > 0 and `chunk_overlap` < `chunk_size`; the app
    /// config enforces both before a splitter is built.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into trimmed, non-empty pieces.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let separators: Vec<&str> = self.separators.iter().map(String::as_str).collect();
        self.split_recursive(text, &separators)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut separator = separators.last().copied().unwrap_or("");
        let mut finer: &[&str] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = sep;
                break;
            }
            if text.contains(sep) {
                separator = sep;
                finer = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut small: Vec<&str> = Vec::new();

        for piece in split_on(text, separator) {
            if char_len(piece) < self.chunk_size {
                small.push(piece);
                continue;
            }
            if !small.is_empty() {
                chunks.extend(self.merge_pieces(&small, separator));
                small.clear();
            }
            if finer.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }

        if !small.is_empty() {
            chunks.extend(self.merge_pieces(&small, separator));
        }

        chunks
    }

    /// Greedily join pieces with `separator` into chunks of at most
    /// `chunk_size` characters, carrying up to `chunk_overlap` characters of
    /// trailing pieces into the next chunk.
    fn merge_pieces(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut merged = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            let joint = |window: &VecDeque<&str>| if window.is_empty() { 0 } else { sep_len };

            if total + len + joint(&window) > self.chunk_size && !window.is_empty() {
                if let Some(doc) = join_window(&window, separator) {
                    merged.push(doc);
                }
                // Shrink until only the overlap remains and the next piece fits.
                while let Some(&front) = window.front() {
                    let over_overlap = total > self.chunk_overlap;
                    let too_long = total + len + joint(&window) > self.chunk_size;
                    if !over_overlap && !too_long {
                        break;
                    }
                    let joined = if window.len() > 1 { sep_len } else { 0 };
                    total -= char_len(front) + joined;
                    window.pop_front();
                }
            }

            total += len + joint(&window);
            window.push_back(piece);
        }

        if let Some(doc) = join_window(&window, separator) {
            merged.push(doc);
        }

        merged
    }
}

impl Default for RecursiveSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, 0)
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn split_on<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        text.char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect()
    } else {
        text.split(separator).filter(|s| !s.is_empty()).collect()
    }
}

fn join_window(window: &VecDeque<&str>, separator: &str) -> Option<String> {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Chunk every page of a document.
///
/// Pages keep their own numbering; chunk indices restart at 0 on each page.
/// Pages without text produce no chunks.
pub fn chunk_pages(
    document_id: &str,
    pages: &[Page],
    splitter: &RecursiveSplitter,
) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for page in pages {
        for (index, text) in splitter.split_text(&page.text).into_iter().enumerate() {
            chunks.push(make_chunk(document_id, page.number, index, text));
        }
    }
    chunks
}

fn make_chunk(document_id: &str, page: usize, chunk_index: usize, text: String) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    let source = format!("{}-{}", page, chunk_index);
    let id = Uuid::new_v5(
        &Uuid::NAMESPACE_OID,
        format!("{}:{}", document_id, source).as_bytes(),
    );

    Chunk {
        id: id.to_string(),
        document_id: document_id.to_string(),
        page,
        chunk_index,
        source,
        text,
        hash,
    }
}
