//! Similarity index abstraction and the in-memory flat index.
//!
//! The [`VectorIndex`] trait is the seam between the retrieval chain and the
//! storage of chunk vectors. [`FlatIndex`] keeps every vector in memory and
//! answers queries with an exhaustive cosine scan, which is exact and fast
//! enough for the few thousand chunks a single PDF produces.

use thiserror::Error;

use crate::embedding::cosine_similarity;
use crate::models::{Chunk, ScoredChunk};

#[derive(Debug, Error, PartialEq)]
pub enum IndexError {
    #[error("got {vectors} vectors for {chunks} chunks")]
    CountMismatch { chunks: usize, vectors: usize },
    #[error("vector has {got} dimensions, index expects {expected}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Storage and lookup of embedded chunks.
pub trait VectorIndex: Send + Sync {
    /// Add chunks with their embedding vectors (same order, same length).
    fn add(&mut self, chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<(), IndexError>;

    /// Return the `k` most similar chunks, best first.
    fn search(&self, query: &[f32], k: usize) -> Vec<ScoredChunk>;

    /// Number of stored chunks.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The chunk cut from page `page` (1-based) at position `index` (0-based).
    fn chunk(&self, page: usize, index: usize) -> Option<&Chunk>;
}

struct StoredVector {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// Exhaustive in-memory index.
#[derive(Default)]
pub struct FlatIndex {
    entries: Vec<StoredVector>,
    dims: Option<usize>,
}

impl FlatIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dimensionality of the stored vectors, once the first one is added.
    pub fn dims(&self) -> Option<usize> {
        self.dims
    }
}

impl VectorIndex for FlatIndex {
    fn add(&mut self, chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<(), IndexError> {
        if chunks.len() != vectors.len() {
            return Err(IndexError::CountMismatch {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }

        let expected = self
            .dims
            .or_else(|| vectors.first().map(|v| v.len()))
            .unwrap_or(0);
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
            return Err(IndexError::DimensionMismatch {
                expected,
                got: bad.len(),
            });
        }

        if !vectors.is_empty() {
            self.dims = Some(expected);
        }
        self.entries.extend(
            chunks
                .into_iter()
                .zip(vectors)
                .map(|(chunk, vector)| StoredVector { chunk, vector }),
        );
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|sv| ScoredChunk {
                chunk: sv.chunk.clone(),
                score: cosine_similarity(query, &sv.vector),
            })
            .collect();
        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        scored
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn chunk(&self, page: usize, index: usize) -> Option<&Chunk> {
        self.entries
            .iter()
            .map(|sv| &sv.chunk)
            .find(|c| c.page == page && c.chunk_index == index)
    }
}
