//! Core data models shared by the ingestion and retrieval pipeline.

use serde::Serialize;

/// One page of normalized PDF text. Page numbers start at 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub number: usize,
    pub text: String,
}

/// A bounded slice of a page's text, the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    /// Deterministic UUID derived from the document fingerprint and `source`.
    pub id: String,
    /// Fingerprint of the PDF this chunk came from.
    pub document_id: String,
    /// 1-based page number.
    pub page: usize,
    /// 0-based index of the chunk within its page.
    pub chunk_index: usize,
    /// Provenance tag, `"{page}-{chunk_index}"`.
    pub source: String,
    pub text: String,
    /// SHA-256 of `text`, hex encoded.
    pub hash: String,
}

/// A chunk returned from a similarity search, with its cosine score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}
