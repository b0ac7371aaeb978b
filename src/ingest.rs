//! Ingestion pipeline orchestration.
//!
//! Coordinates the flow from uploaded bytes to a searchable document:
//! size check → extraction → normalization → chunking → embedding → index.
//! The first four steps are local and synchronous ([`prepare_pdf`]); the
//! embedding step calls the configured provider ([`build_index`]).

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use libran_core::chunk::{chunk_pages, RecursiveSplitter};
use libran_core::embedding::Embedder;
use libran_core::index::{FlatIndex, VectorIndex};
use libran_core::models::{Chunk, Page};
use libran_core::normalize::normalize_page;

use crate::config::Config;
use crate::extract::{extract_pages_bounded, ExtractError};
use crate::progress::{IngestProgressEvent, IngestProgressReporter};

/// A PDF that has been extracted and chunked but not embedded.
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    pub name: String,
    /// SHA-256 of the PDF bytes, hex encoded.
    pub fingerprint: String,
    pub pages: Vec<Page>,
    pub chunks: Vec<Chunk>,
}

/// A document ready for questions.
pub struct IngestedDocument {
    pub name: String,
    pub fingerprint: String,
    pub pages: Vec<Page>,
    pub chunks: Vec<Chunk>,
    pub index: Arc<dyn VectorIndex>,
}

pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

pub fn splitter(config: &Config) -> RecursiveSplitter {
    RecursiveSplitter::new(config.chunking.chunk_size, config.chunking.chunk_overlap)
}

/// Extract, normalize, and chunk a PDF. No network access.
pub fn prepare_pdf(name: &str, bytes: &[u8], config: &Config) -> Result<PreparedDocument> {
    let raw = extract_pages_bounded(bytes, config.ingest.max_pdf_bytes)?;
    prepare_text(name, fingerprint(bytes), raw, config)
}

/// Normalize and chunk already-extracted page texts (index 0 is page 1).
///
/// Fails with [`ExtractError::NoText`] when no page has any text left after
/// normalization.
pub fn prepare_text(
    name: &str,
    fingerprint: String,
    raw_pages: Vec<String>,
    config: &Config,
) -> Result<PreparedDocument> {
    let pages: Vec<Page> = raw_pages
        .iter()
        .enumerate()
        .map(|(i, text)| Page {
            number: i + 1,
            text: normalize_page(text),
        })
        .collect();

    let chunks = chunk_pages(&fingerprint, &pages, &splitter(config));
    if chunks.is_empty() {
        return Err(ExtractError::NoText.into());
    }

    tracing::info!(
        document = name,
        pages = pages.len(),
        chunks = chunks.len(),
        "document chunked"
    );

    Ok(PreparedDocument {
        name: name.to_string(),
        fingerprint,
        pages,
        chunks,
    })
}

/// Embed every chunk in batches and load the vectors into a [`FlatIndex`].
pub async fn build_index(
    document: &PreparedDocument,
    embedder: &dyn Embedder,
    batch_size: usize,
    progress: &dyn IngestProgressReporter,
) -> Result<FlatIndex> {
    let total = document.chunks.len() as u64;
    let mut index = FlatIndex::new();
    let mut done = 0u64;

    for batch in document.chunks.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder
            .embed(&texts)
            .await
            .with_context(|| format!("Failed to embed chunks of {}", document.name))?;
        index.add(batch.to_vec(), vectors)?;

        done += batch.len() as u64;
        progress.report(IngestProgressEvent::Embedding {
            document: document.name.clone(),
            n: done,
            total,
        });
    }

    Ok(index)
}

/// Run the full pipeline on an uploaded PDF.
pub async fn ingest_pdf(
    name: &str,
    bytes: &[u8],
    config: &Config,
    embedder: &dyn Embedder,
    progress: &dyn IngestProgressReporter,
) -> Result<IngestedDocument> {
    progress.report(IngestProgressEvent::Extracting {
        document: name.to_string(),
    });

    // Extraction is CPU bound and can take seconds on large files.
    let owned = bytes.to_vec();
    let doc_name = name.to_string();
    let cfg = config.clone();
    let prepared = tokio::task::spawn_blocking(move || prepare_pdf(&doc_name, &owned, &cfg))
        .await
        .context("PDF extraction task failed")??;

    ingest_prepared(prepared, config, embedder, progress).await
}

/// Embed and index a document that has already been extracted.
pub async fn ingest_prepared(
    prepared: PreparedDocument,
    config: &Config,
    embedder: &dyn Embedder,
    progress: &dyn IngestProgressReporter,
) -> Result<IngestedDocument> {
    progress.report(IngestProgressEvent::Chunked {
        document: prepared.name.clone(),
        pages: prepared.pages.len() as u64,
        chunks: prepared.chunks.len() as u64,
    });

    let index = build_index(&prepared, embedder, config.embedding.batch_size, progress).await?;

    progress.report(IngestProgressEvent::Ready {
        document: prepared.name.clone(),
        chunks: index.len() as u64,
    });
    tracing::info!(
        document = %prepared.name,
        fingerprint = %prepared.fingerprint,
        chunks = index.len(),
        "document indexed"
    );

    Ok(IngestedDocument {
        name: prepared.name,
        fingerprint: prepared.fingerprint,
        pages: prepared.pages,
        chunks: prepared.chunks,
        index: Arc::new(index),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct CountingEmbedder {
        calls: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        fn model_name(&self) -> &str {
            "counting"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.lock().unwrap().push(texts.len());
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
    }

    struct Collect(Mutex<Vec<IngestProgressEvent>>);

    impl IngestProgressReporter for Collect {
        fn report(&self, event: IngestProgressEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    fn small_config() -> Config {
        let mut config = Config::default();
        config.chunking.chunk_size = 30;
        config.embedding.batch_size = 2;
        config
    }

    #[test]
    fn fingerprint_is_sha256_hex() {
        assert_eq!(
            fingerprint(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn prepare_text_normalizes_and_numbers_pages() {
        let doc = prepare_text(
            "doc.pdf",
            "fp".to_string(),
            vec![
                "The mem-\nbers agreed.".to_string(),
                "  ".to_string(),
                "Second\nline here.".to_string(),
            ],
            &small_config(),
        )
        .unwrap();
        assert_eq!(doc.pages[0].text, "The members agreed.");
        assert_eq!(doc.pages[2].number, 3);
        let sources: Vec<&str> = doc.chunks.iter().map(|c| c.source.as_str()).collect();
        assert_eq!(sources, vec!["1-0", "3-0"]);
    }

    #[test]
    fn blank_document_is_no_text_error() {
        let err = prepare_text("blank.pdf", "fp".to_string(), vec![" \n ".to_string()], &small_config())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExtractError>(),
            Some(ExtractError::NoText)
        ));
    }

    #[tokio::test]
    async fn embeds_in_batches_and_reports_progress() {
        let doc = prepare_text(
            "doc.pdf",
            "fp".to_string(),
            vec!["one.".into(), "two.".into(), "three.".into()],
            &small_config(),
        )
        .unwrap();
        let embedder = CountingEmbedder {
            calls: Mutex::new(Vec::new()),
        };
        let progress = Collect(Mutex::new(Vec::new()));

        let ingested = ingest_prepared(doc, &small_config(), &embedder, &progress)
            .await
            .unwrap();
        assert_eq!(ingested.index.len(), 3);
        assert_eq!(*embedder.calls.lock().unwrap(), vec![2, 1]);

        let events = progress.0.lock().unwrap();
        assert!(matches!(events.first(), Some(IngestProgressEvent::Chunked { chunks: 3, .. })));
        assert!(events.contains(&IngestProgressEvent::Embedding {
            document: "doc.pdf".to_string(),
            n: 2,
            total: 3
        }));
        assert!(matches!(events.last(), Some(IngestProgressEvent::Ready { chunks: 3, .. })));
    }

    #[tokio::test]
    async fn non_pdf_upload_fails_before_embedding() {
        let embedder = CountingEmbedder {
            calls: Mutex::new(Vec::new()),
        };
        let err = ingest_pdf("x.pdf", b"hello", &small_config(), &embedder, &NoProgress)
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<ExtractError>(),
            Some(ExtractError::NotPdf)
        ));
        assert!(embedder.calls.lock().unwrap().is_empty());
    }
}
