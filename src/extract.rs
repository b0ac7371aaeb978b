//! PDF text extraction.
//!
//! Returns the raw text of each page, in page order. Cleanup of line breaks
//! and hyphenation happens afterwards in [`libran_core::normalize`].

use thiserror::Error;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Extraction error. Extraction never panics; the caller reports the error
/// and the upload is rejected.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("not a PDF file (missing %PDF- header)")]
    NotPdf,
    #[error("PDF is {size} bytes, limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("no extractable text in PDF")]
    NoText,
}

/// Extract the text of every page.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    if !looks_like_pdf(bytes) {
        return Err(ExtractError::NotPdf);
    }
    // pdf-extract panics on some malformed inputs instead of returning an error.
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes)) {
        Ok(result) => result.map_err(|e| ExtractError::Pdf(e.to_string())),
        Err(_) => Err(ExtractError::Pdf("parser panicked".to_string())),
    }
}

/// Extract pages after enforcing a size limit.
pub fn extract_pages_bounded(bytes: &[u8], limit: usize) -> Result<Vec<String>, ExtractError> {
    if bytes.len() > limit {
        return Err(ExtractError::TooLarge {
            size: bytes.len(),
            limit,
        });
    }
    extract_pages(bytes)
}

fn looks_like_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_pdf_is_rejected_before_parsing() {
        let err = extract_pages(b"not a pdf").unwrap_err();
        assert!(matches!(err, ExtractError::NotPdf));
    }

    #[test]
    fn truncated_pdf_returns_error() {
        let err = extract_pages(b"%PDF-1.4\ngarbage").unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn oversized_input_is_rejected() {
        let err = extract_pages_bounded(&[0u8; 2000], 1000).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::TooLarge {
                size: 2000,
                limit: 1000
            }
        ));
    }

    #[test]
    fn header_must_come_first() {
        assert!(looks_like_pdf(b"%PDF-1.7 rest"));
        assert!(!looks_like_pdf(b"\r\n%PDF-1.7 rest"));
        assert!(!looks_like_pdf(b"%PD"));
        assert!(matches!(
            extract_pages(b"junk%PDF-1.4"),
            Err(ExtractError::NotPdf)
        ));
    }
}
