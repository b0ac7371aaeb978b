//! Local inspection of how a PDF is extracted and chunked.
//!
//! Runs extraction, normalization, and chunking only, so it works without
//! any provider configured. Used by the `libran pages` CLI command.

use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::config::Config;
use crate::ingest::{prepare_pdf, PreparedDocument};

/// Read `path` and run the local part of the ingest pipeline.
pub fn load_document(path: &Path, config: &Config) -> Result<PreparedDocument> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let name = display_name(path);
    prepare_pdf(&name, &bytes, config).with_context(|| format!("Failed to ingest {}", name))
}

/// File name used as the document name in output and logs.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// CLI entry point for `libran pages`.
pub fn run_pages(config: &Config, path: &Path, page: Option<usize>) -> Result<()> {
    let doc = load_document(path, config)?;

    match page {
        None => print_summary(&doc),
        Some(number) => {
            let Some(page) = doc.pages.iter().find(|p| p.number == number) else {
                bail!(
                    "page {} out of range (document has {} pages)",
                    number,
                    doc.pages.len()
                );
            };
            println!("--- Page {} ---", page.number);
            println!("{}", page.text);
            println!();

            let chunks: Vec<_> = doc.chunks.iter().filter(|c| c.page == number).collect();
            println!("--- Chunks ({}) ---", chunks.len());
            for chunk in chunks {
                println!("[chunk {}] {} chars", chunk.source, chunk.text.chars().count());
                println!("{}", chunk.text);
                println!();
            }
        }
    }
    Ok(())
}

fn print_summary(doc: &PreparedDocument) {
    println!("{}", doc.name);
    println!("  fingerprint: {}", doc.fingerprint);
    println!("  pages: {}", doc.pages.len());
    println!("  chunks: {}", doc.chunks.len());
    for page in &doc.pages {
        let chunks = doc.chunks.iter().filter(|c| c.page == page.number).count();
        println!(
            "  page {:>4}  {:>6} chars  {:>3} chunks",
            page.number,
            page.text.chars().count(),
            chunks
        );
    }
}
