//! Ingest progress reporting.
//!
//! Reports what happens while a PDF is turned into a searchable index
//! (extraction, chunking, embedding batches) so users of `libran ask` and
//! `libran chat` see where time goes on large documents. Progress is emitted
//! on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event for ingest.
#[derive(Clone, Debug, PartialEq)]
pub enum IngestProgressEvent {
    /// Text is being pulled out of the PDF.
    Extracting { document: String },
    /// Pages have been normalized and split.
    Chunked {
        document: String,
        pages: u64,
        chunks: u64,
    },
    /// `n` of `total` chunks have been embedded.
    Embedding {
        document: String,
        n: u64,
        total: u64,
    },
    /// The index is built and questions can be asked.
    Ready { document: String, chunks: u64 },
}

/// Reports ingest progress. Implementations write to stderr (human or JSON).
pub trait IngestProgressReporter: Send + Sync {
    fn report(&self, event: IngestProgressEvent);
}

/// Human-friendly progress on stderr: "ingest report.pdf  embedding  64 / 1,234 chunks".
pub struct StderrProgress;

impl IngestProgressReporter for StderrProgress {
    fn report(&self, event: IngestProgressEvent) {
        let line = match &event {
            IngestProgressEvent::Extracting { document } => {
                format!("ingest {}  extracting...\n", document)
            }
            IngestProgressEvent::Chunked {
                document,
                pages,
                chunks,
            } => format!(
                "ingest {}  {} pages, {} chunks\n",
                document,
                format_number(*pages),
                format_number(*chunks)
            ),
            IngestProgressEvent::Embedding { document, n, total } => format!(
                "ingest {}  embedding  {} / {} chunks\n",
                document,
                format_number(*n),
                format_number(*total)
            ),
            IngestProgressEvent::Ready { document, chunks } => format!(
                "ingest {}  ready ({} chunks)\n",
                document,
                format_number(*chunks)
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl IngestProgressReporter for JsonProgress {
    fn report(&self, event: IngestProgressEvent) {
        let obj = event_json(&event);
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

fn event_json(event: &IngestProgressEvent) -> serde_json::Value {
    match event {
        IngestProgressEvent::Extracting { document } => serde_json::json!({
            "event": "progress",
            "document": document,
            "phase": "extracting"
        }),
        IngestProgressEvent::Chunked {
            document,
            pages,
            chunks,
        } => serde_json::json!({
            "event": "progress",
            "document": document,
            "phase": "chunked",
            "pages": pages,
            "chunks": chunks
        }),
        IngestProgressEvent::Embedding { document, n, total } => serde_json::json!({
            "event": "progress",
            "document": document,
            "phase": "embedding",
            "n": n,
            "total": total
        }),
        IngestProgressEvent::Ready { document, chunks } => serde_json::json!({
            "event": "progress",
            "document": document,
            "phase": "ready",
            "chunks": chunks
        }),
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl IngestProgressReporter for NoProgress {
    fn report(&self, _event: IngestProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    /// Human output when stderr is a TTY, otherwise off.
    Auto,
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode. Caller can pass it to ingest.
    pub fn reporter(&self) -> Box<dyn IngestProgressReporter> {
        match self {
            ProgressMode::Auto => Self::default_for_tty().reporter(),
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(1), "1");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234), "1,234");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn embedding_event_json_shape() {
        let obj = event_json(&IngestProgressEvent::Embedding {
            document: "hansard.pdf".to_string(),
            n: 64,
            total: 130,
        });
        assert_eq!(obj["phase"], "embedding");
        assert_eq!(obj["n"], 64);
        assert_eq!(obj["total"], 130);
        assert_eq!(obj["document"], "hansard.pdf");
    }
}
