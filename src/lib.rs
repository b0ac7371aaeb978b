//! # Libran-GPT
//!
//! Chat with your PDF: ask natural-language questions about a document and
//! get answers grounded in its text, with follow-up questions resolved
//! against the conversation so far.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────────┐   ┌───────────┐
//! │   PDF    │──▶│ Extract+Normalize│──▶│   Chunk   │
//! │  bytes   │   │     (pages)      │   │ (splitter)│
//! └──────────┘   └──────────────────┘   └─────┬─────┘
//!                                             ▼
//! ┌──────────┐   ┌──────────────────┐   ┌───────────┐
//! │  Agent   │──▶│  Retrieval QA    │──▶│ FlatIndex │
//! │ + memory │   │  (map / reduce)  │   │ (cosine)  │
//! └────┬─────┘   └──────────────────┘   └───────────┘
//!      │
//!      ├───────────────────┐
//!      ▼                   ▼
//! ┌──────────┐       ┌──────────┐
//! │   CLI    │       │   HTTP   │
//! │ (libran) │       │  (axum)  │
//! └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export OPENAI_API_KEY=sk-...
//! libran pages ./data/hansard.pdf           # inspect extraction and chunks
//! libran ask ./data/hansard.pdf "Who moved the motion?"
//! libran chat ./data/hansard.pdf            # interactive, with memory
//! libran scrape --limit 5                   # download Hansard PDFs
//! libran serve                              # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`extract`] | PDF text extraction |
//! | [`ingest`] | Extract → normalize → chunk → embed → index |
//! | [`embedding`] | Embedding providers (OpenAI, Ollama) |
//! | [`llm`] | Chat completion provider (OpenAI) |
//! | [`qa`] | Retrieval-augmented map/reduce answers |
//! | [`agent`] | Conversational agent with the QA tool |
//! | [`session`] | Per-document chat sessions and the session store |
//! | [`server`] | HTTP API |
//! | [`scrape`] | Bulk PDF download from a listing page |
//!
//! Text processing, the index, memory, and prompt handling live in the
//! [`libran_core`] crate.

pub mod agent;
pub mod chat;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod http;
pub mod ingest;
pub mod llm;
pub mod pages;
pub mod progress;
pub mod qa;
pub mod scrape;
pub mod server;
pub mod session;

pub use libran_core;
