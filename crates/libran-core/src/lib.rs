//! # Libran Core
//!
//! Runtime-free logic for Libran-GPT: data models, page normalization,
//! recursive chunking, the flat similarity index, conversation memory,
//! provider traits, and the prompt templates and output parser used by the
//! conversational agent.
//!
//! This crate contains no tokio, HTTP client, or filesystem I/O. Concrete
//! embedding and chat providers live in the `libran-gpt` app crate and plug
//! in through [`embedding::Embedder`] and [`llm::ChatModel`].

pub mod chunk;
pub mod embedding;
pub mod index;
pub mod llm;
pub mod memory;
pub mod models;
pub mod normalize;
pub mod prompt;
