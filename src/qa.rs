//! Retrieval-augmented question answering over one document.
//!
//! [`RetrievalQa`] is a map/reduce chain: the question is embedded, the
//! closest chunks are pulled from the index, each chunk is condensed to the
//! text relevant to the question (map, run concurrently), and the condensed
//! parts are combined into a single answer (reduce).

use anyhow::{Context, Result};
use futures::future::try_join_all;
use serde::Serialize;
use std::sync::Arc;

use libran_core::embedding::Embedder;
use libran_core::index::VectorIndex;
use libran_core::llm::{ChatMessage, ChatModel};
use libran_core::prompt::{map_prompt, reduce_prompt};

/// Returned without calling the model when there is nothing to search.
pub const NO_ANSWER: &str = "I don't know.";

#[derive(Debug, Clone, Serialize)]
pub struct QaAnswer {
    pub answer: String,
    /// `source` tags (`"{page}-{chunk}"`) of the retrieved chunks, best first.
    pub sources: Vec<String>,
}

pub struct RetrievalQa {
    embedder: Arc<dyn Embedder>,
    chat: Arc<dyn ChatModel>,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
}

impl RetrievalQa {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        chat: Arc<dyn ChatModel>,
        index: Arc<dyn VectorIndex>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            chat,
            index,
            top_k: top_k.max(1),
        }
    }

    pub async fn run(&self, question: &str) -> Result<QaAnswer> {
        if self.index.is_empty() {
            return Ok(QaAnswer {
                answer: NO_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let query = self
            .embedder
            .embed_one(question)
            .await
            .context("Failed to embed question")?;
        let hits = self.index.search(&query, self.top_k);
        tracing::debug!(hits = hits.len(), "retrieved chunks");

        let summaries = try_join_all(hits.iter().map(|hit| {
            let prompt = map_prompt(&hit.chunk.text, question);
            async move { self.chat.complete(&[ChatMessage::user(prompt)], &[]).await }
        }))
        .await
        .context("Map step failed")?;

        let combined = summaries
            .iter()
            .map(|s| s.trim())
            .collect::<Vec<_>>()
            .join("\n\n");
        let answer = self
            .chat
            .complete(&[ChatMessage::user(reduce_prompt(&combined, question))], &[])
            .await
            .context("Reduce step failed")?;

        Ok(QaAnswer {
            answer: answer.trim().to_string(),
            sources: hits.into_iter().map(|h| h.chunk.source).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use libran_core::index::FlatIndex;
    use libran_core::models::Chunk;
    use std::sync::Mutex;

    struct AxisEmbedder;

    #[async_trait]
    impl Embedder for AxisEmbedder {
        fn model_name(&self) -> &str {
            "axis"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    if t.contains("budget") {
                        vec![1.0, 0.0]
                    } else {
                        vec![0.0, 1.0]
                    }
                })
                .collect())
        }
    }

    #[derive(Default)]
    struct RecordingChat {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatModel for RecordingChat {
        fn model_name(&self) -> &str {
            "recording"
        }
        async fn complete(&self, messages: &[ChatMessage], _stop: &[&str]) -> Result<String> {
            let prompt = messages[0].content.clone();
            self.prompts.lock().unwrap().push(prompt.clone());
            if prompt.contains("FINAL ANSWER:") {
                Ok(" The budget is 3 billion. ".to_string())
            } else {
                Ok("relevant part".to_string())
            }
        }
    }

    fn chunk(source: &str, text: &str) -> Chunk {
        Chunk {
            id: source.to_string(),
            document_id: "doc".to_string(),
            page: 1,
            chunk_index: 0,
            source: source.to_string(),
            text: text.to_string(),
            hash: String::new(),
        }
    }

    #[tokio::test]
    async fn maps_each_hit_then_reduces() {
        let mut index = FlatIndex::new();
        index
            .add(
                vec![
                    chunk("1-0", "The budget was tabled."),
                    chunk("2-0", "Members rose."),
                ],
                vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            )
            .unwrap();
        let chat = Arc::new(RecordingChat::default());
        let qa = RetrievalQa::new(Arc::new(AxisEmbedder), chat.clone(), Arc::new(index), 1);

        let answer = qa.run("What was the budget?").await.unwrap();
        assert_eq!(answer.answer, "The budget is 3 billion.");
        assert_eq!(answer.sources, vec!["1-0"]);

        let prompts = chat.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("The budget was tabled."));
        assert!(prompts[1].contains("relevant part"));
    }

    #[tokio::test]
    async fn empty_index_does_not_call_model() {
        let chat = Arc::new(RecordingChat::default());
        let qa = RetrievalQa::new(
            Arc::new(AxisEmbedder),
            chat.clone(),
            Arc::new(FlatIndex::new()),
            4,
        );
        let answer = qa.run("anything?").await.unwrap();
        assert_eq!(answer.answer, NO_ANSWER);
        assert!(chat.prompts.lock().unwrap().is_empty());
    }
}
