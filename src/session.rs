//! Chat sessions over one ingested document.
//!
//! A [`ChatSession`] ties an [`IngestedDocument`] to an agent and a
//! conversation buffer. The [`SessionStore`] holds the sessions served over
//! HTTP and shares ingested documents between sessions created from the same
//! PDF bytes, so a re-upload is not re-embedded.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use libran_core::embedding::Embedder;
use libran_core::llm::ChatModel;
use libran_core::memory::ConversationBuffer;
use libran_core::models::{Chunk, Page};

use crate::agent::{AgentError, AgentExecutor};
use crate::config::Config;
use crate::embedding::create_embedder;
use crate::ingest::IngestedDocument;
use crate::llm::create_chat_model;
use crate::qa::RetrievalQa;

/// The embedding and chat providers a session talks to.
#[derive(Clone)]
pub struct Providers {
    pub embedder: Arc<dyn Embedder>,
    pub chat: Arc<dyn ChatModel>,
}

impl Providers {
    /// Build providers from config. `api_key` overrides `OPENAI_API_KEY`.
    pub fn from_config(config: &Config, api_key: Option<&str>) -> Result<Self> {
        Ok(Self {
            embedder: create_embedder(&config.embedding, api_key)?,
            chat: create_chat_model(&config.llm, api_key)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: Uuid,
    pub name: String,
    pub fingerprint: String,
    pub pages: usize,
    pub chunks: usize,
    pub turns: usize,
}

/// One page and the chunks cut from it.
#[derive(Debug, Serialize)]
pub struct PageView<'a> {
    pub page: &'a Page,
    pub chunks: Vec<&'a Chunk>,
}

pub struct ChatSession {
    id: Uuid,
    document: Arc<IngestedDocument>,
    agent: AgentExecutor,
    memory: ConversationBuffer,
}

impl ChatSession {
    pub fn new(document: Arc<IngestedDocument>, providers: &Providers, config: &Config) -> Self {
        let qa = RetrievalQa::new(
            providers.embedder.clone(),
            providers.chat.clone(),
            document.index.clone(),
            config.retrieval.top_k,
        );
        let agent = AgentExecutor::new(
            providers.chat.clone(),
            Arc::new(qa),
            config.agent.max_iterations,
        );
        Self {
            id: Uuid::new_v4(),
            document,
            agent,
            memory: ConversationBuffer::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn document(&self) -> &Arc<IngestedDocument> {
        &self.document
    }

    /// Answer `query` and record the turn.
    pub async fn ask(&mut self, query: &str) -> Result<String, AgentError> {
        let answer = self.agent.run(query, &self.memory).await?;
        self.memory.save(query, answer.clone());
        Ok(answer)
    }

    /// Page `number` (1-based) with its chunks.
    pub fn page(&self, number: usize) -> Option<PageView<'_>> {
        let page = self.document.pages.iter().find(|p| p.number == number)?;
        let index = self.document.index.as_ref();
        let chunks = (0..).map_while(|i| index.chunk(number, i)).collect();
        Some(PageView { page, chunks })
    }

    pub fn memory(&self) -> &ConversationBuffer {
        &self.memory
    }

    pub fn clear_memory(&mut self) {
        self.memory.clear();
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            name: self.document.name.clone(),
            fingerprint: self.document.fingerprint.clone(),
            pages: self.document.pages.len(),
            chunks: self.document.chunks.len(),
            turns: self.memory.len(),
        }
    }
}

struct StoredSession {
    document: Arc<IngestedDocument>,
    session: Arc<Mutex<ChatSession>>,
}

/// In-memory session registry for the HTTP API.
///
/// Each session sits behind its own mutex so questions on one session are
/// answered in order while other sessions proceed.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, StoredSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: ChatSession) -> Uuid {
        let id = session.id();
        let stored = StoredSession {
            document: session.document().clone(),
            session: Arc::new(Mutex::new(session)),
        };
        self.sessions.write().await.insert(id, stored);
        id
    }

    pub async fn get(&self, id: &Uuid) -> Option<Arc<Mutex<ChatSession>>> {
        self.sessions
            .read()
            .await
            .get(id)
            .map(|s| s.session.clone())
    }

    pub async fn remove(&self, id: &Uuid) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// An already-ingested document with this fingerprint, if any session
    /// holds one.
    pub async fn find_document(&self, fingerprint: &str) -> Option<Arc<IngestedDocument>> {
        self.sessions
            .read()
            .await
            .values()
            .find(|s| s.document.fingerprint == fingerprint)
            .map(|s| s.document.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{ingest_prepared, prepare_text};
    use crate::progress::NoProgress;
    use async_trait::async_trait;
    use libran_core::llm::ChatMessage;

    struct OneEmbedder;

    #[async_trait]
    impl Embedder for OneEmbedder {
        fn model_name(&self) -> &str {
            "one"
        }
        fn dims(&self) -> usize {
            1
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0]).collect())
        }
    }

    struct EchoChat;

    #[async_trait]
    impl ChatModel for EchoChat {
        fn model_name(&self) -> &str {
            "echo"
        }
        async fn complete(&self, messages: &[ChatMessage], _stop: &[&str]) -> Result<String> {
            let prompt = &messages[0].content;
            let question = prompt
                .rsplit("Question: ")
                .next()
                .unwrap_or_default()
                .lines()
                .next()
                .unwrap_or_default();
            Ok(format!("Final Answer: you asked {}", question))
        }
    }

    async fn session() -> ChatSession {
        let config = Config::default();
        let prepared = prepare_text(
            "doc.pdf",
            "fp-1".to_string(),
            vec!["Page one text.".to_string(), "Page two text.".to_string()],
            &config,
        )
        .unwrap();
        let doc = ingest_prepared(prepared, &config, &OneEmbedder, &NoProgress)
            .await
            .unwrap();
        let providers = Providers {
            embedder: Arc::new(OneEmbedder),
            chat: Arc::new(EchoChat),
        };
        ChatSession::new(Arc::new(doc), &providers, &config)
    }

    #[tokio::test]
    async fn ask_records_turns() {
        let mut session = session().await;
        let answer = session.ask("what is on page two?").await.unwrap();
        assert_eq!(answer, "you asked what is on page two?");
        assert_eq!(session.memory().len(), 1);
        assert_eq!(session.info().turns, 1);
        session.clear_memory();
        assert!(session.memory().is_empty());
    }

    #[tokio::test]
    async fn page_lookup_is_one_based() {
        let session = session().await;
        let view = session.page(2).unwrap();
        assert_eq!(view.page.text, "Page two text.");
        assert_eq!(view.chunks.len(), 1);
        assert_eq!(view.chunks[0].source, "2-0");
        assert!(session.page(0).is_none());
        assert!(session.page(3).is_none());
    }

    #[tokio::test]
    async fn store_finds_document_by_fingerprint() {
        let store = SessionStore::new();
        let id = store.insert(session().await).await;
        assert_eq!(store.len().await, 1);
        assert!(store.find_document("fp-1").await.is_some());
        assert!(store.find_document("other").await.is_none());
        assert!(store.remove(&id).await);
        assert!(store.is_empty().await);
        assert!(store.get(&id).await.is_none());
    }
}
