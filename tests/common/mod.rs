//! Fake providers shared by the integration tests.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use libran_gpt::config::Config;
use libran_gpt::ingest::{ingest_prepared, prepare_text, IngestedDocument};
use libran_gpt::libran_core::embedding::Embedder;
use libran_gpt::libran_core::llm::{ChatMessage, ChatModel};
use libran_gpt::progress::NoProgress;
use libran_gpt::session::Providers;

/// Bag-of-keywords embedder: one dimension per keyword, so chunks that
/// mention the same keywords as the question score highest.
pub struct KeywordEmbedder {
    pub keywords: Vec<&'static str>,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self {
            keywords: vec!["budget", "motion", "speaker", "water"],
        }
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn model_name(&self) -> &str {
        "keyword"
    }
    fn dims(&self) -> usize {
        self.keywords.len() + 1
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let lower = t.to_lowercase();
                let mut v: Vec<f32> = self
                    .keywords
                    .iter()
                    .map(|k| if lower.contains(k) { 1.0 } else { 0.0 })
                    .collect();
                v.push(0.1);
                v
            })
            .collect())
    }
}

/// Chat model that answers agent prompts from a script and QA prompts with
/// the first retrieved line. Records every prompt it sees.
pub struct ScriptedChat {
    replies: Mutex<VecDeque<String>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedChat {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|s| s.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn agent_prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.contains("Begin!"))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, messages: &[ChatMessage], stop: &[&str]) -> Result<String> {
        let prompt = messages[0].content.clone();
        self.prompts.lock().unwrap().push(prompt.clone());

        if stop.is_empty() {
            // Map step echoes the chunk; reduce step echoes the first part.
            let body = if let Some(rest) = prompt.split("=========\n").nth(1) {
                rest.lines().next().unwrap_or_default().to_string()
            } else {
                prompt
                    .split("\n\n")
                    .nth(1)
                    .unwrap_or_default()
                    .to_string()
            };
            return Ok(body);
        }

        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "Final Answer: out of script".to_string()))
    }
}

pub const PAGES: &[&str] = &[
    "The Speaker took the chair at 2.30 p.m.\n\nPrayers were said.",
    "The budget esti-\nmates for water were tabled. The water budget is 3 billion shillings.",
    "The motion on county roads was moved and seconded.",
];

pub async fn sample_document(config: &Config) -> IngestedDocument {
    let prepared = prepare_text(
        "hansard.pdf",
        "fingerprint-1".to_string(),
        PAGES.iter().map(|p| p.to_string()).collect(),
        config,
    )
    .unwrap();
    ingest_prepared(prepared, config, &KeywordEmbedder::new(), &NoProgress)
        .await
        .unwrap()
}

pub fn providers(chat: Arc<ScriptedChat>) -> Providers {
    Providers {
        embedder: Arc::new(KeywordEmbedder::new()),
        chat,
    }
}
