//! End-to-end pipeline tests through the library API with fake providers.

mod common;

use std::sync::Arc;

use common::{providers, sample_document, KeywordEmbedder, ScriptedChat};
use libran_gpt::agent::STOPPED_MESSAGE;
use libran_gpt::config::Config;
use libran_gpt::qa::RetrievalQa;
use libran_gpt::session::ChatSession;

#[tokio::test]
async fn retrieval_ranks_matching_page_first() {
    let config = Config::default();
    let doc = sample_document(&config).await;
    assert_eq!(doc.pages.len(), 3);
    assert_eq!(
        doc.pages[1].text,
        "The budget estimates for water were tabled. The water budget is 3 billion shillings."
    );

    let chat = Arc::new(ScriptedChat::new(&[]));
    let qa = RetrievalQa::new(
        Arc::new(KeywordEmbedder::new()),
        chat.clone(),
        doc.index.clone(),
        2,
    );
    let answer = qa.run("What is the water budget?").await.unwrap();

    assert_eq!(answer.sources[0], "2-0");
    assert_eq!(answer.sources.len(), 2);
    assert!(answer.answer.starts_with("The budget estimates for water"));
    // Two map calls and one reduce call.
    assert_eq!(chat.prompts.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn follow_up_questions_see_earlier_turns() {
    let config = Config::default();
    let doc = Arc::new(sample_document(&config).await);
    let chat = Arc::new(ScriptedChat::new(&[
        "Thought: I should check the document\nAction: Document QA System\nAction Input: What is the water budget?",
        "Thought: I now know the final answer\nFinal Answer: The water budget is 3 billion shillings.",
        "Thought: I remember this\nFinal Answer: It was tabled with the estimates.",
    ]));
    let mut session = ChatSession::new(doc, &providers(chat.clone()), &config);

    let first = session.ask("How much is the water budget?").await.unwrap();
    assert_eq!(first, "The water budget is 3 billion shillings.");

    let second = session.ask("When was it tabled?").await.unwrap();
    assert_eq!(second, "It was tabled with the estimates.");

    let prompts = chat.agent_prompts();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[1].contains("Observation: The budget estimates for water were tabled."));
    assert!(prompts[2].contains(
        "Human: How much is the water budget?\nAI: The water budget is 3 billion shillings.\nQuestion: When was it tabled?"
    ));

    assert_eq!(
        session.memory().buffer(),
        "Human: How much is the water budget?\nAI: The water budget is 3 billion shillings.\n\
Human: When was it tabled?\nAI: It was tabled with the estimates."
    );
}

#[tokio::test]
async fn looping_agent_stops_at_limit() {
    let mut config = Config::default();
    config.agent.max_iterations = 2;
    let doc = Arc::new(sample_document(&config).await);
    let chat = Arc::new(ScriptedChat::new(&[
        "Action: Document QA System\nAction Input: budget",
        "Action: Document QA System\nAction Input: budget again",
    ]));
    let mut session = ChatSession::new(doc, &providers(chat.clone()), &config);

    let answer = session.ask("Loop forever").await.unwrap();
    assert_eq!(answer, STOPPED_MESSAGE);
    assert_eq!(chat.agent_prompts().len(), 2);
    assert_eq!(session.memory().len(), 1);
}

#[tokio::test]
async fn small_chunks_keep_provenance() {
    let mut config = Config::default();
    config.chunking.chunk_size = 40;
    let doc = sample_document(&config).await;
    assert!(doc.chunks.len() > 3);
    assert!(doc.chunks.iter().all(|c| c.text.chars().count() <= 40));
    let page_two: Vec<&str> = doc
        .chunks
        .iter()
        .filter(|c| c.page == 2)
        .map(|c| c.source.as_str())
        .collect();
    assert_eq!(page_two[0], "2-0");
    assert_eq!(page_two[1], "2-1");
}
