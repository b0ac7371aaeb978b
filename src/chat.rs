//! `libran ask` and `libran chat`: question answering from the terminal.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::config::Config;
use crate::ingest::ingest_pdf;
use crate::pages::display_name;
use crate::progress::ProgressMode;
use crate::session::{ChatSession, Providers};

/// Ingest `path` and open a session on it.
pub async fn open_session(
    config: &Config,
    path: &Path,
    progress: ProgressMode,
) -> Result<ChatSession> {
    // Fail on a missing key before spending time on extraction.
    let providers = Providers::from_config(config, None)?;

    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = display_name(path);
    let reporter = progress.reporter();
    let document = ingest_pdf(
        &name,
        &bytes,
        config,
        providers.embedder.as_ref(),
        reporter.as_ref(),
    )
    .await
    .with_context(|| format!("Failed to ingest {}", name))?;

    Ok(ChatSession::new(Arc::new(document), &providers, config))
}

/// CLI entry point for `libran ask`.
pub async fn run_ask(
    config: &Config,
    path: &Path,
    question: &str,
    progress: ProgressMode,
) -> Result<()> {
    let question = question.trim();
    if question.is_empty() {
        anyhow::bail!("question must not be empty");
    }
    let mut session = open_session(config, path, progress).await?;
    let answer = session.ask(question).await?;
    println!("{}", answer);
    Ok(())
}

/// CLI entry point for `libran chat`.
pub async fn run_chat(config: &Config, path: &Path, progress: ProgressMode) -> Result<()> {
    let mut session = open_session(config, path, progress).await?;
    println!(
        "Chatting with {} ({} pages). Type :history, :clear, or :quit.",
        session.document().name,
        session.document().pages.len()
    );
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    chat_loop(&mut session, stdin, &mut stdout).await
}

/// Read questions line by line until `:quit` or end of input.
///
/// Agent failures are reported and the loop continues with the next line.
pub async fn chat_loop<R, W>(session: &mut ChatSession, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    loop {
        write!(out, "> ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };
        let line = line.trim();

        match line {
            "" => continue,
            ":quit" | ":q" => break,
            ":history" => {
                if session.memory().is_empty() {
                    writeln!(out, "(no history)")?;
                } else {
                    writeln!(out, "{}", session.memory().buffer())?;
                }
            }
            ":clear" => {
                session.clear_memory();
                writeln!(out, "(history cleared)")?;
            }
            question => match session.ask(question).await {
                Ok(answer) => writeln!(out, "{}", answer)?,
                Err(e) => {
                    tracing::warn!(error = %e, "question failed");
                    writeln!(out, "error: {}", e)?;
                }
            },
        }
    }
    Ok(())
}
