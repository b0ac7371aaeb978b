//! Bulk PDF download from a listing page.
//!
//! Fetches an HTML page, collects every link ending in `.pdf`, and saves each
//! file into a local directory under a cleaned-up name. Used to build a local
//! corpus (e.g. parliamentary Hansard reports) to chat with.

use anyhow::{Context, Result};
use regex::Regex;
use reqwest::Url;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::config::Config;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ScrapeSummary {
    pub found: usize,
    pub downloaded: usize,
    pub failed: usize,
}

fn escapes_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"%20-|%20|%2C|%28|%29").expect("valid escapes regex"))
}

fn year_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(-)\d{4}").expect("valid year regex"))
}

/// Clean a percent-encoded file name: encoded spaces, commas, and
/// parentheses become `_`, doubled underscores collapse, and four digits
/// directly after a `-` are dropped.
pub fn format_pdf_name(name: &str) -> String {
    let name = escapes_re().replace_all(name, "_");
    let name = name.replace("__", "_");
    year_suffix_re().replace_all(&name, "$1").into_owned()
}

/// Absolute URLs of all `.pdf` links on the page, first occurrence order.
pub fn pdf_links(html: &str, base: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let selector = match Selector::parse("a[href$='.pdf']") {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        match base.join(href) {
            Ok(url) => {
                if seen.insert(url.clone()) {
                    links.push(url);
                }
            }
            Err(e) => tracing::warn!(href, error = %e, "skipping unresolvable link"),
        }
    }
    links
}

/// Local file name for a PDF URL: its last path segment, cleaned up.
pub fn file_name_for(url: &Url) -> Option<String> {
    let last = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    Some(format_pdf_name(last))
}

async fn download(client: &reqwest::Client, url: &Url, dest: &Path) -> Result<()> {
    let bytes = client
        .get(url.clone())
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    tokio::fs::write(dest, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", dest.display()))?;
    Ok(())
}

/// Download every PDF linked from `url` into `out_dir`.
///
/// A failed download is logged and counted but does not stop the run.
pub async fn scrape(
    url: &str,
    out_dir: &Path,
    limit: Option<usize>,
    timeout_secs: u64,
) -> Result<ScrapeSummary> {
    let base = Url::parse(url).with_context(|| format!("Invalid URL: {}", url))?;
    let client = crate::http::client(timeout_secs)?;

    let html = client
        .get(base.clone())
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .with_context(|| format!("Failed to fetch {}", url))?
        .text()
        .await?;

    let mut links = pdf_links(&html, &base);
    if let Some(limit) = limit {
        links.truncate(limit);
    }

    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let mut summary = ScrapeSummary {
        found: links.len(),
        ..Default::default()
    };

    for link in &links {
        let Some(name) = file_name_for(link) else {
            tracing::warn!(url = %link, "no file name in link");
            summary.failed += 1;
            continue;
        };
        let dest: PathBuf = out_dir.join(&name);
        match download(&client, link, &dest).await {
            Ok(()) => {
                tracing::info!(url = %link, file = %dest.display(), "downloaded");
                summary.downloaded += 1;
            }
            Err(e) => {
                tracing::warn!(url = %link, error = %e, "download failed");
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

/// CLI entry point for `libran scrape`.
pub async fn run_scrape(
    config: &Config,
    url: Option<String>,
    out: Option<PathBuf>,
    limit: Option<usize>,
) -> Result<()> {
    let url = url.unwrap_or_else(|| config.scrape.url.clone());
    let out_dir = out.unwrap_or_else(|| config.scrape.out_dir.clone());

    let summary = scrape(&url, &out_dir, limit, config.scrape.timeout_secs).await?;

    println!("scrape {}", url);
    println!("  links found: {}", summary.found);
    println!("  downloaded: {}", summary.downloaded);
    println!("  failed: {}", summary.failed);
    println!("  output: {}", out_dir.display());
    Ok(())
}
