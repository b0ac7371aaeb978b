//! Whitespace and hyphenation cleanup for extracted page text.
//!
//! PDF text extraction preserves the physical line breaks of the page, which
//! splits words at hyphens and sentences at every line. [`normalize_page`]
//! reflows a page into paragraphs separated by exactly one blank line.

use regex::Regex;
use std::sync::OnceLock;

fn hyphen_break() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\w+)-\n(\w+)").expect("valid hyphen regex"))
}

fn paragraph_break() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").expect("valid paragraph regex"))
}

/// Normalize the raw text of one page.
///
/// 1. `exam-\nple` becomes `example`.
/// 2. Leading and trailing whitespace is trimmed.
/// 3. Runs of blank lines collapse to a single `\n\n` paragraph break.
/// 4. Remaining single newlines inside a paragraph become spaces.
pub fn normalize_page(text: &str) -> String {
    let merged = hyphen_break().replace_all(text, "${1}${2}");
    paragraph_break()
        .split(merged.trim())
        .map(|para| para.trim().replace('\n', " "))
        .filter(|para| !para.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
