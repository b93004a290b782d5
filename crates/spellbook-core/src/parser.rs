//! Comprehensive-rules text parser.
//!
//! A sequential regex scan over the plain-text rulebook, not a grammar:
//!
//! 1. Skip everything before the `1. Game Concepts` anchor.
//! 2. Collect chapter headers (`1. Game Concepts` followed by a `100.` line)
//!    and section headers (`100. General` followed by a `100.1` line).
//! 3. Split the text at every rule number followed by a space (`100.1. `,
//!    `100.1a `) and turn each chunk into a [`RuleRecord`]. A chunk runs to the
//!    next rule number or the end of the text, so a header that follows a
//!    rule stays in that rule's body.
//!
//! # Known limitations
//!
//! A rule whose chapter or section number has no header in the maps inherits
//! the titles of the previously emitted rule. This only tags rules correctly
//! when the document is laid out linearly, headers before their rules.
//!
//! Rule boundaries are found anywhere in the text, not only at line starts.
//! A cross-reference such as "see rule 702.19b for" therefore ends the
//! current rule and starts a spurious `702.19b` entry.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::rule::RuleRecord;

/// First line of substantive content.
pub const ANCHOR: &str = "1. Game Concepts";

/// Bodies this short (after trimming) are page furniture, not rules.
const MIN_BODY_CHARS: usize = 10;

const MAX_KEYWORDS: usize = 10;

static CHAPTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(\d{1,2})\.[ \t]+([A-Z][^\n.]*?)[ \t]*\n\s*\d{3}\.").unwrap()
});

static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(\d{3})\.[ \t]+([A-Z][^\n]*?)[ \t]*\n\s*\d{3}\.\d+").unwrap()
});

static RULE_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{3})\.(\d+[a-z]?)\.?[ \t]+").unwrap());

static EXAMPLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Example:\s+(.+?\.)(?:\s|\z)").unwrap());

static KEYWORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][a-z]+(?: [A-Z][a-z]+)+\b").unwrap());

/// Parse raw rulebook text into rule records, in document order.
///
/// Returns an empty vector (and logs a warning) when the anchor is missing.
pub fn parse_rules(raw: &str) -> Vec<RuleRecord> {
    let text = raw.replace("\r\n", "\n").replace('\r', "\n");

    let Some(start) = text.find(ANCHOR) else {
        warn!(anchor = ANCHOR, "rulebook anchor not found, no rules parsed");
        return Vec::new();
    };
    let body = &text[start..];

    let chapters = chapter_titles(body);
    let sections = section_titles(body);
    debug!(
        chapters = chapters.len(),
        sections = sections.len(),
        "collected rulebook headers"
    );

    let starts: Vec<_> = RULE_START_RE.captures_iter(body).collect();

    let mut rules = Vec::with_capacity(starts.len());
    let mut last_chapter = String::new();
    let mut last_section = String::new();
    let mut skipped = 0usize;

    for (i, caps) in starts.iter().enumerate() {
        let Some(whole) = caps.get(0) else { continue };
        let end = starts
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(body.len(), |m| m.start());
        let chunk = body[whole.end()..end].trim();
        if chunk.chars().count() <= MIN_BODY_CHARS {
            skipped += 1;
            continue;
        }

        let prefix = &caps[1];
        let subsection = caps[2].to_string();
        let rule_number = format!("{prefix}.{subsection}");

        // `prefix` is always three ASCII digits.
        let chapter_no = prefix.parse::<u32>().unwrap_or(0) / 100;
        if let Some(title) = chapters.get(&chapter_no.to_string()) {
            last_chapter.clone_from(title);
        }
        if let Some(title) = sections.get(prefix) {
            last_section.clone_from(title);
        }

        let (text, examples) = split_examples(chunk);
        let keywords = extract_keywords(&text);

        rules.push(RuleRecord {
            rule_number,
            text,
            examples,
            keywords,
            chapter: last_chapter.clone(),
            section: last_section.clone(),
            subsection,
            related_rules: Vec::new(),
        });
    }

    info!(rules = rules.len(), skipped, "parsed rulebook");
    rules
}

fn chapter_titles(text: &str) -> HashMap<String, String> {
    CHAPTER_RE
        .captures_iter(text)
        .map(|c| (c[1].to_string(), c[2].trim().to_string()))
        .collect()
}

fn section_titles(text: &str) -> HashMap<String, String> {
    SECTION_RE
        .captures_iter(text)
        .map(|c| (c[1].to_string(), c[2].trim().to_string()))
        .collect()
}

/// Pull `Example: ….` sentences out of a rule body.
///
/// Returns the remaining text (whitespace collapsed) and the example sentences.
fn split_examples(body: &str) -> (String, Vec<String>) {
    let examples: Vec<String> = EXAMPLE_RE
        .captures_iter(body)
        .map(|c| collapse_whitespace(&c[1]))
        .collect();
    let stripped = EXAMPLE_RE.replace_all(body, " ");
    (collapse_whitespace(&stripped), examples)
}

/// Capitalized multi-word phrases, first occurrence wins, at most ten.
fn extract_keywords(text: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for m in KEYWORD_RE.find_iter(text) {
        if keywords.len() == MAX_KEYWORDS {
            break;
        }
        if !keywords.iter().any(|k| k == m.as_str()) {
            keywords.push(m.as_str().to_string());
        }
    }
    keywords
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
