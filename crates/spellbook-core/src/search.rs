//! Heuristic ranking of rule records against a free-text query.
//!
//! Explicit rule numbers in the query win outright; otherwise rules are scored
//! by term overlap with their keywords, headings, and body text.

use std::cmp::Reverse;
use std::sync::LazyLock;

use regex::Regex;

use crate::rule::RuleRecord;
use crate::rule_number::rule_sort_key;

static RULE_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{3}\.\d+[a-z]?\b").unwrap());

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "can", "does", "what", "when", "how",
    "with", "this", "that", "from", "have", "has", "its", "into", "who", "why", "will", "would",
    "there", "their", "they", "then", "than", "which", "while", "about", "card", "cards", "rule",
    "rules",
];

const EXACT_MATCH: u32 = 100;
const PARENT_MATCH: u32 = 50;
const KEYWORD_HIT: u32 = 3;
const HEADING_HIT: u32 = 2;
const TEXT_HIT: u32 = 1;

/// Rule numbers mentioned verbatim in `query`, in order of appearance.
pub fn mentioned_rule_numbers(query: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for m in RULE_REF_RE.find_iter(query) {
        if !found.iter().any(|f| f == m.as_str()) {
            found.push(m.as_str().to_string());
        }
    }
    found
}

/// Lowercased search terms: alphanumeric words of three or more characters,
/// minus stopwords.
pub fn query_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for word in query
        .split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() >= 3 && !STOPWORDS.contains(&w.as_str()))
    {
        if !terms.contains(&word) {
            terms.push(word);
        }
    }
    terms
}

/// Rank `rules` against `query` and return the best `limit` matches.
///
/// Rules scoring zero are never returned. Ties keep document order.
pub fn rank_rules<'a>(rules: &'a [RuleRecord], query: &str, limit: usize) -> Vec<&'a RuleRecord> {
    let refs = mentioned_rule_numbers(query);
    let terms = query_terms(query);

    let mut scored: Vec<(u32, String, &RuleRecord)> = rules
        .iter()
        .filter_map(|rule| {
            let score = score_rule(rule, &refs, &terms);
            (score > 0).then(|| (score, rule_sort_key(&rule.rule_number), rule))
        })
        .collect();

    scored.sort_by(|a, b| (Reverse(a.0), &a.1).cmp(&(Reverse(b.0), &b.1)));
    scored.into_iter().take(limit).map(|(_, _, r)| r).collect()
}

fn score_rule(rule: &RuleRecord, refs: &[String], terms: &[String]) -> u32 {
    let mut score = 0;

    for r in refs {
        if rule.rule_number == *r {
            score += EXACT_MATCH;
        } else if rule.rule_number.starts_with(r.as_str())
            && !rule.rule_number[r.len()..].starts_with(|c: char| c.is_ascii_digit())
        {
            score += PARENT_MATCH;
        }
    }

    if terms.is_empty() {
        return score;
    }

    let text = rule.text.to_lowercase();
    let headings = format!("{} {}", rule.chapter, rule.section).to_lowercase();
    let keywords: Vec<String> = rule.keywords.iter().map(|k| k.to_lowercase()).collect();

    for term in terms {
        if keywords.iter().any(|k| k.contains(term.as_str())) {
            score += KEYWORD_HIT;
        }
        if headings.contains(term.as_str()) {
            score += HEADING_HIT;
        }
        if text.contains(term.as_str()) {
            score += TEXT_HIT;
        }
    }
    score
}
