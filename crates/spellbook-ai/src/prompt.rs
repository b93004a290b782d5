//! Prompt templates for the rules assistant.

use spellbook_core::RuleRecord;

pub const SYSTEM_PROMPT: &str = "\
You are a rules advisor for the Magic: The Gathering trading card game.

Answer questions about game rules and card interactions accurately and concisely. \
Base your answer on the comprehensive rules excerpts provided below when they are relevant, \
and cite rule numbers (e.g. 702.19b) where you rely on them.

If the excerpts do not cover the question, say so and answer from general rules knowledge, \
making clear which parts are not backed by a quoted rule. Do not invent rule numbers.";

/// Long rule bodies are cut to keep the prompt small.
const MAX_RULE_CHARS: usize = 600;

/// System prompt with the selected rules appended as reference material.
pub fn build_system_prompt(rules: &[RuleRecord]) -> String {
    if rules.is_empty() {
        return SYSTEM_PROMPT.to_string();
    }
    let mut out = String::with_capacity(SYSTEM_PROMPT.len() + rules.len() * 256);
    out.push_str(SYSTEM_PROMPT);
    out.push_str("\n\nRelevant comprehensive rules:\n");
    for rule in rules {
        out.push('\n');
        out.push_str(&format_rule(rule));
    }
    out
}

/// One rule as a compact reference block.
pub fn format_rule(rule: &RuleRecord) -> String {
    let mut out = format!(
        "{number} [{chapter} > {section}]\n{text}",
        number = rule.rule_number,
        chapter = rule.chapter,
        section = rule.section,
        text = truncate(&rule.text, MAX_RULE_CHARS),
    );
    for example in &rule.examples {
        out.push_str("\nExample: ");
        out.push_str(truncate(example, MAX_RULE_CHARS));
    }
    out.push('\n');
    out
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
