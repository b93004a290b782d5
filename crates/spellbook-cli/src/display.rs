//! Vertical card display for rule records and refresh metadata.

use chrono::Utc;
use spellbook_core::{DatabaseMetadata, RefreshOutcome, RuleRecord};

const MAX_LIST_ITEMS: usize = 10;

/// Print a single rule as a vertical card.
pub fn print_rule_card(rule: &RuleRecord) {
    println!("=== {} ===", rule.rule_number);
    println!("{}", rule.text);
    println!();

    println!("Location");
    print_field("chapter", &rule.chapter);
    print_field("section", &rule.section);
    print_field("subsection", &rule.subsection);
    println!();

    if !rule.examples.is_empty() {
        println!("Examples");
        for example in &rule.examples {
            println!("  - {example}");
        }
        println!();
    }

    if !rule.keywords.is_empty() || !rule.related_rules.is_empty() {
        println!("Index");
        print_list("keywords", &rule.keywords);
        print_list("related_rules", &rule.related_rules);
        println!();
    }
}

/// One line per rule, for search results and parse previews.
pub fn print_rule_line(rule: &RuleRecord) {
    let text: String = rule.text.chars().take(100).collect();
    let ellipsis = if rule.text.chars().count() > 100 { "..." } else { "" };
    println!("  {:<10} {text}{ellipsis}", rule.rule_number);
}

pub fn print_metadata(meta: &DatabaseMetadata) {
    let age = Utc::now() - meta.last_updated;
    println!("Card database");
    print_field("last_updated", &meta.last_updated.to_rfc3339());
    print_field("age", &format!("{}h {}m", age.num_hours(), age.num_minutes() % 60));
    print_field("total_cards", &meta.total_cards.to_string());
    print_field("description", &meta.description);
    println!();
}

pub fn print_outcome(label: &str, outcome: &RefreshOutcome) {
    let status = if outcome.success { "ok" } else { "FAILED" };
    println!("{label}: {status}");
    println!("  {}", outcome.message);
}

fn print_field(name: &str, value: &str) {
    if !value.is_empty() {
        println!("  {:<26} {}", name, value);
    }
}

fn print_list(name: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let shown: Vec<&str> = items.iter().take(MAX_LIST_ITEMS).map(String::as_str).collect();
    let extra = items.len().saturating_sub(MAX_LIST_ITEMS);
    if extra > 0 {
        println!("  {:<26} {} (+{extra} more)", name, shown.join(", "));
    } else {
        println!("  {:<26} {}", name, shown.join(", "));
    }
}
