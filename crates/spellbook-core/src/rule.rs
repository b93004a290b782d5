//! Domain records shared by the parser, the stores, and the refresh jobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed key of the singleton metadata row.
pub const CARD_DATABASE_ID: &str = "card_database";

/// One structured entry from the comprehensive rulebook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRecord {
    /// Dotted rule number, e.g. `100.1a`.
    pub rule_number: String,
    pub text: String,
    pub examples: Vec<String>,
    /// Naive capitalized-phrase keywords, at most ten and without duplicates.
    pub keywords: Vec<String>,
    pub chapter: String,
    pub section: String,
    pub subsection: String,
    /// Reserved for a cross-reference pass. Always empty today.
    #[serde(default)]
    pub related_rules: Vec<String>,
}

/// Singleton row summarising the last database refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseMetadata {
    pub id: String,
    pub last_updated: DateTime<Utc>,
    pub total_cards: i64,
    pub description: String,
}

/// Result reported by every refresh boundary instead of an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshOutcome {
    pub success: bool,
    pub message: String,
}

impl RefreshOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Card rarity as stored in the card table.
///
/// Bulk data is inconsistent about spelling ("mythic", "Mythic Rare", "M"),
/// so deserialisation goes through [`Rarity::parse_lenient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Mythic,
    Special,
    Bonus,
}

impl Rarity {
    /// Map any known spelling onto a rarity. Unknown values become `Special`.
    pub fn parse_lenient(raw: &str) -> Self {
        let norm = raw.trim().to_ascii_lowercase();
        match norm.as_str() {
            "common" | "c" | "basic land" | "land" => Rarity::Common,
            "uncommon" | "u" => Rarity::Uncommon,
            "rare" | "r" => Rarity::Rare,
            "mythic" | "mythic rare" | "mythic_rare" | "m" => Rarity::Mythic,
            "bonus" | "b" => Rarity::Bonus,
            _ => Rarity::Special,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Uncommon => "uncommon",
            Rarity::Rare => "rare",
            Rarity::Mythic => "mythic",
            Rarity::Special => "special",
            Rarity::Bonus => "bonus",
        }
    }
}

impl From<String> for Rarity {
    fn from(raw: String) -> Self {
        Rarity::parse_lenient(&raw)
    }
}

impl std::fmt::Display for Rarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A card as loaded from the bulk-data snapshot.
///
/// Field names follow the bulk-data JSON; everything except `id` and `name`
/// is optional there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub name: String,
    #[serde(rename = "set", default)]
    pub set_code: String,
    #[serde(default)]
    pub collector_number: String,
    #[serde(default = "default_rarity")]
    pub rarity: Rarity,
    #[serde(default)]
    pub type_line: String,
    #[serde(default)]
    pub mana_cost: String,
    #[serde(default)]
    pub oracle_text: String,
}

fn default_rarity() -> Rarity {
    Rarity::Common
}
