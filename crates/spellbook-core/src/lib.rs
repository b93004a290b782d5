pub mod parser;
pub mod rule;
pub mod rule_number;
pub mod schema;
pub mod search;

pub use parser::parse_rules;
pub use rule::{
    CARD_DATABASE_ID, Card, DatabaseMetadata, Rarity, RefreshOutcome, RuleRecord,
};
pub use rule_number::rule_sort_key;
pub use schema::catalog;
pub use search::rank_rules;
