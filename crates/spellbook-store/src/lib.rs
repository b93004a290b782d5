//! Storage layer: rule records, cards, and the refresh metadata row.
//!
//! The refresh jobs only see the three traits below. [`MemoryStore`] backs
//! tests and ephemeral runs; [`DuckStore`] (feature `duckdb`) is the
//! persistent store used by the CLI.

mod error;
mod memory;

pub use error::StoreError;
pub use memory::MemoryStore;

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::DuckStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use spellbook_core::{Card, DatabaseMetadata, RuleRecord};

/// Bulk-deletable, bulk-insertable collection of rule records.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Remove every rule record. Returns the number removed.
    async fn delete_all_rules(&self) -> Result<usize, StoreError>;

    /// Insert one batch of rules, stamping them with the current time.
    async fn insert_rules(&self, rules: &[RuleRecord]) -> Result<usize, StoreError>;

    /// Insertion time of the most recently created rule, if any.
    async fn latest_rule_created_at(&self) -> Result<Option<DateTime<Utc>>, StoreError>;

    async fn rule_count(&self) -> Result<usize, StoreError>;

    async fn get_rule(&self, rule_number: &str) -> Result<Option<RuleRecord>, StoreError>;

    /// Ranked free-text search, best match first.
    async fn search_rules(&self, query: &str, limit: usize)
    -> Result<Vec<RuleRecord>, StoreError>;
}

/// The card table written by the bulk loader.
#[async_trait]
pub trait CardStore: Send + Sync {
    async fn delete_all_cards(&self) -> Result<usize, StoreError>;

    async fn insert_cards(&self, cards: &[Card]) -> Result<usize, StoreError>;

    async fn count_cards(&self) -> Result<i64, StoreError>;
}

/// Upsert-only access to the refresh metadata row(s).
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get_metadata(&self, id: &str) -> Result<Option<DatabaseMetadata>, StoreError>;

    async fn upsert_metadata(&self, metadata: &DatabaseMetadata) -> Result<(), StoreError>;
}
