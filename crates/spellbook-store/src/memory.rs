//! In-process store. Nothing survives the process.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use spellbook_core::{Card, DatabaseMetadata, RuleRecord, rank_rules};

use crate::{CardStore, MetadataStore, RuleStore, StoreError};

#[derive(Default)]
struct Inner {
    rules: Vec<RuleRecord>,
    rule_created_at: Vec<DateTime<Utc>>,
    cards: Vec<Card>,
    metadata: HashMap<String, DatabaseMetadata>,
}

/// Mutex-guarded vectors implementing every store trait.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert rules with an explicit creation time instead of now.
    ///
    /// Lets callers seed a store that looks as if it was filled days ago.
    pub fn insert_rules_at(
        &self,
        rules: &[RuleRecord],
        created_at: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let mut inner = self.lock()?;
        inner.rules.extend_from_slice(rules);
        inner
            .rule_created_at
            .extend(std::iter::repeat_n(created_at, rules.len()));
        Ok(rules.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Other("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl RuleStore for MemoryStore {
    async fn delete_all_rules(&self) -> Result<usize, StoreError> {
        let mut inner = self.lock()?;
        let removed = inner.rules.len();
        inner.rules.clear();
        inner.rule_created_at.clear();
        Ok(removed)
    }

    async fn insert_rules(&self, rules: &[RuleRecord]) -> Result<usize, StoreError> {
        self.insert_rules_at(rules, Utc::now())
    }

    async fn latest_rule_created_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.lock()?.rule_created_at.iter().max().copied())
    }

    async fn rule_count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.rules.len())
    }

    async fn get_rule(&self, rule_number: &str) -> Result<Option<RuleRecord>, StoreError> {
        Ok(self
            .lock()?
            .rules
            .iter()
            .find(|r| r.rule_number == rule_number)
            .cloned())
    }

    async fn search_rules(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RuleRecord>, StoreError> {
        let inner = self.lock()?;
        Ok(rank_rules(&inner.rules, query, limit)
            .into_iter()
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CardStore for MemoryStore {
    async fn delete_all_cards(&self) -> Result<usize, StoreError> {
        let mut inner = self.lock()?;
        let removed = inner.cards.len();
        inner.cards.clear();
        Ok(removed)
    }

    async fn insert_cards(&self, cards: &[Card]) -> Result<usize, StoreError> {
        self.lock()?.cards.extend_from_slice(cards);
        Ok(cards.len())
    }

    async fn count_cards(&self) -> Result<i64, StoreError> {
        Ok(self.lock()?.cards.len() as i64)
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn get_metadata(&self, id: &str) -> Result<Option<DatabaseMetadata>, StoreError> {
        Ok(self.lock()?.metadata.get(id).cloned())
    }

    async fn upsert_metadata(&self, metadata: &DatabaseMetadata) -> Result<(), StoreError> {
        self.lock()?
            .metadata
            .insert(metadata.id.clone(), metadata.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use spellbook_core::{CARD_DATABASE_ID, Rarity};

    fn rule(number: &str, text: &str) -> RuleRecord {
        RuleRecord {
            rule_number: number.into(),
            text: text.into(),
            examples: vec![],
            keywords: vec![],
            chapter: "Game Concepts".into(),
            section: "General".into(),
            subsection: "1".into(),
            related_rules: vec![],
        }
    }

    fn card(id: &str) -> Card {
        Card {
            id: id.into(),
            name: format!("Card {id}"),
            set_code: "tst".into(),
            collector_number: id.into(),
            rarity: Rarity::Common,
            type_line: "Instant".into(),
            mana_cost: "{U}".into(),
            oracle_text: String::new(),
        }
    }

    #[tokio::test]
    async fn rules_delete_and_reinsert() {
        let store = MemoryStore::new();
        store
            .insert_rules(&[rule("100.1", "First rule text."), rule("100.2", "Second rule.")])
            .await
            .unwrap();
        assert_eq!(store.rule_count().await.unwrap(), 2);
        assert_eq!(store.delete_all_rules().await.unwrap(), 2);
        assert_eq!(store.rule_count().await.unwrap(), 0);
        assert!(store.latest_rule_created_at().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn latest_created_at_is_newest() {
        let store = MemoryStore::new();
        let old = Utc::now() - TimeDelta::days(10);
        store.insert_rules_at(&[rule("100.1", "Old rule text.")], old).unwrap();
        store.insert_rules(&[rule("100.2", "New rule text.")]).await.unwrap();
        let latest = store.latest_rule_created_at().await.unwrap().unwrap();
        assert!(latest > old);
    }

    #[tokio::test]
    async fn get_and_search_rules() {
        let store = MemoryStore::new();
        store
            .insert_rules(&[
                rule("100.1", "Players draw seven cards."),
                rule("702.2a", "Deathtouch is a static ability."),
            ])
            .await
            .unwrap();
        assert_eq!(
            store.get_rule("702.2a").await.unwrap().unwrap().text,
            "Deathtouch is a static ability."
        );
        assert!(store.get_rule("999.9").await.unwrap().is_none());

        let found = store.search_rules("deathtouch", 5).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rule_number, "702.2a");
    }

    #[tokio::test]
    async fn cards_counted() {
        let store = MemoryStore::new();
        store.insert_cards(&[card("1"), card("2"), card("3")]).await.unwrap();
        assert_eq!(store.count_cards().await.unwrap(), 3);
        assert_eq!(store.delete_all_cards().await.unwrap(), 3);
        assert_eq!(store.count_cards().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn metadata_upsert_replaces() {
        let store = MemoryStore::new();
        assert!(store.get_metadata(CARD_DATABASE_ID).await.unwrap().is_none());

        let mut meta = DatabaseMetadata {
            id: CARD_DATABASE_ID.into(),
            last_updated: Utc::now(),
            total_cards: 10,
            description: "first".into(),
        };
        store.upsert_metadata(&meta).await.unwrap();
        meta.total_cards = 20;
        meta.description = "second".into();
        store.upsert_metadata(&meta).await.unwrap();

        let got = store.get_metadata(CARD_DATABASE_ID).await.unwrap().unwrap();
        assert_eq!(got.total_cards, 20);
        assert_eq!(got.description, "second");
    }
}
