//! Fakes shared by the refresh tests.

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use spellbook_core::{Card, Rarity, RefreshOutcome, RuleRecord};
use spellbook_store::{CardStore, MemoryStore, RuleStore, StoreError};
use spellbook_sync::{CardLoader, RulebookSource, SyncError};
use tempfile::NamedTempFile;
use tokio::sync::Notify;

/// A rulebook with `n` rules under section 100.
pub fn rulebook(n: usize) -> String {
    let mut text = String::from("Comprehensive Rules\n\n1. Game Concepts\n\n100. General\n\n");
    for i in 1..=n {
        text.push_str(&format!("100.{i}. Rule number {i} has a long enough body.\n\n"));
    }
    text
}

pub fn rulebook_file(n: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(rulebook(n).as_bytes()).unwrap();
    file
}

pub fn rule(number: &str) -> RuleRecord {
    RuleRecord {
        rule_number: number.into(),
        text: format!("Seeded rule {number} text."),
        examples: vec![],
        keywords: vec![],
        chapter: "Game Concepts".into(),
        section: "General".into(),
        subsection: "1".into(),
        related_rules: vec![],
    }
}

/// Serves a fixed rulebook text, or fails like an unreachable server.
/// Remembers the path of every temporary file it hands out.
pub struct FakeSource {
    text: Option<String>,
    served: Mutex<Vec<PathBuf>>,
    pub calls: AtomicUsize,
}

impl FakeSource {
    pub fn serving(text: String) -> Arc<Self> {
        Arc::new(Self {
            text: Some(text),
            served: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            text: None,
            served: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn served_paths(&self) -> Vec<PathBuf> {
        self.served.lock().unwrap().clone()
    }
}

#[async_trait]
impl RulebookSource for FakeSource {
    async fn fetch_rulebook(&self) -> Result<NamedTempFile, SyncError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.text {
            Some(text) => {
                let mut file = NamedTempFile::new()?;
                file.write_all(text.as_bytes())?;
                self.served.lock().unwrap().push(file.path().to_path_buf());
                Ok(file)
            }
            None => Err(SyncError::Server {
                status: 503,
                body: "unavailable".into(),
            }),
        }
    }
}

/// Records the size of every insert batch; optionally fails the nth insert.
pub struct RecordingRuleStore {
    pub inner: MemoryStore,
    pub batches: Mutex<Vec<usize>>,
    fail_on_insert: Option<usize>,
}

impl RecordingRuleStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::new(),
            batches: Mutex::new(Vec::new()),
            fail_on_insert: None,
        })
    }

    /// Fail the insert call with this zero-based index.
    pub fn failing_on(index: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::new(),
            batches: Mutex::new(Vec::new()),
            fail_on_insert: Some(index),
        })
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl RuleStore for RecordingRuleStore {
    async fn delete_all_rules(&self) -> Result<usize, StoreError> {
        self.inner.delete_all_rules().await
    }

    async fn insert_rules(&self, rules: &[RuleRecord]) -> Result<usize, StoreError> {
        let index = {
            let mut batches = self.batches.lock().unwrap();
            batches.push(rules.len());
            batches.len() - 1
        };
        if self.fail_on_insert == Some(index) {
            return Err(StoreError::Other("disk full".into()));
        }
        self.inner.insert_rules(rules).await
    }

    async fn latest_rule_created_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.inner.latest_rule_created_at().await
    }

    async fn rule_count(&self) -> Result<usize, StoreError> {
        self.inner.rule_count().await
    }

    async fn get_rule(&self, rule_number: &str) -> Result<Option<RuleRecord>, StoreError> {
        self.inner.get_rule(rule_number).await
    }

    async fn search_rules(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RuleRecord>, StoreError> {
        self.inner.search_rules(query, limit).await
    }
}

/// Writes `count` cards into the store, or reports failure without touching it.
pub struct FakeLoader {
    store: Arc<MemoryStore>,
    count: usize,
    succeed: bool,
    gate: Option<Arc<Notify>>,
    pub calls: AtomicUsize,
}

impl FakeLoader {
    pub fn loading(store: Arc<MemoryStore>, count: usize) -> Arc<Self> {
        Arc::new(Self {
            store,
            count,
            succeed: true,
            gate: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(store: Arc<MemoryStore>) -> Arc<Self> {
        Arc::new(Self {
            store,
            count: 0,
            succeed: false,
            gate: None,
            calls: AtomicUsize::new(0),
        })
    }

    /// Waits for `gate` to be notified before loading.
    pub fn gated(store: Arc<MemoryStore>, count: usize, gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            store,
            count,
            succeed: true,
            gate: Some(gate),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CardLoader for FakeLoader {
    async fn refresh_all_cards(&self) -> RefreshOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if !self.succeed {
            return RefreshOutcome::failed("Card refresh failed: server returned 500");
        }
        let cards: Vec<Card> = (0..self.count)
            .map(|i| Card {
                id: i.to_string(),
                name: format!("Card {i}"),
                set_code: "tst".into(),
                collector_number: i.to_string(),
                rarity: Rarity::Common,
                type_line: String::new(),
                mana_cost: String::new(),
                oracle_text: String::new(),
            })
            .collect();
        self.store.delete_all_cards().await.unwrap();
        self.store.insert_cards(&cards).await.unwrap();
        RefreshOutcome::ok(format!("Loaded {} cards", self.count))
    }
}
