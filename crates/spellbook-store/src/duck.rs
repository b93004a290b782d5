//! DuckDB storage for rules, cards, and refresh metadata.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use arrow::array::{Array, Int64Array, LargeStringArray, StringArray};
use arrow::datatypes::{DataType, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duckdb::{Connection, params};
use spellbook_core::catalog::{
    CARDS_TABLE, METADATA_TABLE, RULES_TABLE, cards_schema, metadata_schema, rules_schema,
};
use spellbook_core::{Card, DatabaseMetadata, RuleRecord, rank_rules, rule_sort_key};
use tracing::{debug, info};

use crate::{CardStore, MetadataStore, RuleStore, StoreError};

/// DuckDB store for the catalog tables.
///
/// Tables are created from the Arrow schemas in `spellbook_core::catalog` on open, so a
/// fresh file and an existing one behave the same. Reads go through
/// `query_arrow` and are checked against those schemas.
///
/// Use [`open`](Self::open) for an in-memory database and
/// [`open_persistent`](Self::open_persistent) for a file that survives restarts.
pub struct DuckStore {
    conn: Mutex<Connection>,
}

impl DuckStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let store = Self::init(Connection::open(path)?)?;
        info!(path = %path.display(), "opened duckdb store");
        Ok(store)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        let ddl = [
            create_table_sql(RULES_TABLE, &rules_schema(), None),
            create_table_sql(CARDS_TABLE, &cards_schema(), Some("id")),
            create_table_sql(METADATA_TABLE, &metadata_schema(), Some("id")),
        ]
        .join(";\n");
        conn.execute_batch(&ddl)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Other("duckdb connection lock poisoned".into()))
    }

    fn count_table(&self, table: &str) -> Result<i64, StoreError> {
        let sql = format!("SELECT count(*)::BIGINT AS cnt FROM {table}");
        let batches = self.query_arrow(&sql)?;
        let batch = batches.first().ok_or(StoreError::NoResults)?;
        let col = int64_column(batch, "cnt")?;
        Ok(col.value(0))
    }

    fn load_rules(
        &self,
        where_clause: &str,
        arg: Option<&str>,
    ) -> Result<Vec<RuleRecord>, StoreError> {
        let sql = format!("SELECT * FROM {RULES_TABLE} {where_clause} ORDER BY sort_key");
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let batches: Vec<RecordBatch> = match arg {
            Some(a) => stmt.query_arrow([a])?.collect(),
            None => stmt.query_arrow([])?.collect(),
        };
        let mut rules = Vec::new();
        for batch in &batches {
            rules.extend(rules_from_batch(batch)?);
        }
        Ok(rules)
    }

    /// Execute arbitrary SQL and return Arrow RecordBatches.
    pub fn query_arrow(&self, sql: &str) -> Result<Vec<RecordBatch>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();
        Ok(batches)
    }
}

#[async_trait]
impl RuleStore for DuckStore {
    async fn delete_all_rules(&self) -> Result<usize, StoreError> {
        let removed = self
            .lock()?
            .execute(&format!("DELETE FROM {RULES_TABLE}"), [])?;
        info!(removed, "deleted all rules");
        Ok(removed)
    }

    async fn insert_rules(&self, rules: &[RuleRecord]) -> Result<usize, StoreError> {
        let now = Utc::now().timestamp_millis();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {RULES_TABLE} VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            ))?;
            for r in rules {
                stmt.execute(params![
                    r.rule_number,
                    rule_sort_key(&r.rule_number),
                    r.text,
                    serde_json::to_string(&r.examples)?,
                    serde_json::to_string(&r.keywords)?,
                    r.chapter,
                    r.section,
                    r.subsection,
                    serde_json::to_string(&r.related_rules)?,
                    now,
                ])?;
            }
        }
        tx.commit()?;
        debug!(count = rules.len(), "inserted rule batch");
        Ok(rules.len())
    }

    async fn latest_rule_created_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let batches = self.query_arrow(&format!(
            "SELECT max(created_at_ms)::BIGINT AS latest FROM {RULES_TABLE}"
        ))?;
        let batch = batches.first().ok_or(StoreError::NoResults)?;
        let col = int64_column(batch, "latest")?;
        if col.is_null(0) {
            return Ok(None);
        }
        Ok(DateTime::from_timestamp_millis(col.value(0)))
    }

    async fn rule_count(&self) -> Result<usize, StoreError> {
        Ok(self.count_table(RULES_TABLE)? as usize)
    }

    async fn get_rule(&self, rule_number: &str) -> Result<Option<RuleRecord>, StoreError> {
        let mut rules = self.load_rules("WHERE rule_number = ?", Some(rule_number))?;
        Ok(if rules.is_empty() {
            None
        } else {
            Some(rules.swap_remove(0))
        })
    }

    async fn search_rules(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RuleRecord>, StoreError> {
        let rules = self.load_rules("", None)?;
        Ok(rank_rules(&rules, query, limit).into_iter().cloned().collect())
    }
}

#[async_trait]
impl CardStore for DuckStore {
    async fn delete_all_cards(&self) -> Result<usize, StoreError> {
        let removed = self
            .lock()?
            .execute(&format!("DELETE FROM {CARDS_TABLE}"), [])?;
        info!(removed, "deleted all cards");
        Ok(removed)
    }

    async fn insert_cards(&self, cards: &[Card]) -> Result<usize, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO {CARDS_TABLE} VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
            ))?;
            for c in cards {
                stmt.execute(params![
                    c.id,
                    c.name,
                    c.set_code,
                    c.collector_number,
                    c.rarity.as_str(),
                    c.type_line,
                    c.mana_cost,
                    c.oracle_text,
                ])?;
            }
        }
        tx.commit()?;
        Ok(cards.len())
    }

    async fn count_cards(&self) -> Result<i64, StoreError> {
        self.count_table(CARDS_TABLE)
    }
}

#[async_trait]
impl MetadataStore for DuckStore {
    async fn get_metadata(&self, id: &str) -> Result<Option<DatabaseMetadata>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("SELECT * FROM {METADATA_TABLE} WHERE id = ?"))?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([id])?.collect();
        let Some(batch) = batches.iter().find(|b| b.num_rows() > 0) else {
            return Ok(None);
        };
        check_schema(batch, &metadata_schema())?;

        let id = string_value(column(batch, "id")?, 0, "id")?;
        let last_updated_ms = int64_column(batch, "last_updated_ms")?.value(0);
        let last_updated = DateTime::from_timestamp_millis(last_updated_ms).ok_or_else(|| {
            StoreError::Column {
                column: "last_updated_ms".into(),
                reason: format!("{last_updated_ms} out of range"),
            }
        })?;
        Ok(Some(DatabaseMetadata {
            id,
            last_updated,
            total_cards: int64_column(batch, "total_cards")?.value(0),
            description: string_value(column(batch, "description")?, 0, "description")?,
        }))
    }

    async fn upsert_metadata(&self, metadata: &DatabaseMetadata) -> Result<(), StoreError> {
        self.lock()?.execute(
            &format!(
                "INSERT INTO {METADATA_TABLE} VALUES (?, ?, ?, ?)
                 ON CONFLICT (id) DO UPDATE SET
                     last_updated_ms = excluded.last_updated_ms,
                     total_cards = excluded.total_cards,
                     description = excluded.description"
            ),
            params![
                metadata.id,
                metadata.last_updated.timestamp_millis(),
                metadata.total_cards,
                metadata.description,
            ],
        )?;
        info!(id = %metadata.id, total_cards = metadata.total_cards, "upserted metadata");
        Ok(())
    }
}

// ── DDL ──

fn create_table_sql(table: &str, schema: &Schema, primary_key: Option<&str>) -> String {
    let columns: Vec<String> = schema
        .fields()
        .iter()
        .map(|f| {
            let ty = match f.data_type() {
                DataType::Int64 => "BIGINT",
                _ => "VARCHAR",
            };
            let mut col = format!("{} {ty}", f.name());
            if !f.is_nullable() {
                col.push_str(" NOT NULL");
            }
            if primary_key == Some(f.name().as_str()) {
                col.push_str(" PRIMARY KEY");
            }
            col
        })
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (\n    {}\n)",
        columns.join(",\n    ")
    )
}

// ── Arrow decoding ──

fn check_schema(batch: &RecordBatch, expected: &Schema) -> Result<(), StoreError> {
    for field in expected.fields() {
        if batch.schema().column_with_name(field.name()).is_none() {
            return Err(StoreError::Column {
                column: field.name().clone(),
                reason: "missing from result".into(),
            });
        }
    }
    Ok(())
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a dyn Array, StoreError> {
    batch
        .column_by_name(name)
        .map(|c| c.as_ref())
        .ok_or_else(|| StoreError::Column {
            column: name.into(),
            reason: "missing from result".into(),
        })
}

fn int64_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Int64Array, StoreError> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| StoreError::Column {
            column: name.into(),
            reason: "not i64".into(),
        })
}

fn string_value(col: &dyn Array, row: usize, name: &str) -> Result<String, StoreError> {
    if col.is_null(row) {
        return Ok(String::new());
    }
    col.as_any()
        .downcast_ref::<StringArray>()
        .map(|arr| arr.value(row).to_string())
        .or_else(|| {
            col.as_any()
                .downcast_ref::<LargeStringArray>()
                .map(|arr| arr.value(row).to_string())
        })
        .ok_or_else(|| StoreError::Column {
            column: name.into(),
            reason: "not a string".into(),
        })
}

fn json_list(col: &dyn Array, row: usize, name: &str) -> Result<Vec<String>, StoreError> {
    let raw = string_value(col, row, name)?;
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&raw)?)
}

fn rules_from_batch(batch: &RecordBatch) -> Result<Vec<RuleRecord>, StoreError> {
    check_schema(batch, &rules_schema())?;
    let rule_number = column(batch, "rule_number")?;
    let text = column(batch, "text")?;
    let examples = column(batch, "examples")?;
    let keywords = column(batch, "keywords")?;
    let chapter = column(batch, "chapter")?;
    let section = column(batch, "section")?;
    let subsection = column(batch, "subsection")?;
    let related = column(batch, "related_rules")?;

    (0..batch.num_rows())
        .map(|row| {
            Ok(RuleRecord {
                rule_number: string_value(rule_number, row, "rule_number")?,
                text: string_value(text, row, "text")?,
                examples: json_list(examples, row, "examples")?,
                keywords: json_list(keywords, row, "keywords")?,
                chapter: string_value(chapter, row, "chapter")?,
                section: string_value(section, row, "section")?,
                subsection: string_value(subsection, row, "subsection")?,
                related_rules: json_list(related, row, "related_rules")?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use spellbook_core::{CARD_DATABASE_ID, Rarity};

    fn rule(number: &str, text: &str) -> RuleRecord {
        RuleRecord {
            rule_number: number.into(),
            text: text.into(),
            examples: vec!["A player draws a card.".into()],
            keywords: vec!["Game Concepts".into()],
            chapter: "Game Concepts".into(),
            section: "General".into(),
            subsection: number.split_once('.').unwrap().1.into(),
            related_rules: vec![],
        }
    }

    fn card(id: &str, rarity: Rarity) -> Card {
        Card {
            id: id.into(),
            name: format!("Card {id}"),
            set_code: "tst".into(),
            collector_number: id.into(),
            rarity,
            type_line: "Creature — Elf".into(),
            mana_cost: "{G}".into(),
            oracle_text: "Tap: add one mana.".into(),
        }
    }

    #[test]
    fn ddl_from_schema() {
        let sql = create_table_sql("database_metadata", &metadata_schema(), Some("id"));
        assert!(sql.contains("id VARCHAR NOT NULL PRIMARY KEY"));
        assert!(sql.contains("total_cards BIGINT NOT NULL"));
    }

    #[tokio::test]
    async fn open_in_memory_creates_tables() {
        let store = DuckStore::open().unwrap();
        assert_eq!(store.rule_count().await.unwrap(), 0);
        assert_eq!(store.count_cards().await.unwrap(), 0);
        assert!(store.latest_rule_created_at().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rules_roundtrip_in_document_order() {
        let store = DuckStore::open().unwrap();
        store
            .insert_rules(&[
                rule("100.10", "Tenth rule of the section."),
                rule("100.2", "Second rule of the section."),
                rule("100.1a", "Sub-rule of the first rule in the section."),
            ])
            .await
            .unwrap();

        assert_eq!(store.rule_count().await.unwrap(), 3);
        let found = store.get_rule("100.1a").await.unwrap().unwrap();
        assert_eq!(found.examples, vec!["A player draws a card."]);
        assert_eq!(found.keywords, vec!["Game Concepts"]);

        let all = store.search_rules("section", 10).await.unwrap();
        let numbers: Vec<_> = all.iter().map(|r| r.rule_number.as_str()).collect();
        assert_eq!(numbers, vec!["100.1a", "100.2", "100.10"]);
        assert!(store.latest_rule_created_at().await.unwrap().is_some());

        assert_eq!(store.delete_all_rules().await.unwrap(), 3);
        assert!(store.get_rule("100.1a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cards_insert_and_count() {
        let store = DuckStore::open().unwrap();
        store
            .insert_cards(&[card("a", Rarity::Common), card("b", Rarity::Mythic)])
            .await
            .unwrap();
        assert_eq!(store.count_cards().await.unwrap(), 2);
        assert_eq!(store.delete_all_cards().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn metadata_upsert_then_read() {
        let store = DuckStore::open().unwrap();
        assert!(store.get_metadata(CARD_DATABASE_ID).await.unwrap().is_none());

        let first = DatabaseMetadata {
            id: CARD_DATABASE_ID.into(),
            last_updated: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
            total_cards: 100,
            description: "Cards: ok; Rules: ok".into(),
        };
        store.upsert_metadata(&first).await.unwrap();
        let second = DatabaseMetadata {
            total_cards: 250,
            ..first.clone()
        };
        store.upsert_metadata(&second).await.unwrap();

        let got = store.get_metadata(CARD_DATABASE_ID).await.unwrap().unwrap();
        assert_eq!(got, second);
        assert_eq!(store.count_table(METADATA_TABLE).unwrap(), 1);
    }

    #[tokio::test]
    async fn persistent_store_survives_reopen() {
        let tmp = tempfile::TempDir::new().unwrap();
        let db_path = tmp.path().join("spellbook.duckdb");

        let store = DuckStore::open_persistent(&db_path).unwrap();
        store
            .insert_rules(&[rule("100.1", "These rules apply to any game.")])
            .await
            .unwrap();
        drop(store);

        let store = DuckStore::open_persistent(&db_path).unwrap();
        assert_eq!(store.rule_count().await.unwrap(), 1);
    }
}
