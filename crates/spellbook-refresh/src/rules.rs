//! Rules ingestion: replace the stored rule set from a rulebook file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use spellbook_core::{RefreshOutcome, parse_rules};
use spellbook_store::{RuleStore, StoreError};
use spellbook_sync::RulebookSource;
use thiserror::Error;
use tracing::{error, info, warn};

/// Rules written per insert call.
pub const RULE_BATCH_SIZE: usize = 100;

/// Stored rules younger than this are not refreshed.
pub const RULES_FRESHNESS_DAYS: i64 = 7;

/// Whether a refresh honours the freshness window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StalenessGate {
    Check,
    Ignore,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("cannot read rulebook {path}: {source}")]
    Source {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Replaces the rule table from a rulebook, downloaded or local.
///
/// There is no transaction around a refresh: a failed batch leaves the
/// batches before it in place.
pub struct RulesIngestor {
    store: Arc<dyn RuleStore>,
    source: Arc<dyn RulebookSource>,
    fallback_path: PathBuf,
}

impl RulesIngestor {
    /// `fallback_path` is the bundled rulebook used when the download fails.
    pub fn new(
        store: Arc<dyn RuleStore>,
        source: Arc<dyn RulebookSource>,
        fallback_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            source,
            fallback_path: fallback_path.into(),
        }
    }

    /// Delete every stored rule, parse `path`, and insert the result in batches.
    ///
    /// Returns the number of rules inserted. An unreadable file leaves the
    /// store untouched; a rulebook without the anchor leaves it empty.
    pub async fn update_rules_database(&self, path: &Path) -> Result<usize, IngestError> {
        let raw = read_rulebook(path).await?;

        let removed = self.store.delete_all_rules().await?;
        let rules = parse_rules(&raw);

        let mut inserted = 0;
        let mut batches = 0;
        for batch in rules.chunks(RULE_BATCH_SIZE) {
            inserted += self.store.insert_rules(batch).await?;
            batches += 1;
        }

        info!(
            path = %path.display(),
            removed,
            inserted,
            batches,
            "rules database updated"
        );
        Ok(inserted)
    }

    /// Refresh from the published rulebook unless the stored rules are fresh.
    pub async fn update_rules_from_wotc(&self) -> RefreshOutcome {
        self.refresh_rules(StalenessGate::Check).await
    }

    /// Download and ingest the rulebook, falling back to the bundled copy.
    ///
    /// Every failure is folded into the returned outcome.
    pub async fn refresh_rules(&self, gate: StalenessGate) -> RefreshOutcome {
        if gate == StalenessGate::Check {
            match self.store.latest_rule_created_at().await {
                Ok(Some(created)) => {
                    let age = Utc::now() - created;
                    if age < TimeDelta::days(RULES_FRESHNESS_DAYS) {
                        info!(age_hours = age.num_hours(), "rules are fresh, skipping");
                        return RefreshOutcome::ok(format!(
                            "Skipping update: rules were refreshed {} day(s) ago",
                            age.num_days()
                        ));
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    error!(error = %e, "cannot read rules age");
                    return RefreshOutcome::failed(format!("Rules update failed: {e}"));
                }
            }
        }

        match self.source.fetch_rulebook().await {
            Ok(tmp) => {
                let result = self.update_rules_database(tmp.path()).await;
                if let Err(e) = tmp.close() {
                    warn!(error = %e, "could not delete downloaded rulebook");
                }
                outcome(result, "downloaded rulebook")
            }
            Err(e) => {
                warn!(
                    error = %e,
                    fallback = %self.fallback_path.display(),
                    "rulebook download failed, using local copy"
                );
                let result = self.update_rules_database(&self.fallback_path).await;
                outcome(result, "local rulebook")
            }
        }
    }
}

fn outcome(result: Result<usize, IngestError>, origin: &str) -> RefreshOutcome {
    match result {
        Ok(0) => {
            warn!(origin, "rulebook produced no rules");
            RefreshOutcome::failed(format!("No rules parsed from {origin}"))
        }
        Ok(count) => RefreshOutcome::ok(format!("Updated {count} rules from {origin}")),
        Err(e) => {
            error!(origin, error = %e, "rules update failed");
            RefreshOutcome::failed(format!("Rules update failed: {e}"))
        }
    }
}

/// Read a rulebook as text. The published file is not always valid UTF-8
/// and sometimes starts with a byte-order mark.
async fn read_rulebook(path: &Path) -> Result<String, IngestError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| IngestError::Source {
            path: path.to_path_buf(),
            source,
        })?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(text.trim_start_matches('\u{feff}').to_string())
}
