//! Card database refresh: the daily cycle that reloads cards, then rules,
//! then records what happened in the metadata row.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{TimeDelta, Utc};
use spellbook_core::{CARD_DATABASE_ID, DatabaseMetadata, RefreshOutcome};
use spellbook_store::{CardStore, MetadataStore};
use spellbook_sync::CardLoader;
use tracing::{error, info, warn};

use crate::rules::{RulesIngestor, StalenessGate};

/// The metadata row younger than this means the cards are current.
pub const CARDS_FRESHNESS_HOURS: i64 = 24;

pub const UP_TO_DATE: &str = "Database is up to date";

pub const ALREADY_RUNNING: &str = "A database refresh is already in progress";

/// Drives one refresh cycle:
/// `check staleness -> refresh cards -> refresh rules -> write metadata`.
///
/// At most one cycle runs at a time per refresher; a call that arrives while
/// another is in flight returns immediately with [`ALREADY_RUNNING`].
pub struct CardDatabaseRefresher {
    loader: Arc<dyn CardLoader>,
    rules: RulesIngestor,
    cards: Arc<dyn CardStore>,
    metadata: Arc<dyn MetadataStore>,
    in_progress: AtomicBool,
}

/// Clears the in-progress flag when the cycle ends, however it ends.
struct RefreshGuard<'a>(&'a AtomicBool);

impl<'a> RefreshGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CardDatabaseRefresher {
    pub fn new(
        loader: Arc<dyn CardLoader>,
        rules: RulesIngestor,
        cards: Arc<dyn CardStore>,
        metadata: Arc<dyn MetadataStore>,
    ) -> Self {
        Self {
            loader,
            rules,
            cards,
            metadata,
            in_progress: AtomicBool::new(false),
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Run a cycle unless the metadata row is younger than
    /// [`CARDS_FRESHNESS_HOURS`].
    pub async fn update_card_database(&self) -> RefreshOutcome {
        self.run(StalenessGate::Check).await
    }

    /// Run a cycle ignoring both the card and the rules freshness windows.
    pub async fn force_update_card_database(&self) -> RefreshOutcome {
        self.run(StalenessGate::Ignore).await
    }

    async fn run(&self, gate: StalenessGate) -> RefreshOutcome {
        let Some(_guard) = RefreshGuard::acquire(&self.in_progress) else {
            warn!("refresh requested while another is running");
            return RefreshOutcome::failed(ALREADY_RUNNING);
        };

        let previous = match self.metadata.get_metadata(CARD_DATABASE_ID).await {
            Ok(previous) => previous,
            Err(e) => {
                warn!(error = %e, "cannot read card database metadata, refreshing anyway");
                None
            }
        };

        if gate == StalenessGate::Check
            && let Some(meta) = &previous
        {
            let age = Utc::now() - meta.last_updated;
            if age < TimeDelta::hours(CARDS_FRESHNESS_HOURS) {
                info!(
                    age_minutes = age.num_minutes(),
                    total_cards = meta.total_cards,
                    "card database is up to date"
                );
                return RefreshOutcome::ok(UP_TO_DATE);
            }
        }

        info!(forced = gate == StalenessGate::Ignore, "card database refresh started");

        let cards = self.loader.refresh_all_cards().await;
        if !cards.success {
            warn!(message = %cards.message, "card refresh failed, continuing with rules");
        }

        let rules = match gate {
            StalenessGate::Check => self.rules.update_rules_from_wotc().await,
            StalenessGate::Ignore => self.rules.refresh_rules(StalenessGate::Ignore).await,
        };

        let total_cards = match self.cards.count_cards().await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "cannot count cards, keeping previous total");
                previous.as_ref().map_or(0, |m| m.total_cards)
            }
        };

        let description = format!("Cards: {}. Rules: {}", cards.message, rules.message);
        let record = DatabaseMetadata {
            id: CARD_DATABASE_ID.to_string(),
            last_updated: Utc::now(),
            total_cards,
            description: description.clone(),
        };
        if let Err(e) = self.metadata.upsert_metadata(&record).await {
            error!(error = %e, "cannot write card database metadata");
            return RefreshOutcome::failed(format!("{description}. Metadata write failed: {e}"));
        }

        let success = cards.success && rules.success;
        info!(
            success,
            total_cards,
            cards_ok = cards.success,
            rules_ok = rules.success,
            "card database refresh finished"
        );
        RefreshOutcome {
            success,
            message: description,
        }
    }
}
