//! Refresh orchestration: rules ingestion, the card database refresher, and
//! the periodic scheduler that drives them.

mod cards;
mod rules;
mod scheduler;

pub use cards::{ALREADY_RUNNING, CARDS_FRESHNESS_HOURS, CardDatabaseRefresher, UP_TO_DATE};
pub use rules::{IngestError, RULE_BATCH_SIZE, RULES_FRESHNESS_DAYS, RulesIngestor, StalenessGate};
pub use scheduler::{DEFAULT_PERIOD, PeriodicJob, run_periodic};

#[cfg(test)]
pub(crate) mod testing;
