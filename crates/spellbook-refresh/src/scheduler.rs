//! Timer-driven invocation of a refresh job.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use spellbook_core::RefreshOutcome;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};

use crate::cards::CardDatabaseRefresher;

pub const DEFAULT_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// A unit of work the scheduler can repeat. Failures are outcomes, not errors.
#[async_trait]
pub trait PeriodicJob: Send + Sync {
    fn name(&self) -> &str;

    async fn run_once(&self) -> RefreshOutcome;
}

#[async_trait]
impl PeriodicJob for CardDatabaseRefresher {
    fn name(&self) -> &str {
        "card-database-refresh"
    }

    async fn run_once(&self) -> RefreshOutcome {
        self.update_card_database().await
    }
}

/// Run `job` immediately, then once per `period`, until `shutdown` resolves.
///
/// A tick that falls due while a run is still going is delayed, never
/// stacked. Returns the number of runs started.
pub async fn run_periodic<J, F>(job: &J, period: Duration, shutdown: F) -> usize
where
    J: PeriodicJob + ?Sized,
    F: Future<Output = ()>,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut runs = 0usize;
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!(job = job.name(), runs, "scheduler stopping");
                return runs;
            }
            _ = ticker.tick() => {
                runs += 1;
                let outcome = job.run_once().await;
                if outcome.success {
                    info!(job = job.name(), run = runs, message = %outcome.message, "scheduled run finished");
                } else {
                    warn!(job = job.name(), run = runs, message = %outcome.message, "scheduled run failed");
                }
            }
        }
    }
}
