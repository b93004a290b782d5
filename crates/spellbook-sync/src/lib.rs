//! Upstream sources: the comprehensive-rules text file and the bulk card snapshot.
//!
//! The traits are always available so the refresh jobs can be driven by fakes;
//! the reqwest-backed clients sit behind the `http` feature.

mod cards;
mod error;
mod rulebook;

#[cfg(feature = "http")]
mod download;

pub use cards::{CARD_BATCH_SIZE, CardLoader, parse_cards, replace_cards};
pub use error::SyncError;
pub use rulebook::{DEFAULT_RULES_URL, RulebookSource};

#[cfg(feature = "http")]
pub use cards::{BulkCardLoader, DEFAULT_BULK_DATA_URL};
#[cfg(feature = "http")]
pub use rulebook::RulebookClient;
