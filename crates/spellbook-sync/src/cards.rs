//! Bulk card loading: the "refresh all cards" collaborator of the refresher.

use std::io::Read;

use async_trait::async_trait;
use spellbook_core::{Card, RefreshOutcome};
use spellbook_store::CardStore;
use tracing::info;

use crate::SyncError;

/// Cards written per insert call.
pub const CARD_BATCH_SIZE: usize = 1000;

/// Replaces the whole card table from an external source.
///
/// Never fails past its own boundary: every problem is reported through the
/// returned [`RefreshOutcome`].
#[async_trait]
pub trait CardLoader: Send + Sync {
    async fn refresh_all_cards(&self) -> RefreshOutcome;
}

/// Deserialise a bulk-data card array. Unknown fields are ignored and
/// rarities are repaired on the way in.
pub fn parse_cards<R: Read>(reader: R) -> Result<Vec<Card>, SyncError> {
    Ok(serde_json::from_reader(reader)?)
}

/// Delete every card, then insert `cards` in batches of [`CARD_BATCH_SIZE`].
///
/// A failed batch aborts the remaining ones.
pub async fn replace_cards(store: &dyn CardStore, cards: &[Card]) -> Result<usize, SyncError> {
    let removed = store.delete_all_cards().await?;
    let mut inserted = 0;
    for batch in cards.chunks(CARD_BATCH_SIZE) {
        inserted += store.insert_cards(batch).await?;
    }
    info!(removed, inserted, "replaced card table");
    Ok(inserted)
}

#[cfg(feature = "http")]
pub use self::http::{BulkCardLoader, DEFAULT_BULK_DATA_URL};

#[cfg(feature = "http")]
mod http {
    use std::io::BufReader;
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde::Deserialize;
    use spellbook_core::RefreshOutcome;
    use spellbook_store::CardStore;
    use tracing::{error, info};

    use super::{CardLoader, parse_cards, replace_cards};
    use crate::SyncError;
    use crate::download::{download_to_temp, http_client};

    /// Bulk-data index entry describing the current card snapshot.
    pub const DEFAULT_BULK_DATA_URL: &str = "https://api.scryfall.com/bulk-data/default-cards";

    #[derive(Deserialize)]
    struct BulkDataIndex {
        download_uri: Option<String>,
        #[serde(default)]
        updated_at: Option<String>,
    }

    /// Loads the card table from a bulk-data snapshot.
    ///
    /// Reads the index at `index_url`, streams the referenced JSON file to a
    /// temporary file, and swaps the card table contents.
    pub struct BulkCardLoader {
        client: reqwest::Client,
        index_url: String,
        store: Arc<dyn CardStore>,
    }

    impl BulkCardLoader {
        pub fn new(index_url: impl Into<String>, store: Arc<dyn CardStore>) -> Self {
            Self {
                client: http_client(),
                index_url: index_url.into(),
                store,
            }
        }

        async fn load(&self) -> Result<usize, SyncError> {
            info!(url = %self.index_url, "fetching bulk data index");
            let resp = self.client.get(&self.index_url).send().await?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(SyncError::Server {
                    status: status.as_u16(),
                    body,
                });
            }
            let index: BulkDataIndex = resp.json().await?;
            let uri = index.download_uri.ok_or(SyncError::MissingDownloadUri)?;
            info!(uri = %uri, updated_at = ?index.updated_at, "bulk data snapshot located");

            let tmp = download_to_temp(&self.client, &uri).await?;
            let file = tmp.reopen()?;
            let cards = tokio::task::spawn_blocking(move || parse_cards(BufReader::new(file)))
                .await
                .map_err(|e| SyncError::Io(std::io::Error::other(e)))??;
            drop(tmp);

            replace_cards(self.store.as_ref(), &cards).await
        }
    }

    #[async_trait]
    impl CardLoader for BulkCardLoader {
        async fn refresh_all_cards(&self) -> RefreshOutcome {
            match self.load().await {
                Ok(count) => RefreshOutcome::ok(format!("Loaded {count} cards")),
                Err(e) => {
                    error!(error = %e, "card refresh failed");
                    RefreshOutcome::failed(format!("Card refresh failed: {e}"))
                }
            }
        }
    }
}
