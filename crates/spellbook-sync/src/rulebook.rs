//! Comprehensive-rules text source.

use async_trait::async_trait;
use tempfile::NamedTempFile;

use crate::SyncError;

/// Dated plain-text rulebook published by the game's maker.
pub const DEFAULT_RULES_URL: &str =
    "https://media.wizards.com/2025/downloads/MagicCompRules%2020250404.txt";

/// Something that can produce the current rulebook as a local file.
#[async_trait]
pub trait RulebookSource: Send + Sync {
    /// Fetch the rulebook into a temporary file, deleted when dropped.
    async fn fetch_rulebook(&self) -> Result<NamedTempFile, SyncError>;
}

/// Downloads the rulebook over HTTPS.
///
/// No timeout beyond the transport default is applied.
#[cfg(feature = "http")]
pub struct RulebookClient {
    client: reqwest::Client,
    url: String,
}

#[cfg(feature = "http")]
impl RulebookClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: crate::download::http_client(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl RulebookSource for RulebookClient {
    async fn fetch_rulebook(&self) -> Result<NamedTempFile, SyncError> {
        crate::download::download_to_temp(&self.client, &self.url).await
    }
}

#[cfg(all(test, feature = "http"))]
mod tests {
    use super::*;

    #[test]
    fn client_keeps_url() {
        let client = RulebookClient::new(DEFAULT_RULES_URL);
        assert_eq!(client.url(), DEFAULT_RULES_URL);
    }

    #[tokio::test]
    async fn unreachable_host_is_an_error() {
        let client = RulebookClient::new("http://127.0.0.1:9/rules.txt");
        assert!(client.fetch_rulebook().await.is_err());
    }
}
