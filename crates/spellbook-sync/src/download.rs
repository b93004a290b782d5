//! Streaming HTTP download into a temporary file.

use futures::StreamExt;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::SyncError;

const USER_AGENT: &str = concat!("spellbook/", env!("CARGO_PKG_VERSION"));

/// Client shared by the rulebook and card sources.
///
/// Upstream APIs reject requests without a user agent.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// GET `url` and stream the body to a fresh temporary file.
///
/// Anything but `200 OK` is reported as [`SyncError::Server`]. The file is
/// deleted when the returned handle is dropped.
pub(crate) async fn download_to_temp(
    client: &reqwest::Client,
    url: &str,
) -> Result<NamedTempFile, SyncError> {
    info!(url, "starting download");
    let resp = client.get(url).send().await?;
    let status = resp.status();
    if status != reqwest::StatusCode::OK {
        let body = resp.text().await.unwrap_or_default();
        return Err(SyncError::Server {
            status: status.as_u16(),
            body,
        });
    }

    let tmp = NamedTempFile::new()?;
    let mut file = tokio::fs::File::from_std(tmp.reopen()?);
    let mut stream = resp.bytes_stream();
    let mut bytes = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        bytes += chunk.len() as u64;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    info!(url, bytes, path = %tmp.path().display(), "download complete");
    Ok(tmp)
}
