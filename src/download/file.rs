use std::path::Path;

use futures_util::StreamExt;
use indicatif::ProgressBar;
use reqwest::Client;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::error::DownloadError;
use super::paths;

/// Stream `url` into `destination` through a `.part` sibling.
///
/// The final path only appears once the body has been fully written, so an
/// interrupted download never leaves a file the skip check would accept.
/// Returns the number of bytes written.
pub async fn download_file(
    client: &Client,
    url: &str,
    destination: &Path,
    bar: &ProgressBar,
) -> Result<u64, DownloadError> {
    let part_path = paths::part_path(destination);
    let result = attempt_download(client, url, destination, &part_path, bar).await;
    if result.is_err() {
        let _ = fs::remove_file(&part_path).await;
    }
    result
}

async fn attempt_download(
    client: &Client,
    url: &str,
    destination: &Path,
    part_path: &Path,
    bar: &ProgressBar,
) -> Result<u64, DownloadError> {
    let path_str = destination.display().to_string();
    let response = client.get(url).send().await.map_err(|e| DownloadError::Http {
        source: e,
        path: path_str.clone(),
        bytes_written: 0,
    })?;

    if !response.status().is_success() {
        return Err(DownloadError::HttpStatus {
            status: response.status().as_u16(),
            path: path_str,
        });
    }

    if let Some(len) = response.content_length() {
        bar.set_length(len);
    }

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(part_path)
        .await?;

    let mut bytes_written: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            tracing::warn!(
                "Body error for {} (bytes_so_far={}): {}",
                path_str,
                bytes_written,
                e
            );
            DownloadError::Http {
                source: e,
                path: path_str.clone(),
                bytes_written,
            }
        })?;
        file.write_all(&chunk).await?;
        bytes_written += chunk.len() as u64;
        bar.inc(chunk.len() as u64);
    }
    file.flush().await?;
    drop(file);

    fs::rename(part_path, destination).await?;
    Ok(bytes_written)
}
