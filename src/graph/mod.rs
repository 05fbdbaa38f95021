//! Thin Microsoft Graph client for drive listings and download URLs.
//!
//! Everything the download core needs from Graph goes through the
//! [`DriveApi`] trait so the worker pool and verifier can be exercised
//! against an in-memory drive in tests.

pub mod error;
pub mod source;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, RETRY_AFTER};
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

pub use self::error::GraphError;
pub use self::types::{DriveItem, FileEntry, FolderRef, ItemInfo};
use self::types::{Drive, Page, Site};
use crate::retry::{self, RetryConfig};

pub const GRAPH_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Remote drive operations consumed by the download core and the browser.
#[async_trait::async_trait]
pub trait DriveApi: Send + Sync {
    /// All children (files and folders) of a folder, every page followed.
    async fn list_folder(&self, folder: &FolderRef) -> Result<Vec<DriveItem>, GraphError>;

    /// Children of a path inside the signed-in user's drive ("" is the root).
    async fn list_path(&self, path: &str) -> Result<Vec<DriveItem>, GraphError>;

    async fn list_shared_with_me(&self) -> Result<Vec<DriveItem>, GraphError>;

    async fn get_item_info(
        &self,
        drive_id: Option<&str>,
        item_id: &str,
    ) -> Result<ItemInfo, GraphError>;

    /// File entries of a folder in listing order; sub-folders are dropped.
    async fn list_children(&self, folder: &FolderRef) -> Result<Vec<FileEntry>, GraphError> {
        let items = self.list_folder(folder).await?;
        Ok(items
            .into_iter()
            .filter(|item| !item.is_folder())
            .map(FileEntry::from)
            .collect())
    }

    /// Resolve a fresh, pre-authenticated download URL for a file.
    ///
    /// Always re-queried rather than taken from the listing: listing URLs
    /// expire while long batches are still queued.
    async fn get_download_url(&self, entry: &FileEntry) -> Result<String, GraphError> {
        let info = self.get_item_info(entry.drive_id(), &entry.id).await?;
        info.download_url
            .ok_or_else(|| GraphError::NoDownloadUrl(entry.name.clone()))
    }
}

/// Graph client holding a read-only bearer token.
#[derive(Clone)]
pub struct GraphClient {
    http: Client,
    download: Client,
    base_url: Url,
    token: Arc<str>,
    retry: RetryConfig,
}

impl std::fmt::Debug for GraphClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"<redacted>")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl GraphClient {
    pub fn new(token: &str, retry: RetryConfig, timeout_secs: u64) -> Result<Self, GraphError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        // Download bodies can take far longer than any metadata call, so the
        // byte client only bounds connection setup.
        let download = Client::builder()
            .connect_timeout(Duration::from_secs(timeout_secs))
            .build()?;
        let base_url =
            Url::parse(GRAPH_BASE).map_err(|_| GraphError::InvalidUrl(GRAPH_BASE.into()))?;
        Ok(Self {
            http,
            download,
            base_url,
            token: Arc::from(token),
            retry,
        })
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base: &str) -> Result<Self, GraphError> {
        self.base_url = Url::parse(base).map_err(|_| GraphError::InvalidUrl(base.into()))?;
        Ok(self)
    }

    /// Client used for streaming file bodies from pre-authenticated URLs.
    pub fn download_client(&self) -> Client {
        self.download.clone()
    }

    fn endpoint<I, S>(&self, segments: I) -> Result<Url, GraphError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GraphError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn item_endpoint(&self, drive_id: Option<&str>, item_id: &str) -> Result<Url, GraphError> {
        match drive_id {
            Some(drive) => self.endpoint(["drives", drive, "items", item_id]),
            None => self.endpoint(["me", "drive", "items", item_id]),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, GraphError> {
        retry::retry_with_backoff(&self.retry, GraphError::retry_action, || {
            self.get_json_once(url)
        })
        .await
    }

    async fn get_json_once<T: DeserializeOwned>(&self, url: &str) -> Result<T, GraphError> {
        tracing::debug!("GET {}", url);
        let response = self
            .http
            .get(url)
            .bearer_auth(&*self.token)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 {
            return Err(GraphError::Unauthorized);
        }
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            let message = response.text().await.unwrap_or_default();
            return Err(GraphError::Api {
                status: status.as_u16(),
                message,
                retry_after,
            });
        }

        Ok(response.json::<T>().await?)
    }

    /// Follow `@odata.nextLink` until the collection is exhausted.
    async fn collect_pages<T: DeserializeOwned>(&self, first: Url) -> Result<Vec<T>, GraphError> {
        let mut items = Vec::new();
        let mut next = Some(first.to_string());
        while let Some(url) = next.take() {
            let page: Page<T> = self.get_json(&url).await?;
            items.extend(page.value);
            next = page.next_link;
        }
        Ok(items)
    }

    /// `GET /sites/{hostname}:{site_path}`
    pub async fn get_site(&self, hostname: &str, site_path: &str) -> Result<Site, GraphError> {
        let parts = path_parts(site_path);
        let url = if parts.is_empty() {
            self.endpoint(["sites", hostname])?
        } else {
            let mut segments = vec!["sites".to_string(), format!("{}:", hostname)];
            segments.extend(parts.iter().map(|p| p.to_string()));
            self.endpoint(segments)?
        };
        self.get_json(url.as_str()).await
    }

    pub async fn list_site_drives(&self, site_id: &str) -> Result<Vec<Drive>, GraphError> {
        let url = self.endpoint(["sites", site_id, "drives"])?;
        self.collect_pages(url).await
    }

    pub async fn list_drive_root(&self, drive_id: &str) -> Result<Vec<DriveItem>, GraphError> {
        let url = self.endpoint(["drives", drive_id, "root", "children"])?;
        self.collect_pages(url).await
    }

    /// Metadata of an item addressed by path inside the signed-in user's drive.
    pub async fn get_item_by_path(&self, path: &str) -> Result<DriveItem, GraphError> {
        let url = self.endpoint(root_path_segments(path, None))?;
        self.get_json(url.as_str()).await
    }
}

#[async_trait::async_trait]
impl DriveApi for GraphClient {
    async fn list_folder(&self, folder: &FolderRef) -> Result<Vec<DriveItem>, GraphError> {
        let mut url = self.item_endpoint(folder.drive_id.as_deref(), &folder.item_id)?;
        url.path_segments_mut()
            .map_err(|_| GraphError::InvalidUrl(self.base_url.to_string()))?
            .push("children");
        self.collect_pages(url).await
    }

    async fn list_path(&self, path: &str) -> Result<Vec<DriveItem>, GraphError> {
        let url = self.endpoint(root_path_segments(path, Some("children")))?;
        self.collect_pages(url).await
    }

    async fn list_shared_with_me(&self) -> Result<Vec<DriveItem>, GraphError> {
        let url = self.endpoint(["me", "drive", "sharedWithMe"])?;
        self.collect_pages(url).await
    }

    async fn get_item_info(
        &self,
        drive_id: Option<&str>,
        item_id: &str,
    ) -> Result<ItemInfo, GraphError> {
        let url = self.item_endpoint(drive_id, item_id)?;
        let item: DriveItem = self.get_json(url.as_str()).await?;
        Ok(ItemInfo::from(item))
    }
}

fn path_parts(path: &str) -> Vec<&str> {
    path.split('/').filter(|p| !p.is_empty()).collect()
}

/// Segments for Graph's path addressing: `/me/drive/root:/{path}:[/suffix]`.
fn root_path_segments(path: &str, suffix: Option<&str>) -> Vec<String> {
    let parts = path_parts(path);
    let mut segments = vec!["me".to_string(), "drive".to_string()];
    match parts.split_last() {
        None => segments.push("root".to_string()),
        Some((last, init)) => {
            segments.push("root:".to_string());
            segments.extend(init.iter().map(|p| p.to_string()));
            segments.push(format!("{}:", last));
        }
    }
    if let Some(suffix) = suffix {
        segments.push(suffix.to_string());
    }
    segments
}
