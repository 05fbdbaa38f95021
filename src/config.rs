use std::path::PathBuf;

use anyhow::Context;

use crate::auth::endpoints::AUTHORITY_HOST;
use crate::auth::AuthConfig;
use crate::batch::BatchError;
use crate::cli::GlobalArgs;
use crate::download::{DownloadConfig, DEFAULT_WORKERS};
use crate::graph::source::FolderSource;
use crate::retry::RetryConfig;

/// Timeout for Graph metadata requests and download connection setup.
pub const HTTP_TIMEOUT_SECS: u64 = 60;

/// Application configuration, built once from the CLI and passed down.
#[derive(Debug)]
pub struct Config {
    pub directory: PathBuf,
    pub source: Option<FolderSource>,
    pub auth: AuthConfig,
    pub retry: RetryConfig,
    pub batch_count: usize,
    pub timeout_secs: u64,
    pub sequential: bool,
    pub no_progress_bar: bool,
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Config {
    pub fn from_cli(args: &GlobalArgs) -> anyhow::Result<Self> {
        if args.batches == 0 {
            return Err(BatchError::ZeroBatches.into());
        }

        Ok(Self {
            directory: expand_tilde(&args.directory),
            source: folder_source(args)?,
            auth: AuthConfig {
                client_id: args.client_id.clone().unwrap_or_default(),
                tenant: args.tenant.clone(),
                client_secret: args.client_secret.clone(),
                flow: args.auth_flow,
                redirect_uri: args.redirect_uri.clone(),
                token_cache: expand_tilde(&args.token_cache),
                authority_host: AUTHORITY_HOST.to_string(),
            },
            retry: RetryConfig {
                max_retries: args.max_retries,
                base_delay_secs: args.retry_delay,
                max_delay_secs: RetryConfig::default().max_delay_secs,
            },
            batch_count: args.batches,
            timeout_secs: HTTP_TIMEOUT_SECS,
            sequential: args.sequential,
            no_progress_bar: args.no_progress_bar,
        })
    }

    /// The folder whose files get batched; listing commands cannot run without one.
    pub fn require_source(&self) -> anyhow::Result<&FolderSource> {
        self.source.as_ref().context(
            "No folder selected. Pass --item-id [--drive-id], \
             --site-hostname/--site-path/--folder, or --folder for a path in your own drive \
             (the `browse` command prints these flags for any folder)",
        )
    }

    pub fn download_config(&self, workers: Option<usize>) -> DownloadConfig {
        DownloadConfig {
            directory: self.directory.clone(),
            workers: workers.unwrap_or(DEFAULT_WORKERS),
            sequential: self.sequential,
            no_progress_bar: self.no_progress_bar,
        }
    }
}

/// Pick the folder source from the CLI flags.
///
/// An explicit item id wins, then a SharePoint site, then a path in the
/// signed-in user's drive.
fn folder_source(args: &GlobalArgs) -> anyhow::Result<Option<FolderSource>> {
    if let Some(item_id) = &args.item_id {
        return Ok(Some(FolderSource::DriveItem {
            drive_id: args.drive_id.clone(),
            item_id: item_id.clone(),
        }));
    }
    if args.drive_id.is_some() {
        anyhow::bail!("--drive-id requires --item-id");
    }

    if let Some(hostname) = &args.site_hostname {
        let site_path = args
            .site_path
            .clone()
            .context("--site-hostname requires --site-path (e.g. /sites/research)")?;
        let folder = args
            .folder
            .clone()
            .context("--site-hostname requires --folder (path inside the document library)")?;
        return Ok(Some(FolderSource::Site {
            hostname: hostname.clone(),
            site_path,
            drive_name: args.drive_name.clone(),
            folder,
        }));
    }
    if args.site_path.is_some() {
        anyhow::bail!("--site-path requires --site-hostname");
    }

    Ok(args
        .folder
        .clone()
        .map(|folder| FolderSource::MyDrive { folder }))
}
