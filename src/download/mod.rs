//! Download engine: plans a batch against the local disk, then drains the
//! remaining work through a bounded pool of concurrent downloads.
//!
//! Per-file failures are recorded and reported; they never stop the pool and
//! are never retried. Re-running the `missing` command is the recovery path.

pub mod error;
pub mod file;
pub mod paths;
pub mod progress;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use futures_util::stream::{self, StreamExt};
use indicatif::ProgressBar;
use reqwest::Client;

use self::error::DownloadError;
use self::progress::Progress;
use crate::graph::{DriveApi, FileEntry};
use crate::report::{self, BatchReport, RepairReport, VerifyReport};
use crate::verify::{self, VerificationResult};

pub const MIN_WORKERS: usize = 1;
pub const MAX_WORKERS: usize = 20;
pub const DEFAULT_WORKERS: usize = 5;

/// Pause between tasks in sequential mode.
pub const SEQUENTIAL_DELAY: Duration = Duration::from_millis(500);

/// Clamp a requested worker count into `[MIN_WORKERS, MAX_WORKERS]`.
pub fn clamp_workers(requested: usize) -> usize {
    let clamped = requested.clamp(MIN_WORKERS, MAX_WORKERS);
    if clamped != requested {
        tracing::warn!(
            "Worker count {} out of range, using {} (allowed {}-{})",
            requested,
            clamped,
            MIN_WORKERS,
            MAX_WORKERS
        );
    }
    clamped
}

/// Subset of application config consumed by the download engine.
/// Decoupled from CLI parsing so the engine can be tested independently.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub(crate) directory: PathBuf,
    pub(crate) workers: usize,
    pub(crate) sequential: bool,
    pub(crate) no_progress_bar: bool,
}

impl DownloadConfig {
    fn pool_options(&self) -> PoolOptions {
        PoolOptions::new(self.workers, self.sequential, self.no_progress_bar)
    }
}

/// How the pool drains its queue.
#[derive(Debug, Clone, Copy)]
pub struct PoolOptions {
    pub workers: usize,
    pub delay_between: Option<Duration>,
    pub no_progress_bar: bool,
}

impl PoolOptions {
    pub fn new(workers: usize, sequential: bool, no_progress_bar: bool) -> Self {
        if sequential {
            Self {
                workers: 1,
                delay_between: Some(SEQUENTIAL_DELAY),
                no_progress_bar,
            }
        } else {
            Self {
                workers: clamp_workers(workers),
                delay_between: None,
                no_progress_bar,
            }
        }
    }
}

/// One file still to be fetched.
#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub entry: FileEntry,
    pub destination: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Succeeded { bytes: u64 },
    Failed(String),
    SkippedExisting,
}

/// Split a batch into work and entries already present under `dir`.
///
/// Presence is decided by path alone; contents and sizes are not examined.
pub fn plan_tasks(entries: &[FileEntry], dir: &Path) -> (Vec<DownloadTask>, Vec<FileEntry>) {
    let mut tasks = Vec::new();
    let mut skipped = Vec::new();
    for entry in entries {
        let destination = paths::destination_for(dir, entry);
        if destination.exists() {
            tracing::debug!("Skipping existing {}", destination.display());
            skipped.push(entry.clone());
        } else {
            tasks.push(DownloadTask {
                entry: entry.clone(),
                destination,
            });
        }
    }
    (tasks, skipped)
}

/// Run every task through at most `options.workers` concurrent downloads.
///
/// Returns once all tasks have finished, in completion order.
pub async fn run_pool(
    api: &dyn DriveApi,
    client: &Client,
    tasks: Vec<DownloadTask>,
    options: &PoolOptions,
) -> Vec<(FileEntry, DownloadOutcome)> {
    let total = tasks.len();
    if total == 0 {
        return Vec::new();
    }

    let progress = Progress::new(options.no_progress_bar, total as u64);
    let progress_ref = &progress;
    let delay = options.delay_between;

    let download_stream = stream::iter(tasks.into_iter().enumerate())
        .map(|(index, task)| async move {
            if let Some(delay) = delay {
                if index > 0 {
                    tokio::time::sleep(delay).await;
                }
            }
            let bar = progress_ref.file_bar(&task.entry);
            let result = download_task(api, client, &task, &bar).await;
            progress_ref.finish_file(&bar);
            (task, result)
        })
        .buffer_unordered(options.workers.max(1));

    tokio::pin!(download_stream);

    let started = Instant::now();
    let mut results = Vec::with_capacity(total);
    while let Some((task, result)) = download_stream.next().await {
        let outcome = match result {
            Ok(bytes) => {
                progress.suspend(|| {
                    tracing::debug!(
                        "Downloaded {} ({})",
                        task.destination.display(),
                        report::format_size(Some(bytes))
                    );
                });
                DownloadOutcome::Succeeded { bytes }
            }
            Err(e) => {
                progress.suspend(|| {
                    tracing::error!("Download failed: {}: {}", task.entry.name, e);
                });
                DownloadOutcome::Failed(e.to_string())
            }
        };
        results.push((task.entry, outcome));
        progress.inc();

        let done = results.len();
        progress.suspend(|| {
            tracing::info!(
                "Completed {}/{} ({:.1}%)",
                done,
                total,
                report::percent(done, total)
            );
        });
    }

    progress.finish();
    tracing::debug!("Pool drained {} tasks in {}", total, format_duration(started.elapsed()));
    results
}

/// Resolve a fresh URL and stream one file to its destination.
async fn download_task(
    api: &dyn DriveApi,
    client: &Client,
    task: &DownloadTask,
    bar: &ProgressBar,
) -> Result<u64, DownloadError> {
    if let Some(parent) = task.destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let url = api.get_download_url(&task.entry).await?;
    tracing::debug!(
        size_bytes = task.entry.size.unwrap_or(0),
        path = %task.destination.display(),
        "downloading",
    );
    file::download_file(client, &url, &task.destination, bar).await
}

/// Download every file of `batch` that is not yet under `<directory>/batch_<n>`.
pub async fn download_batch(
    api: &dyn DriveApi,
    client: &Client,
    batch: &[FileEntry],
    batch_number: usize,
    config: &DownloadConfig,
) -> Result<BatchReport> {
    let dir = paths::batch_dir(&config.directory, batch_number);
    tokio::fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let (tasks, skipped) = plan_tasks(batch, &dir);
    let options = config.pool_options();
    tracing::info!(
        "Batch {}: {} files, {} already present, {} to download ({} workers{})",
        batch_number,
        batch.len(),
        skipped.len(),
        tasks.len(),
        options.workers,
        if options.delay_between.is_some() {
            ", sequential"
        } else {
            ""
        }
    );

    let started = Instant::now();
    let mut outcomes: Vec<(FileEntry, DownloadOutcome)> = skipped
        .into_iter()
        .map(|entry| (entry, DownloadOutcome::SkippedExisting))
        .collect();
    outcomes.extend(run_pool(api, client, tasks, &options).await);

    let report = BatchReport::from_outcomes(batch_number, batch.len(), outcomes);
    report.log_summary();
    tracing::info!("  elapsed: {}", format_duration(started.elapsed()));
    report.write_failed_manifest(&config.directory);
    Ok(report)
}

/// Re-fetch files of a batch that are absent or whose size is off.
///
/// Size-mismatched files are deleted before the pool starts; a file that
/// cannot be deleted is left alone and not re-downloaded.
pub async fn download_missing(
    api: &dyn DriveApi,
    client: &Client,
    batch: &[FileEntry],
    batch_number: usize,
    config: &DownloadConfig,
) -> Result<RepairReport> {
    let dir = paths::batch_dir(&config.directory, batch_number);
    let results = verify::verify_batch(batch, &dir);

    let verification = VerifyReport::new(batch_number, results.clone());
    verification.log_summary();
    verification.write_missing_manifest(&config.directory);

    let mut to_fetch = Vec::new();
    for (entry, result) in results {
        match result {
            VerificationResult::Ok => {}
            VerificationResult::Missing => to_fetch.push(entry),
            VerificationResult::SizeMismatch { .. } => {
                let path = paths::destination_for(&dir, &entry);
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => {
                        tracing::info!("Deleted incomplete {} ({})", path.display(), result.reason());
                        to_fetch.push(entry);
                    }
                    Err(e) => {
                        tracing::error!("Could not delete {}: {}; skipping", path.display(), e);
                    }
                }
            }
        }
    }

    if to_fetch.is_empty() {
        tracing::info!("Batch {}: nothing missing", batch_number);
        return Ok(RepairReport::default());
    }

    tokio::fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    // A path that exists without being a regular file (e.g. a directory)
    // verifies as missing but cannot be downloaded over.
    let (tasks, blocked) = plan_tasks(&to_fetch, &dir);
    let mut outcomes: Vec<(FileEntry, DownloadOutcome)> = blocked
        .into_iter()
        .map(|entry| {
            let path = paths::destination_for(&dir, &entry);
            tracing::error!("{} exists but is not a regular file; skipping", path.display());
            (
                entry,
                DownloadOutcome::Failed(format!("{} is not a regular file", path.display())),
            )
        })
        .collect();

    tracing::info!(
        "Batch {}: downloading {} missing files",
        batch_number,
        tasks.len()
    );
    outcomes.extend(run_pool(api, client, tasks, &config.pool_options()).await);

    let report = RepairReport::from_outcomes(outcomes);
    report.log_summary();
    Ok(report)
}

fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {:02}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}
