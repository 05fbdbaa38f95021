//! onedrive-batch-dl: download a large OneDrive/SharePoint folder in batches.
//!
//! The folder listing is split into N contiguous batches; each invocation
//! downloads one batch into `<directory>/batch_<n>` with a bounded worker
//! pool, and can later verify or repair it against the remote sizes.

#![warn(clippy::all)]

mod auth;
mod batch;
mod browse;
mod cli;
mod config;
mod download;
mod graph;
mod report;
pub mod retry;
mod types;
mod verify;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use cli::Command;
use config::Config;
use graph::{DriveApi, FileEntry, GraphClient};
use report::{format_size, VerifyReport};

/// Fetch the file listing of the configured folder.
async fn list_source(client: &GraphClient, config: &Config) -> anyhow::Result<Vec<FileEntry>> {
    let source = config.require_source()?;
    tracing::info!("Source folder: {}", source);
    let folder = graph::source::resolve(client, source)
        .await
        .context("Failed to resolve the source folder")?;
    tracing::info!("Listing files...");
    let entries = client
        .list_children(&folder)
        .await
        .context("Failed to list the source folder")?;
    tracing::info!("Found {} files", entries.len());
    Ok(entries)
}

/// Split the listing and pick one batch; an invalid number is reported and
/// yields `None`.
fn pick_batch(
    entries: &[FileEntry],
    batch_number: usize,
    batch_count: usize,
) -> Option<Vec<FileEntry>> {
    let batches = batch::split_into_batches(entries, batch_count);
    match batch::select_batch(&batches, batch_number, batch_count) {
        Ok(selected) => Some(selected.to_vec()),
        Err(e) => {
            tracing::error!("{}", e);
            None
        }
    }
}

fn print_batches(entries: &[FileEntry], batch_count: usize) {
    let batches = batch::split_into_batches(entries, batch_count);
    println!(
        "{} files in {} batches ({} requested)",
        entries.len(),
        batches.len(),
        batch_count
    );
    let mut first = 1;
    for (i, files) in batches.iter().enumerate() {
        if files.is_empty() {
            println!("  Batch {}: empty", i + 1);
            continue;
        }
        let bytes: u64 = files.iter().filter_map(|f| f.size).sum();
        println!(
            "  Batch {}: {} files (#{}-#{}), {}",
            i + 1,
            files.len(),
            first,
            first + files.len() - 1,
            format_size(Some(bytes))
        );
        first += files.len();
    }
}

async fn run_command(command: Command, config: &Config) -> anyhow::Result<()> {
    let token = auth::acquire_token(&config.auth)
        .await
        .context("Authentication failed")?;
    if command == Command::Auth {
        tracing::info!("Token cached at {}", config.auth.token_cache.display());
        return Ok(());
    }

    let client = GraphClient::new(&token, config.retry, config.timeout_secs)?;
    if command == Command::Browse {
        return browse::run(&client).await;
    }

    let entries = list_source(&client, config).await?;
    match command {
        Command::List => print_batches(&entries, config.batch_count),
        Command::Download { batch, workers } => {
            let Some(selected) = pick_batch(&entries, batch, config.batch_count) else {
                return Ok(());
            };
            download::download_batch(
                &client,
                &client.download_client(),
                &selected,
                batch,
                &config.download_config(workers),
            )
            .await?;
        }
        Command::Verify { batch } => {
            let Some(selected) = pick_batch(&entries, batch, config.batch_count) else {
                return Ok(());
            };
            let dir = download::paths::batch_dir(&config.directory, batch);
            let report = VerifyReport::new(batch, verify::verify_batch(&selected, &dir));
            report.log_summary();
            report.write_missing_manifest(&config.directory);
        }
        Command::Missing { batch, workers } => {
            let Some(selected) = pick_batch(&entries, batch, config.batch_count) else {
                return Ok(());
            };
            download::download_missing(
                &client,
                &client.download_client(),
                &selected,
                batch,
                &config.download_config(workers),
            )
            .await?;
        }
        Command::Browse | Command::Auth => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.global.log_level.as_filter())),
        )
        .init();

    let Some(command) = cli.effective_command() else {
        cli::Cli::command().print_help()?;
        anyhow::bail!("No command given");
    };
    let config = Config::from_cli(&cli.global)?;
    tracing::debug!(?config, "Configuration loaded");

    run_command(command, &config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(n: usize) -> Vec<FileEntry> {
        (0..n)
            .map(|i| FileEntry {
                id: format!("id{i}"),
                name: format!("f{i}.bin"),
                size: Some(10),
                parent: Default::default(),
            })
            .collect()
    }

    #[test]
    fn test_pick_batch_in_range() {
        let all = entries(10);
        let selected = pick_batch(&all, 2, 3).unwrap();
        assert_eq!(selected.len(), 3);
        assert_eq!(selected[0].name, "f4.bin");
    }

    #[test]
    fn test_pick_batch_out_of_range_is_none() {
        let all = entries(10);
        assert!(pick_batch(&all, 0, 3).is_none());
        assert!(pick_batch(&all, 4, 3).is_none());
        assert!(pick_batch(&[], 1, 3).is_none());
    }
}
