use clap::{Args, Parser, Subcommand};

use crate::types::*;

#[derive(Parser, Debug)]
#[command(
    name = "onedrive-batch-dl",
    version,
    about = "Download one batch of a OneDrive/SharePoint folder at a time",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    /// Batch to download (1-based); shorthand for `download <BATCH> [WORKERS]`
    pub batch: Option<usize>,

    /// Concurrent downloads (1-20, default 5)
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Download every file of one batch that is not on disk yet
    Download {
        batch: usize,
        workers: Option<usize>,
    },
    /// Show how the folder splits into batches
    List,
    /// Check a downloaded batch for missing or truncated files
    Verify { batch: usize },
    /// Re-download files of a batch that are missing or have the wrong size
    Missing {
        batch: usize,
        workers: Option<usize>,
    },
    /// Interactively browse your drive and items shared with you
    Browse,
    /// Sign in and cache a token without downloading anything
    Auth,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Local root directory; batch N goes to <DIRECTORY>/batch_N
    #[arg(short = 'd', long, global = true, default_value = "downloads")]
    pub directory: String,

    /// Number of batches the folder listing is split into
    #[arg(long, global = true, default_value_t = crate::batch::DEFAULT_BATCH_COUNT)]
    pub batches: usize,

    /// Token cache file
    #[arg(long, global = true, default_value = "token_cache.json")]
    pub token_cache: String,

    /// Azure AD application (client) id
    #[arg(long, global = true, env = "GRAPH_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Tenant: common, organizations, consumers, a tenant id or domain
    #[arg(long, global = true, env = "GRAPH_TENANT_ID", default_value = "common")]
    pub tenant: String,

    /// Client secret for the authorization-code flow.
    /// WARNING: passing via --client-secret is visible in process listings.
    /// Prefer the GRAPH_CLIENT_SECRET environment variable instead.
    #[arg(long, global = true, env = "GRAPH_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Interactive sign-in flow
    #[arg(long, global = true, value_enum, default_value = "device-code")]
    pub auth_flow: AuthFlow,

    /// Redirect URI registered for the authorization-code flow
    #[arg(long, global = true, default_value = "http://localhost")]
    pub redirect_uri: String,

    /// SharePoint host, e.g. contoso.sharepoint.com
    #[arg(long, global = true)]
    pub site_hostname: Option<String>,

    /// Server-relative site path, e.g. /sites/research
    #[arg(long, global = true)]
    pub site_path: Option<String>,

    /// Preferred document library (matched case-insensitively as a substring)
    #[arg(long, global = true, default_value = "datasets")]
    pub drive_name: String,

    /// Folder path inside the library, or inside your own drive without --site-hostname
    #[arg(long, global = true)]
    pub folder: Option<String>,

    /// Drive id of a shared folder (use with --item-id)
    #[arg(long, global = true)]
    pub drive_id: Option<String>,

    /// Item id of the folder to batch
    #[arg(long, global = true)]
    pub item_id: Option<String>,

    /// One download at a time with a short pause between files
    #[arg(long, global = true)]
    pub sequential: bool,

    /// Max retries for throttled or failed Graph metadata requests (0 = no retries)
    #[arg(long, global = true, default_value_t = 3)]
    pub max_retries: u32,

    /// Initial retry delay in seconds
    #[arg(long, global = true, default_value_t = 2)]
    pub retry_delay: u64,

    /// Disable progress bars
    #[arg(long, global = true)]
    pub no_progress_bar: bool,

    /// Log level
    #[arg(long, global = true, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

impl Cli {
    /// The command to run: an explicit subcommand, or the bare
    /// `<batch> [workers]` shorthand for `download`.
    pub fn effective_command(&self) -> Option<Command> {
        if let Some(command) = &self.command {
            return Some(command.clone());
        }
        self.batch.map(|batch| Command::Download {
            batch,
            workers: self.workers,
        })
    }
}
