//! Interactive browser over the signed-in user's drive and items shared with
//! them. Used to find the ids/paths to pass as a download source.

use std::fmt::Write as _;
use std::io::{self, Write};
use std::str::FromStr;

use thiserror::Error;

use crate::graph::types::DriveItem;
use crate::graph::{DriveApi, FolderRef, GraphError};
use crate::report::format_size;

/// Where the browser currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// A path inside the signed-in user's drive; `""` is the root.
    Personal { path: String },
    /// The shared-with-me list.
    SharedList,
    /// A shared folder addressed by item id in the user's own drive view.
    SharedById { item_id: String, path: String },
    /// A shared folder living in another user's drive.
    SharedRemote {
        drive_id: String,
        item_id: String,
        path: String,
    },
}

impl Location {
    pub fn home() -> Self {
        Location::Personal {
            path: String::new(),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Location::Personal { path } if path.is_empty() => "/ (my drive)".to_string(),
            Location::Personal { path } => format!("/{} (my drive)", path),
            Location::SharedList => "shared with me".to_string(),
            Location::SharedById { path, .. } | Location::SharedRemote { path, .. } => {
                format!("shared: {}", path)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseCommand {
    /// `cd <n>`, 1-based.
    Enter(usize),
    /// `cd ..`
    Up,
    Shared,
    Home,
    Path,
    Download,
    Exit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BrowseError {
    #[error("Unknown command '{0}' (cd <n>, cd .., shared, home, path, download, exit)")]
    UnknownCommand(String),

    #[error("'cd' needs a number or '..'")]
    BadIndex,

    #[error("There are no folders here")]
    NoFolders,

    #[error("No entry numbered {index} (there are {count})")]
    NoSuchEntry { index: usize, count: usize },

    #[error("'{0}' is not a folder")]
    NotAFolder(String),
}

impl FromStr for BrowseCommand {
    type Err = BrowseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let lower = input.to_lowercase();
        match lower.as_str() {
            "shared" => return Ok(BrowseCommand::Shared),
            "home" => return Ok(BrowseCommand::Home),
            "path" => return Ok(BrowseCommand::Path),
            "download" => return Ok(BrowseCommand::Download),
            "exit" | "quit" | "q" => return Ok(BrowseCommand::Exit),
            _ => {}
        }
        match lower.strip_prefix("cd") {
            Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => {
                let arg = rest.trim();
                if arg == ".." {
                    return Ok(BrowseCommand::Up);
                }
                match arg.parse::<usize>() {
                    Ok(n) if n >= 1 => Ok(BrowseCommand::Enter(n)),
                    _ => Err(BrowseError::BadIndex),
                }
            }
            _ => Err(BrowseError::UnknownCommand(input.to_string())),
        }
    }
}

/// What is shown at a location.
#[derive(Debug, Clone)]
pub enum Listing {
    Shared(Vec<DriveItem>),
    Folder {
        folders: Vec<DriveItem>,
        files: Vec<DriveItem>,
    },
}

impl Listing {
    /// Split a folder's children into folders and files, each sorted by name.
    pub fn folder(items: Vec<DriveItem>) -> Self {
        let (mut folders, mut files): (Vec<_>, Vec<_>) =
            items.into_iter().partition(DriveItem::is_folder);
        folders.sort_by(|a, b| a.display_name().cmp(b.display_name()));
        files.sort_by(|a, b| a.display_name().cmp(b.display_name()));
        Listing::Folder { folders, files }
    }
}

pub async fn list_location(api: &dyn DriveApi, location: &Location) -> Result<Listing, GraphError> {
    let items = match location {
        Location::SharedList => return Ok(Listing::Shared(api.list_shared_with_me().await?)),
        Location::Personal { path } => api.list_path(path).await?,
        Location::SharedById { item_id, .. } => {
            api.list_folder(&FolderRef {
                drive_id: None,
                item_id: item_id.clone(),
            })
            .await?
        }
        Location::SharedRemote {
            drive_id, item_id, ..
        } => {
            api.list_folder(&FolderRef {
                drive_id: Some(drive_id.clone()),
                item_id: item_id.clone(),
            })
            .await?
        }
    };
    Ok(Listing::folder(items))
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", path, name)
    }
}

/// Target of a shared-with-me entry or a folder inside a shared tree.
fn shared_target(item: &DriveItem, path: String, fallback_drive: Option<&str>) -> Location {
    if let Some(remote) = &item.remote_item {
        if let Some(drive_id) = remote.drive_id() {
            return Location::SharedRemote {
                drive_id: drive_id.to_string(),
                item_id: remote.id.clone(),
                path,
            };
        }
        return Location::SharedById {
            item_id: remote.id.clone(),
            path,
        };
    }
    match item.drive_id().or(fallback_drive) {
        Some(drive_id) => Location::SharedRemote {
            drive_id: drive_id.to_string(),
            item_id: item.id.clone(),
            path,
        },
        None => Location::SharedById {
            item_id: item.id.clone(),
            path,
        },
    }
}

/// Apply a navigation command. Non-navigation commands leave the location
/// unchanged.
pub fn navigate(
    location: &Location,
    command: &BrowseCommand,
    listing: &Listing,
) -> Result<Location, BrowseError> {
    match command {
        BrowseCommand::Home => Ok(Location::home()),
        BrowseCommand::Shared => Ok(Location::SharedList),
        BrowseCommand::Up => Ok(match location {
            Location::Personal { path } => Location::Personal {
                path: path
                    .rsplit_once('/')
                    .map(|(parent, _)| parent.to_string())
                    .unwrap_or_default(),
            },
            Location::SharedList => Location::home(),
            Location::SharedById { .. } | Location::SharedRemote { .. } => Location::SharedList,
        }),
        BrowseCommand::Enter(n) => enter(location, *n, listing),
        BrowseCommand::Path | BrowseCommand::Download | BrowseCommand::Exit => Ok(location.clone()),
    }
}

fn enter(location: &Location, n: usize, listing: &Listing) -> Result<Location, BrowseError> {
    let pick = |items: &[DriveItem]| -> Result<DriveItem, BrowseError> {
        if items.is_empty() {
            return Err(BrowseError::NoFolders);
        }
        n.checked_sub(1)
            .and_then(|i| items.get(i))
            .cloned()
            .ok_or(BrowseError::NoSuchEntry {
                index: n,
                count: items.len(),
            })
    };

    match (location, listing) {
        (_, Listing::Shared(items)) => {
            let item = pick(items)?;
            if !item.is_folder() {
                return Err(BrowseError::NotAFolder(item.display_name().to_string()));
            }
            let path = item.display_name().to_string();
            Ok(shared_target(&item, path, None))
        }
        (Location::Personal { path }, Listing::Folder { folders, .. }) => {
            let folder = pick(folders)?;
            Ok(Location::Personal {
                path: join(path, folder.display_name()),
            })
        }
        (Location::SharedRemote { drive_id, path, .. }, Listing::Folder { folders, .. }) => {
            let folder = pick(folders)?;
            let path = join(path, folder.display_name());
            Ok(shared_target(&folder, path, Some(drive_id)))
        }
        (Location::SharedById { path, .. }, Listing::Folder { folders, .. }) => {
            let folder = pick(folders)?;
            let path = join(path, folder.display_name());
            Ok(shared_target(&folder, path, None))
        }
        (Location::SharedList, Listing::Folder { folders, .. }) => {
            // A folder listing is never produced for the shared list.
            let folder = pick(folders)?;
            Ok(shared_target(&folder, folder.display_name().to_string(), None))
        }
    }
}

/// CLI flags that select `location` as the download source.
pub fn download_hint(location: &Location) -> Option<String> {
    match location {
        Location::SharedList => None,
        Location::Personal { path } if path.is_empty() => Some("--folder /".to_string()),
        Location::Personal { path } => Some(format!("--folder \"{}\"", path)),
        Location::SharedById { item_id, .. } => Some(format!("--item-id {}", item_id)),
        Location::SharedRemote {
            drive_id, item_id, ..
        } => Some(format!("--drive-id {} --item-id {}", drive_id, item_id)),
    }
}

pub fn render(location: &Location, listing: &Listing) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n=== {} ===\n", location.describe());
    match listing {
        Listing::Shared(items) => {
            if items.is_empty() {
                let _ = writeln!(out, "  (nothing shared with you)");
            }
            for (i, item) in items.iter().enumerate() {
                let kind = if item.is_folder() { "[dir] " } else { "[file]" };
                let shared_by = item
                    .remote_item
                    .as_ref()
                    .and_then(|r| r.shared_by())
                    .unwrap_or("unknown user");
                let _ = writeln!(
                    out,
                    "  {}. {} {} (shared by {})",
                    i + 1,
                    kind,
                    item.display_name(),
                    shared_by
                );
            }
        }
        Listing::Folder { folders, files } => {
            let _ = writeln!(out, "Folders:");
            if folders.is_empty() {
                let _ = writeln!(out, "  (none)");
            }
            for (i, folder) in folders.iter().enumerate() {
                let _ = writeln!(out, "  {}. {}/", i + 1, folder.display_name());
            }
            let _ = writeln!(out, "\nFiles:");
            if files.is_empty() {
                let _ = writeln!(out, "  (none)");
            }
            for file in files {
                let _ = writeln!(out, "  - {} ({})", file.display_name(), format_size(file.size));
            }
        }
    }
    let _ = write!(
        out,
        "\nCommands: cd <n> | cd .. | shared | home | path | download | exit"
    );
    out
}

async fn prompt() -> io::Result<Option<String>> {
    tokio::task::spawn_blocking(|| {
        print!("\n> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    })
    .await
    .map_err(io::Error::other)?
}

/// Run the browser until `exit` or end of input.
pub async fn run(api: &dyn DriveApi) -> anyhow::Result<()> {
    let mut location = Location::home();
    loop {
        let listing = match list_location(api, &location).await {
            Ok(listing) => listing,
            Err(GraphError::Unauthorized) => return Err(GraphError::Unauthorized.into()),
            Err(e) if location == Location::home() => return Err(e.into()),
            Err(e) => {
                tracing::error!("Could not list {}: {}", location.describe(), e);
                location = navigate(&location, &BrowseCommand::Up, &Listing::Shared(Vec::new()))?;
                continue;
            }
        };
        println!("{}", render(&location, &listing));

        let Some(line) = prompt().await? else {
            break;
        };
        if line.is_empty() {
            continue;
        }
        let command = match line.parse::<BrowseCommand>() {
            Ok(c) => c,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match command {
            BrowseCommand::Exit => break,
            BrowseCommand::Path => println!("\nCurrent location: {}", location.describe()),
            BrowseCommand::Download => match download_hint(&location) {
                Some(flags) => {
                    println!("\nDownload this folder with:");
                    println!("  onedrive-batch-dl list {}", flags);
                    println!("  onedrive-batch-dl <BATCH> [WORKERS] {}", flags);
                }
                None => println!("\nSelect a shared item first (cd <n>)"),
            },
            nav => match navigate(&location, &nav, &listing) {
                Ok(next) => location = next,
                Err(e) => println!("{}", e),
            },
        }
    }
    Ok(())
}
