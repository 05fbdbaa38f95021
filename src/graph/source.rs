//! Resolution of the configured logical folder to a concrete [`FolderRef`].

use super::error::GraphError;
use super::types::{DriveItem, FolderRef};
use super::{DriveApi, GraphClient};

/// Where the batch folder lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderSource {
    /// A folder inside a SharePoint site's document library.
    Site {
        hostname: String,
        site_path: String,
        /// Preferred library name; matched case-insensitively as a substring.
        drive_name: String,
        folder: String,
    },
    /// A folder addressed directly by id (shared items).
    DriveItem {
        drive_id: Option<String>,
        item_id: String,
    },
    /// A folder path inside the signed-in user's drive.
    MyDrive { folder: String },
}

impl std::fmt::Display for FolderSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FolderSource::Site {
                hostname,
                site_path,
                folder,
                ..
            } => write!(f, "{}{} /{}", hostname, site_path, folder.trim_matches('/')),
            FolderSource::DriveItem {
                drive_id: Some(drive_id),
                item_id,
            } => write!(f, "drive {} item {}", drive_id, item_id),
            FolderSource::DriveItem {
                drive_id: None,
                item_id,
            } => write!(f, "item {}", item_id),
            FolderSource::MyDrive { folder } => write!(f, "/{}", folder.trim_matches('/')),
        }
    }
}

/// Resolve a folder source to the folder whose children get batched.
pub async fn resolve(client: &GraphClient, source: &FolderSource) -> Result<FolderRef, GraphError> {
    match source {
        FolderSource::DriveItem { drive_id, item_id } => Ok(FolderRef {
            drive_id: drive_id.clone(),
            item_id: item_id.clone(),
        }),
        FolderSource::MyDrive { folder } => {
            let item = client.get_item_by_path(folder).await?;
            if !item.is_folder() {
                return Err(GraphError::NotFound(format!(
                    "'{}' is not a folder",
                    folder
                )));
            }
            Ok(FolderRef {
                drive_id: item.drive_id().map(str::to_string),
                item_id: item.id,
            })
        }
        FolderSource::Site {
            hostname,
            site_path,
            drive_name,
            folder,
        } => {
            tracing::info!("Resolving SharePoint site {}{}", hostname, site_path);
            let site = client.get_site(hostname, site_path).await?;
            tracing::info!(
                site_id = %site.id,
                "Resolved site {}",
                site.display_name.as_deref().unwrap_or(site_path)
            );

            let drive_id = pick_drive(client, &site.id, drive_name).await?;
            walk_folder_path(client, &drive_id, folder).await
        }
    }
}

async fn pick_drive(
    client: &GraphClient,
    site_id: &str,
    preferred: &str,
) -> Result<String, GraphError> {
    let drives = client.list_site_drives(site_id).await?;
    for drive in &drives {
        tracing::debug!(
            "Found document library: {} ({})",
            drive.name.as_deref().unwrap_or("(unnamed)"),
            drive.id
        );
    }

    let wanted = preferred.to_lowercase();
    if let Some(drive) = drives.iter().find(|d| {
        d.name
            .as_deref()
            .is_some_and(|n| n.to_lowercase().contains(&wanted))
    }) {
        tracing::info!(
            "Using document library '{}'",
            drive.name.as_deref().unwrap_or_default()
        );
        return Ok(drive.id.clone());
    }

    match drives.first() {
        Some(drive) => {
            tracing::warn!(
                "No document library matching '{}', using the first one ({})",
                preferred,
                drive.id
            );
            Ok(drive.id.clone())
        }
        None => Err(GraphError::NotFound(format!(
            "site {} has no document libraries",
            site_id
        ))),
    }
}

/// Walk `folder` one segment at a time from the drive root.
async fn walk_folder_path(
    client: &GraphClient,
    drive_id: &str,
    folder: &str,
) -> Result<FolderRef, GraphError> {
    let segments: Vec<&str> = folder.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Err(GraphError::NotFound(
            "a folder path inside the document library is required".into(),
        ));
    }

    let mut current: Option<String> = None;
    let mut walked = String::new();
    for segment in segments {
        if !walked.is_empty() {
            walked.push('/');
        }
        walked.push_str(segment);

        let children = match &current {
            None => client.list_drive_root(drive_id).await?,
            Some(item_id) => {
                client
                    .list_folder(&FolderRef {
                        drive_id: Some(drive_id.to_string()),
                        item_id: item_id.clone(),
                    })
                    .await?
            }
        };

        match match_folder(&children, segment) {
            Some(found) => {
                tracing::debug!("Found folder {} ({})", walked, found.id);
                current = Some(found.id.clone());
            }
            None => {
                let available: Vec<&str> = children
                    .iter()
                    .filter(|c| c.is_folder())
                    .map(|c| c.display_name())
                    .collect();
                return Err(GraphError::NotFound(format!(
                    "folder '{}' (available: {})",
                    walked,
                    available.join(", ")
                )));
            }
        }
    }

    // segments was non-empty, so at least one folder matched
    let item_id = current.ok_or_else(|| GraphError::NotFound(folder.to_string()))?;
    Ok(FolderRef {
        drive_id: Some(drive_id.to_string()),
        item_id,
    })
}

/// Exact case-insensitive name match first, then case-insensitive substring.
fn match_folder<'a>(children: &'a [DriveItem], segment: &str) -> Option<&'a DriveItem> {
    let wanted = segment.to_lowercase();
    let folders = || children.iter().filter(|c| c.is_folder());
    folders()
        .find(|c| c.display_name().to_lowercase() == wanted)
        .or_else(|| folders().find(|c| c.display_name().to_lowercase().contains(&wanted)))
}
