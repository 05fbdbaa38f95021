use serde::{Deserialize, Serialize};

/// Location of an item's parent as reported by Graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentReference {
    #[serde(default)]
    pub drive_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

/// Raw `driveItem` resource. Only the facets this tool reads are kept.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub folder: Option<FolderFacet>,
    #[serde(default)]
    pub parent_reference: Option<ParentReference>,
    #[serde(default)]
    pub remote_item: Option<RemoteItem>,
    #[serde(default, rename = "@microsoft.graph.downloadUrl")]
    pub download_url: Option<String>,
}

impl DriveItem {
    pub fn is_folder(&self) -> bool {
        self.folder.is_some()
            || self
                .remote_item
                .as_ref()
                .is_some_and(|remote| remote.folder.is_some())
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("(unnamed)")
    }

    pub fn drive_id(&self) -> Option<&str> {
        self.parent_reference
            .as_ref()
            .and_then(|p| p.drive_id.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FolderFacet {}

/// The `remoteItem` facet carried by items shared from another drive.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteItem {
    pub id: String,
    #[serde(default)]
    pub folder: Option<FolderFacet>,
    #[serde(default)]
    pub parent_reference: Option<ParentReference>,
    #[serde(default)]
    pub shared: Option<SharedFacet>,
}

impl RemoteItem {
    pub fn drive_id(&self) -> Option<&str> {
        self.parent_reference
            .as_ref()
            .and_then(|p| p.drive_id.as_deref())
    }

    /// Display name of the user who shared the item, if Graph reported one.
    pub fn shared_by(&self) -> Option<&str> {
        self.shared
            .as_ref()
            .and_then(|s| s.owner.as_ref())
            .and_then(|o| o.user.as_ref())
            .and_then(|u| u.display_name.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SharedFacet {
    #[serde(default)]
    pub owner: Option<IdentitySet>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentitySet {
    #[serde(default)]
    pub user: Option<Identity>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(default)]
    pub display_name: Option<String>,
}

/// One page of a Graph collection response.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(default, rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Site {
    pub id: String,
    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Drive {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Immutable snapshot of a remote file taken from a listing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub id: String,
    pub name: String,
    pub size: Option<u64>,
    pub parent: ParentReference,
}

impl FileEntry {
    pub fn drive_id(&self) -> Option<&str> {
        self.parent.drive_id.as_deref()
    }
}

impl From<DriveItem> for FileEntry {
    fn from(item: DriveItem) -> Self {
        let name = item.display_name().to_string();
        Self {
            id: item.id,
            name,
            size: item.size,
            parent: item.parent_reference.unwrap_or_default(),
        }
    }
}

/// Metadata returned by `get_item_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemInfo {
    pub id: String,
    pub name: String,
    pub size: Option<u64>,
    pub download_url: Option<String>,
}

impl From<DriveItem> for ItemInfo {
    fn from(item: DriveItem) -> Self {
        let name = item.display_name().to_string();
        Self {
            id: item.id,
            name,
            size: item.size,
            download_url: item.download_url,
        }
    }
}

/// A folder addressed by item id, optionally inside a specific drive.
/// Without a drive id the signed-in user's own drive is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRef {
    pub drive_id: Option<String>,
    pub item_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drive_item_deserialize_file() {
        let json = r#"{
            "id": "01ABC",
            "name": "clip_0001.tar",
            "size": 52428800,
            "file": {"mimeType": "application/x-tar"},
            "parentReference": {"driveId": "b!drive", "id": "01PARENT", "path": "/drive/root:/a_t5"},
            "@microsoft.graph.downloadUrl": "https://example.sharepoint.com/download?x=1"
        }"#;
        let item: DriveItem = serde_json::from_str(json).unwrap();
        assert!(!item.is_folder());
        assert_eq!(item.drive_id(), Some("b!drive"));
        assert_eq!(
            item.download_url.as_deref(),
            Some("https://example.sharepoint.com/download?x=1")
        );

        let entry = FileEntry::from(item);
        assert_eq!(entry.name, "clip_0001.tar");
        assert_eq!(entry.size, Some(52428800));
        assert_eq!(entry.parent.id.as_deref(), Some("01PARENT"));
    }

    #[test]
    fn test_drive_item_folder_and_remote() {
        let json = r#"{
            "id": "SHARED1",
            "name": "datasets",
            "remoteItem": {
                "id": "REMOTE1",
                "folder": {"childCount": 3},
                "parentReference": {"driveId": "b!other"},
                "shared": {"owner": {"user": {"displayName": "Dana"}}}
            }
        }"#;
        let item: DriveItem = serde_json::from_str(json).unwrap();
        assert!(item.is_folder());
        let remote = item.remote_item.as_ref().unwrap();
        assert_eq!(remote.drive_id(), Some("b!other"));
        assert_eq!(remote.shared_by(), Some("Dana"));
    }

    #[test]
    fn test_missing_name_and_size() {
        let item: DriveItem = serde_json::from_str(r#"{"id": "X"}"#).unwrap();
        let entry = FileEntry::from(item);
        assert_eq!(entry.name, "(unnamed)");
        assert_eq!(entry.size, None);
        assert_eq!(entry.drive_id(), None);
    }

    #[test]
    fn test_page_next_link() {
        let json = r#"{"value": [{"id": "A"}], "@odata.nextLink": "https://graph/next"}"#;
        let page: Page<DriveItem> = serde_json::from_str(json).unwrap();
        assert_eq!(page.value.len(), 1);
        assert_eq!(page.next_link.as_deref(), Some("https://graph/next"));
    }
}
