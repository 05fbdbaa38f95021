use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::graph::FileEntry;

/// `<root>/batch_<n>`
pub fn batch_dir(root: &Path, batch_number: usize) -> PathBuf {
    root.join(format!("batch_{}", batch_number))
}

/// Local path a remote file is written to inside its batch directory.
pub fn destination_for(batch_dir: &Path, entry: &FileEntry) -> PathBuf {
    let clean = clean_filename(&entry.name);
    if clean.is_empty() || clean == "." || clean == ".." {
        // Names that clean down to nothing still need a distinct file.
        return batch_dir.join(format!("item_{}", clean_filename(&entry.id)));
    }
    batch_dir.join(clean)
}

/// Clean a filename by removing characters that are invalid on common
/// filesystems: `/`, `\`, `:`, `*`, `?`, `"`, `<`, `>`, `|`.
pub fn clean_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .filter(|c| !c.is_control())
        .collect()
}

/// In-progress sibling of a destination: `a.flac` downloads into `a.flac.part`.
pub fn part_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}
