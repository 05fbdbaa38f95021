//! Size-based verification of a downloaded batch.
//!
//! Only presence and byte size are checked; file contents are never hashed.

use std::path::Path;

use crate::download::paths;
use crate::graph::FileEntry;

/// Local and remote sizes may differ by this many bytes and still count as
/// a complete download.
pub const SIZE_TOLERANCE_BYTES: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationResult {
    Ok,
    Missing,
    SizeMismatch { local: u64, remote: u64 },
}

impl VerificationResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, VerificationResult::Ok)
    }

    /// Human-readable reason used in reports.
    pub fn reason(&self) -> String {
        match self {
            VerificationResult::Ok => "ok".to_string(),
            VerificationResult::Missing => "file does not exist".to_string(),
            VerificationResult::SizeMismatch { local, remote } => format!(
                "size mismatch (local: {}, remote: {})",
                crate::report::format_size(Some(*local)),
                crate::report::format_size(Some(*remote))
            ),
        }
    }
}

/// Classify one local file against its remote entry.
///
/// A remote size of zero or unknown disables the size comparison.
pub fn verify_entry(entry: &FileEntry, local_path: &Path) -> VerificationResult {
    let local = match std::fs::metadata(local_path) {
        Ok(meta) if meta.is_file() => meta.len(),
        _ => return VerificationResult::Missing,
    };

    match entry.size {
        Some(remote) if remote > 0 && local.abs_diff(remote) > SIZE_TOLERANCE_BYTES => {
            VerificationResult::SizeMismatch { local, remote }
        }
        _ => VerificationResult::Ok,
    }
}

/// Verify every entry of a batch against its destination under `batch_dir`.
pub fn verify_batch(entries: &[FileEntry], batch_dir: &Path) -> Vec<(FileEntry, VerificationResult)> {
    if !batch_dir.is_dir() {
        tracing::warn!(
            "Batch directory {} does not exist; every file counts as missing",
            batch_dir.display()
        );
    }

    entries
        .iter()
        .map(|entry| {
            let path = paths::destination_for(batch_dir, entry);
            (entry.clone(), verify_entry(entry, &path))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::ParentReference;

    fn entry(name: &str, size: Option<u64>) -> FileEntry {
        FileEntry {
            id: name.to_string(),
            name: name.to_string(),
            size,
            parent: ParentReference::default(),
        }
    }

    fn write(dir: &Path, name: &str, len: usize) {
        std::fs::write(dir.join(name), vec![0u8; len]).unwrap();
    }

    #[test]
    fn test_missing() {
        let dir = tempfile::tempdir().unwrap();
        let e = entry("a.flac", Some(10));
        assert_eq!(
            verify_entry(&e, &dir.path().join("a.flac")),
            VerificationResult::Missing
        );
    }

    #[test]
    fn test_tolerance_boundary() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "within.flac", 1000);
        write(dir.path(), "outside.flac", 1000);

        let within = entry("within.flac", Some(1100));
        assert_eq!(
            verify_entry(&within, &dir.path().join("within.flac")),
            VerificationResult::Ok
        );

        let outside = entry("outside.flac", Some(1101));
        assert_eq!(
            verify_entry(&outside, &dir.path().join("outside.flac")),
            VerificationResult::SizeMismatch {
                local: 1000,
                remote: 1101
            }
        );
    }

    #[test]
    fn test_local_larger_than_remote() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "big.flac", 500);
        let e = entry("big.flac", Some(300));
        assert_eq!(
            verify_entry(&e, &dir.path().join("big.flac")),
            VerificationResult::SizeMismatch {
                local: 500,
                remote: 300
            }
        );
    }

    #[test]
    fn test_unknown_or_zero_remote_size_is_ok_when_present() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "x.flac", 5000);
        let path = dir.path().join("x.flac");
        assert!(verify_entry(&entry("x.flac", None), &path).is_ok());
        assert!(verify_entry(&entry("x.flac", Some(0)), &path).is_ok());
    }

    /// Contents are never compared: same-size garbage passes.
    #[test]
    fn test_same_size_different_content_passes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("c.flac"), b"not really flac").unwrap();
        let e = entry("c.flac", Some(15));
        assert!(verify_entry(&e, &dir.path().join("c.flac")).is_ok());
    }

    #[test]
    fn test_verify_batch_without_directory() {
        let dir = tempfile::tempdir().unwrap();
        let batch_dir = dir.path().join("batch_3");
        let entries = vec![entry("a.flac", Some(1)), entry("b.flac", Some(2))];
        let results = verify_batch(&entries, &batch_dir);
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|(_, r)| *r == VerificationResult::Missing));
    }

    #[test]
    fn test_reason_text() {
        assert_eq!(VerificationResult::Missing.reason(), "file does not exist");
        let r = VerificationResult::SizeMismatch {
            local: 1024,
            remote: 2048,
        };
        assert_eq!(
            r.reason(),
            "size mismatch (local: 1.00 KB, remote: 2.00 KB)"
        );
    }
}
