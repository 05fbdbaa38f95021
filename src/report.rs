//! Run summaries and the failure/missing manifests written after a run.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::download::DownloadOutcome;
use crate::graph::FileEntry;
use crate::verify::VerificationResult;

const RULE: &str = "------------------------------------------------------------";

/// Format a byte count with two decimals, e.g. `"1.50 MB"`.
pub fn format_size(bytes: Option<u64>) -> String {
    let Some(bytes) = bytes else {
        return "unknown size".to_string();
    };
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if size < 1024.0 {
            return format!("{:.2} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.2} PB", size)
}

/// Share of `part` in `total` as a percentage; an empty total is 0%.
pub fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

pub fn failed_manifest_path(root: &Path, batch_number: usize) -> PathBuf {
    root.join(format!("batch_{}_failed_files.txt", batch_number))
}

pub fn missing_manifest_path(root: &Path, batch_number: usize) -> PathBuf {
    root.join(format!("batch_{}_missing_files.txt", batch_number))
}

fn manifest_header(title: &str, created: &DateTime<Local>) -> String {
    format!(
        "{}\nCreated: {}\n{}\n",
        title,
        created.format("%Y-%m-%d %H:%M:%S"),
        RULE
    )
}

fn write_manifest(path: &Path, contents: &str) -> Option<PathBuf> {
    match std::fs::write(path, contents) {
        Ok(()) => Some(path.to_path_buf()),
        Err(e) => {
            tracing::error!("Failed to write manifest {}: {}", path.display(), e);
            None
        }
    }
}

/// Outcome counts of one batch download run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub batch_number: usize,
    pub total: usize,
    pub succeeded: Vec<FileEntry>,
    pub failed: Vec<(FileEntry, String)>,
    pub skipped: Vec<FileEntry>,
}

impl BatchReport {
    pub fn from_outcomes(
        batch_number: usize,
        total: usize,
        outcomes: Vec<(FileEntry, DownloadOutcome)>,
    ) -> Self {
        let mut report = Self {
            batch_number,
            total,
            ..Default::default()
        };
        for (entry, outcome) in outcomes {
            match outcome {
                DownloadOutcome::Succeeded { .. } => report.succeeded.push(entry),
                DownloadOutcome::Failed(reason) => report.failed.push((entry, reason)),
                DownloadOutcome::SkippedExisting => report.skipped.push(entry),
            }
        }
        report
    }

    pub fn log_summary(&self) {
        tracing::info!("── Batch {} download report ──", self.batch_number);
        tracing::info!("  total:      {}", self.total);
        tracing::info!(
            "  downloaded: {} ({:.1}%)",
            self.succeeded.len(),
            percent(self.succeeded.len(), self.total)
        );
        tracing::info!(
            "  failed:     {} ({:.1}%)",
            self.failed.len(),
            percent(self.failed.len(), self.total)
        );
        tracing::info!(
            "  skipped:    {} ({:.1}%)",
            self.skipped.len(),
            percent(self.skipped.len(), self.total)
        );
        for (i, (entry, reason)) in self.failed.iter().enumerate() {
            tracing::warn!(
                "  {}. {} ({}): {}",
                i + 1,
                entry.name,
                format_size(entry.size),
                reason
            );
        }
    }

    pub fn manifest(&self, created: &DateTime<Local>) -> String {
        let mut out = manifest_header(
            &format!("Batch {} failed files", self.batch_number),
            created,
        );
        for (entry, _) in &self.failed {
            let _ = writeln!(out, "{} ({})", entry.name, format_size(entry.size));
        }
        out
    }

    /// Write `batch_<n>_failed_files.txt` when anything failed.
    pub fn write_failed_manifest(&self, root: &Path) -> Option<PathBuf> {
        if self.failed.is_empty() {
            return None;
        }
        let path = failed_manifest_path(root, self.batch_number);
        let written = write_manifest(&path, &self.manifest(&Local::now()));
        if let Some(p) = &written {
            tracing::info!("Failed file list saved to {}", p.display());
        }
        written
    }
}

/// Result of verifying one batch.
#[derive(Debug)]
pub struct VerifyReport {
    pub batch_number: usize,
    pub total: usize,
    pub ok: usize,
    pub problems: Vec<(FileEntry, VerificationResult)>,
}

impl VerifyReport {
    pub fn new(batch_number: usize, results: Vec<(FileEntry, VerificationResult)>) -> Self {
        let total = results.len();
        let problems: Vec<_> = results.into_iter().filter(|(_, r)| !r.is_ok()).collect();
        Self {
            batch_number,
            total,
            ok: total - problems.len(),
            problems,
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("── Batch {} verification report ──", self.batch_number);
        tracing::info!("  total:              {}", self.total);
        tracing::info!(
            "  present and correct: {} ({:.1}%)",
            self.ok,
            percent(self.ok, self.total)
        );
        tracing::info!(
            "  missing or wrong:    {} ({:.1}%)",
            self.problems.len(),
            percent(self.problems.len(), self.total)
        );
        for (i, (entry, result)) in self.problems.iter().enumerate() {
            tracing::warn!(
                "  {}. {} ({}) - {}",
                i + 1,
                entry.name,
                format_size(entry.size),
                result.reason()
            );
        }
    }

    pub fn manifest(&self, created: &DateTime<Local>) -> String {
        let mut out = manifest_header(
            &format!("Batch {} missing or incorrect files", self.batch_number),
            created,
        );
        for (entry, result) in &self.problems {
            let _ = writeln!(
                out,
                "{} ({}) - {}",
                entry.name,
                format_size(entry.size),
                result.reason()
            );
        }
        out
    }

    /// Write `batch_<n>_missing_files.txt` when anything is missing.
    pub fn write_missing_manifest(&self, root: &Path) -> Option<PathBuf> {
        if self.problems.is_empty() {
            return None;
        }
        let path = missing_manifest_path(root, self.batch_number);
        let written = write_manifest(&path, &self.manifest(&Local::now()));
        if let Some(p) = &written {
            tracing::info!("Missing file list saved to {}", p.display());
        }
        written
    }
}

/// Summary of a missing-files repair pass.
#[derive(Debug, Default)]
pub struct RepairReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: Vec<(FileEntry, String)>,
}

impl RepairReport {
    pub fn from_outcomes(outcomes: Vec<(FileEntry, DownloadOutcome)>) -> Self {
        let mut report = Self {
            attempted: outcomes.len(),
            ..Default::default()
        };
        for (entry, outcome) in outcomes {
            match outcome {
                DownloadOutcome::Succeeded { .. } => report.succeeded += 1,
                DownloadOutcome::Failed(reason) => report.failed.push((entry, reason)),
                DownloadOutcome::SkippedExisting => report.skipped += 1,
            }
        }
        report
    }

    pub fn log_summary(&self) {
        tracing::info!("── Missing files download report ──");
        tracing::info!("  attempted:  {}", self.attempted);
        tracing::info!("  downloaded: {}", self.succeeded);
        if self.skipped > 0 {
            tracing::info!("  skipped:    {}", self.skipped);
        }
        tracing::info!("  failed:     {}", self.failed.len());
        for (i, (entry, reason)) in self.failed.iter().enumerate() {
            tracing::warn!(
                "  {}. {} ({}): {}",
                i + 1,
                entry.name,
                format_size(entry.size),
                reason
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::ParentReference;
    use chrono::TimeZone;

    fn entry(name: &str, size: Option<u64>) -> FileEntry {
        FileEntry {
            id: name.to_string(),
            name: name.to_string(),
            size,
            parent: ParentReference::default(),
        }
    }

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap()
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(None), "unknown size");
        assert_eq!(format_size(Some(0)), "0.00 B");
        assert_eq!(format_size(Some(1023)), "1023.00 B");
        assert_eq!(format_size(Some(1024)), "1.00 KB");
        assert_eq!(format_size(Some(1536 * 1024)), "1.50 MB");
        assert_eq!(format_size(Some(1u64 << 50)), "1.00 PB");
    }

    #[test]
    fn test_percent_handles_empty_total() {
        assert_eq!(percent(0, 0), 0.0);
        assert_eq!(percent(1, 4), 25.0);
    }

    #[test]
    fn test_batch_report_counts() {
        let outcomes = vec![
            (entry("a", Some(1)), DownloadOutcome::SkippedExisting),
            (entry("b", Some(2)), DownloadOutcome::Succeeded { bytes: 2 }),
            (entry("c", None), DownloadOutcome::Failed("HTTP 404".into())),
        ];
        let report = BatchReport::from_outcomes(2, 3, outcomes);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.succeeded.len(), 1);
        assert_eq!(report.failed.len(), 1);

        let text = report.manifest(&fixed_time());
        assert_eq!(
            text,
            format!(
                "Batch 2 failed files\nCreated: 2025-03-04 05:06:07\n{}\nc (unknown size)\n",
                RULE
            )
        );
    }

    #[test]
    fn test_failed_manifest_only_written_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let clean = BatchReport::from_outcomes(
            1,
            1,
            vec![(entry("a", Some(1)), DownloadOutcome::Succeeded { bytes: 1 })],
        );
        assert!(clean.write_failed_manifest(dir.path()).is_none());
        assert!(!failed_manifest_path(dir.path(), 1).exists());

        let failing = BatchReport::from_outcomes(
            1,
            1,
            vec![(entry("a", Some(2048)), DownloadOutcome::Failed("x".into()))],
        );
        let path = failing.write_failed_manifest(dir.path()).unwrap();
        let contents = std::fs::read_to_string(path).unwrap();
        assert!(contents.starts_with("Batch 1 failed files\n"));
        assert!(contents.ends_with("a (2.00 KB)\n"));
    }

    #[test]
    fn test_verify_report_manifest() {
        let results = vec![
            (entry("ok.flac", Some(5)), VerificationResult::Ok),
            (entry("gone.flac", Some(1024)), VerificationResult::Missing),
        ];
        let report = VerifyReport::new(4, results);
        assert_eq!(report.total, 2);
        assert_eq!(report.ok, 1);
        assert_eq!(report.problems.len(), 1);

        let dir = tempfile::tempdir().unwrap();
        let path = report.write_missing_manifest(dir.path()).unwrap();
        assert_eq!(path, missing_manifest_path(dir.path(), 4));
        let contents = std::fs::read_to_string(path).unwrap();
        assert!(contents.contains("gone.flac (1.00 KB) - file does not exist\n"));
        assert!(!contents.contains("ok.flac"));
    }

    #[test]
    fn test_repair_report() {
        let report = RepairReport::from_outcomes(vec![
            (entry("a", None), DownloadOutcome::Succeeded { bytes: 0 }),
            (entry("b", None), DownloadOutcome::Failed("boom".into())),
            (entry("c", None), DownloadOutcome::SkippedExisting),
        ]);
        assert_eq!(report.attempted, 3);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed.len(), 1);
    }
}
