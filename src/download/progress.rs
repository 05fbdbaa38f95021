use std::io::IsTerminal;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::graph::FileEntry;

/// Overall task bar plus one byte bar per file currently streaming.
///
/// Everything is hidden when the user passed `--no-progress-bar` or stdout
/// is not a TTY (piped output, cron jobs).
pub struct Progress {
    multi: MultiProgress,
    overall: ProgressBar,
    enabled: bool,
}

impl Progress {
    pub fn new(no_progress_bar: bool, total: u64) -> Self {
        let enabled = !no_progress_bar && std::io::stdout().is_terminal();
        let multi = if enabled {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };
        let overall = multi.add(ProgressBar::new(total));
        overall.set_style(
            ProgressStyle::with_template(
                "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            )
            .expect("valid template")
            .progress_chars("=> "),
        );
        Self {
            multi,
            overall,
            enabled,
        }
    }

    /// Byte bar for one file; its length is corrected from `Content-Length`
    /// once the response arrives.
    pub fn file_bar(&self, entry: &FileEntry) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }
        let bar = self.multi.add(ProgressBar::new(entry.size.unwrap_or(0)));
        bar.set_style(
            ProgressStyle::with_template(
                "  {msg:30!} [{bar:30.green/white}] {bytes}/{total_bytes} {bytes_per_sec}",
            )
            .expect("valid template")
            .progress_chars("=> "),
        );
        bar.set_message(entry.name.clone());
        bar
    }

    pub fn finish_file(&self, bar: &ProgressBar) {
        bar.finish_and_clear();
        self.multi.remove(bar);
    }

    pub fn inc(&self) {
        self.overall.inc(1);
    }

    /// Run `f` with the bars cleared so log lines are not garbled.
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.multi.suspend(f)
    }

    pub fn finish(&self) {
        self.overall.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::ParentReference;

    #[test]
    fn test_disabled_progress_hands_out_hidden_bars() {
        let progress = Progress::new(true, 3);
        assert!(!progress.enabled);
        let entry = FileEntry {
            id: "1".into(),
            name: "a.flac".into(),
            size: Some(10),
            parent: ParentReference::default(),
        };
        let bar = progress.file_bar(&entry);
        assert!(bar.is_hidden());
        progress.inc();
        assert_eq!(progress.suspend(|| 7), 7);
        progress.finish_file(&bar);
        progress.finish();
    }
}
