//! Progress bar for download runs.

use std::time::Duration;

use harvester_core::{DownloadOutcome, ProgressObserver};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Progress bar fed by the download engine.
///
/// Spans every batch of a run: each batch extends the bar's length, so
/// page-by-page downloads keep one running total.
pub(crate) struct HarvestProgress {
    bar: ProgressBar,
}

impl HarvestProgress {
    /// Creates a visible bar, or a hidden one when `visible` is false.
    pub(crate) fn new(visible: bool) -> Self {
        let bar = ProgressBar::new(0);
        if !visible {
            bar.set_draw_target(ProgressDrawTarget::hidden());
            return Self { bar };
        }
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    /// Clears the bar from the terminal.
    pub(crate) fn finish(&self) {
        self.bar.finish_and_clear();
    }

    #[cfg(test)]
    fn position(&self) -> (u64, Option<u64>) {
        (self.bar.position(), self.bar.length())
    }
}

impl ProgressObserver for HarvestProgress {
    fn on_start(&self, total: usize) {
        self.bar.inc_length(total as u64);
    }

    fn on_outcome(&self, _completed: usize, _total: usize, outcome: &DownloadOutcome) {
        let label = match outcome {
            DownloadOutcome::Skipped { .. } => "skipped",
            DownloadOutcome::Succeeded { .. } => "saved",
            DownloadOutcome::Failed { .. } => "failed",
        };
        self.bar
            .set_message(format!("{label} {}", outcome.identifier()));
        self.bar.inc(1);
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use harvester_core::Identifier;

    use super::*;

    #[test]
    fn hidden_progress_still_counts_across_batches() {
        let progress = HarvestProgress::new(false);
        let outcome = DownloadOutcome::Skipped {
            identifier: Identifier::from("a"),
            path: PathBuf::from("a.torrent"),
        };

        progress.on_start(2);
        progress.on_outcome(1, 2, &outcome);
        progress.on_start(3);
        progress.on_outcome(1, 3, &outcome);

        assert_eq!(progress.position(), (2, Some(5)));
        progress.finish();
    }
}
