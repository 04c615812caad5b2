//! `indicatif`-backed progress bar for monitoring runs.

use discwatch_core::ProgressSink;
use indicatif::{ProgressBar, ProgressStyle};

/// A percentage bar that shows the product most recently processed.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new(message: &str) -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        bar.set_message(message.to_string());
        Self { bar }
    }

    /// A bar that draws nothing, for non-interactive output.
    pub fn hidden() -> Self {
        Self { bar: ProgressBar::hidden() }
    }

    #[cfg(test)]
    fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl ProgressSink for BarProgress {
    fn update(&self, percent: u8, product: &str) {
        self.bar.set_position(u64::from(percent));
        self.bar.set_message(product.to_string());
    }

    fn finish(&self) {
        self.bar.finish_with_message("all products processed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_tracks_percent() {
        let progress = BarProgress::hidden();
        progress.update(40, "Gold card");
        assert_eq!(progress.position(), 40);
        progress.update(100, "Classic card");
        progress.finish();
        assert_eq!(progress.position(), 100);
    }
}
