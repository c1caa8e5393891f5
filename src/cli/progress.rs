//! Terminal progress reporting for uploads.

use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::error::BatchError;
use crate::models::PipelineRecord;
use crate::services::{UploadProgress, percent};

const TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}";

/// Progress bar driven by the batch uploader.
pub struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    /// `visible` is false for machine-readable output so stdout stays clean.
    pub fn new(total: u64, visible: bool) -> Self {
        let bar = ProgressBar::new(total);
        if visible {
            bar.set_style(
                ProgressStyle::default_bar()
                    .template(TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
        } else {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

pub(crate) fn uploaded_line(uploaded: u64, total: u64) -> String {
    match percent(uploaded, total) {
        Some(pct) => format!("[OK] Uploaded {}/{} ({:.1}%)", uploaded, total, pct),
        None => format!("[OK] Uploaded {}", uploaded),
    }
}

impl UploadProgress for ConsoleProgress {
    fn chunk_uploaded(&self, uploaded: u64, total: u64) {
        self.bar.set_position(uploaded);
        self.bar.set_message(uploaded_line(uploaded, total));
    }

    fn record_skipped(&self, _record: &PipelineRecord) {
        // Skipped records never reach the store; shrink the target instead.
        if let Some(len) = self.bar.length() {
            self.bar.set_length(len.saturating_sub(1));
        }
    }

    fn batch_failed(&self, abandoned: usize, error: &BatchError) {
        self.bar.println(format!(
            "{} batch of {} records failed: {}",
            style("[ERROR]").red().bold(),
            abandoned,
            error
        ));
    }
}
