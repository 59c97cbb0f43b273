// file: src/ingest/progress.rs
// description: progress tracking and statistics reporting for ingestion runs
// reference: uses indicatif for progress bars and tracks indexing metrics

use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

#[derive(Debug, Clone, Default)]
pub struct IngestStats {
    pub documents_read: u64,
    pub documents_indexed: u64,
    pub documents_failed: u64,
    pub documents_reindexed: u64,
    pub duration_secs: u64,
}

impl IngestStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn documents_per_second(&self) -> f64 {
        if self.duration_secs == 0 {
            return 0.0;
        }
        self.documents_indexed as f64 / self.duration_secs as f64
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.documents_indexed + self.documents_failed;
        if total == 0 {
            return 0.0;
        }
        (self.documents_indexed as f64 / total as f64) * 100.0
    }

    pub fn summary(&self) -> String {
        let failed = if self.documents_failed > 0 {
            self.documents_failed.to_string().red().bold().to_string()
        } else {
            self.documents_failed.to_string().green().to_string()
        };

        format!(
            "read {} | indexed {} | failed {} | reindexed {} | {:.1}% success in {}s",
            self.documents_read,
            self.documents_indexed.to_string().green(),
            failed,
            self.documents_reindexed,
            self.success_rate(),
            self.duration_secs
        )
    }
}

pub struct ProgressTracker {
    main_bar: ProgressBar,
    detail_bar: ProgressBar,
    documents_indexed: Arc<AtomicU64>,
    documents_failed: Arc<AtomicU64>,
    start_time: Instant,
}

impl ProgressTracker {
    pub fn with_color(total_documents: usize, colored: bool) -> Self {
        let multi_progress = MultiProgress::new();

        let main_bar = create_progress_bar(&multi_progress, total_documents as u64, colored);
        let detail_bar = create_detail_bar(&multi_progress);

        Self {
            main_bar,
            detail_bar,
            documents_indexed: Arc::new(AtomicU64::new(0)),
            documents_failed: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    /// Tracker that counts without drawing, for non-interactive runs.
    pub fn hidden(total_documents: usize) -> Self {
        let multi_progress = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());

        Self {
            main_bar: create_progress_bar(&multi_progress, total_documents as u64, false),
            detail_bar: create_detail_bar(&multi_progress),
            documents_indexed: Arc::new(AtomicU64::new(0)),
            documents_failed: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn add_indexed(&self, count: u64) {
        self.documents_indexed.fetch_add(count, Ordering::SeqCst);
        self.main_bar.inc(count);
        self.update_detail_bar();
    }

    pub fn add_failed(&self, count: u64) {
        if count == 0 {
            return;
        }
        self.documents_failed.fetch_add(count, Ordering::SeqCst);
        self.main_bar.inc(count);
        self.update_detail_bar();
    }

    pub fn finish(&self) {
        self.main_bar.finish_with_message("Bulk load complete");
        self.detail_bar.finish_and_clear();
    }

    pub fn get_stats(&self) -> IngestStats {
        IngestStats {
            documents_indexed: self.documents_indexed.load(Ordering::SeqCst),
            documents_failed: self.documents_failed.load(Ordering::SeqCst),
            duration_secs: self.start_time.elapsed().as_secs(),
            ..IngestStats::default()
        }
    }

    fn update_detail_bar(&self) {
        let indexed = self.documents_indexed.load(Ordering::SeqCst);
        let failed = self.documents_failed.load(Ordering::SeqCst);

        self.detail_bar
            .set_message(format!("Indexed: {} | Failed: {}", indexed, failed));
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        self.finish();
    }
}

fn create_progress_bar(multi_progress: &MultiProgress, total: u64, colored: bool) -> ProgressBar {
    let bar = multi_progress.add(ProgressBar::new(total));
    let (template, chars) = if colored {
        (
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            "█▓▒░",
        )
    } else {
        (
            "{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({eta}) {msg}",
            "=>-",
        )
    };

    if let Ok(style) = ProgressStyle::default_bar().template(template) {
        bar.set_style(style.progress_chars(chars));
    }
    bar
}

fn create_detail_bar(multi_progress: &MultiProgress) -> ProgressBar {
    let bar = multi_progress.add(ProgressBar::new(0));
    if let Ok(style) = ProgressStyle::default_bar().template("{msg}") {
        bar.set_style(style);
    }
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_stats_calculations() {
        let mut stats = IngestStats::new();
        stats.documents_indexed = 90;
        stats.documents_failed = 10;
        stats.duration_secs = 10;

        assert_eq!(stats.documents_per_second(), 9.0);
        assert!((stats.success_rate() - 90.0).abs() < 0.01);
    }

    #[test]
    fn test_ingest_stats_zero_duration() {
        let stats = IngestStats::new();
        assert_eq!(stats.documents_per_second(), 0.0);
        assert_eq!(stats.success_rate(), 0.0);
    }

    #[test]
    fn test_progress_tracker_counts() {
        let tracker = ProgressTracker::hidden(100);

        tracker.add_indexed(40);
        tracker.add_failed(2);
        tracker.add_failed(0);

        let stats = tracker.get_stats();
        assert_eq!(stats.documents_indexed, 40);
        assert_eq!(stats.documents_failed, 2);
    }
}
