//! Progress reporting.
//!
//! This module provides [`ProgressCallback`] for observing downloads and
//! frame extraction, and [`ProgressInfo`] for the snapshots delivered to it.
//! Callbacks only observe: they cannot stop an operation once it has started.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use vidgrab::{
//!     DownloadOptions, Downloader, ProgressCallback, ProgressInfo, TransportClient,
//!     TransportOptions, VidgrabError,
//! };
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("[{:?}] {}: {pct:.1}%", info.operation, info.subject);
//!         }
//!     }
//! }
//!
//! let client = TransportClient::new(&TransportOptions::new())?;
//! let options = DownloadOptions::new().with_progress(Arc::new(PrintProgress));
//! let downloader = Downloader::new(&client, options);
//! # Ok::<(), VidgrabError>(())
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

/// The kind of operation currently in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Streaming an HTTP body to disk. Units are bytes.
    Download,
    /// Decoding and writing video frames. Units are frames.
    FrameExtraction,
}

/// A snapshot of progress for one download or one video.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// What kind of work is being performed.
    pub operation: OperationType,
    /// The URL or video file name the work is about.
    pub subject: String,
    /// How many units (bytes or frames) have been processed so far.
    pub current: u64,
    /// Total units expected, if known ahead of time.
    ///
    /// For frame extraction this is the probed frame count, which can be
    /// approximate; `current` may end up above or below it.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time elapsed since the operation started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// Index of the frame just written (frame extraction only).
    pub current_frame: Option<u64>,
    /// `true` on the last report for this subject.
    pub finished: bool,
}

/// Trait for receiving progress updates.
///
/// Implementations must be [`Send`] and [`Sync`] so a single observer can be
/// shared through `Arc` by every task of a batch.
pub trait ProgressCallback: Send + Sync {
    /// Called after each unit of work and once more when the subject is done.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. The default observer.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Internal helper that tracks progress timing and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    subject: String,
    total: Option<u64>,
    current: u64,
    batch_size: u64,
    start_time: Instant,
    items_since_last_report: u64,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        subject: impl Into<String>,
        total: Option<u64>,
        batch_size: u64,
    ) -> Self {
        Self {
            callback,
            operation,
            subject: subject.into(),
            total: total.filter(|&t| t > 0),
            current: 0,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            items_since_last_report: 0,
        }
    }

    /// Record one completed frame and report if the batch threshold is hit.
    pub(crate) fn advance(&mut self, frame_number: Option<u64>) {
        self.current += 1;
        self.items_since_last_report += 1;

        if self.items_since_last_report >= self.batch_size {
            self.report(frame_number, false);
            self.items_since_last_report = 0;
        }
    }

    /// Record `amount` bytes and report immediately.
    pub(crate) fn advance_by(&mut self, amount: u64) {
        self.current += amount;
        self.report(None, false);
    }

    pub(crate) fn current(&self) -> u64 {
        self.current
    }

    /// Unconditionally emit a final progress report.
    pub(crate) fn finish(&mut self) {
        self.report(None, true);
    }

    fn report(&self, frame_number: Option<u64>, finished: bool) {
        let elapsed = self.start_time.elapsed();

        let percentage = self
            .total
            .map(|t| ((self.current as f32 / t as f32) * 100.0).min(100.0));

        let estimated_remaining = if self.current > 0 {
            self.total.map(|t| {
                let remaining = t.saturating_sub(self.current);
                let per_item = elapsed.as_secs_f64() / self.current as f64;
                Duration::from_secs_f64(per_item * remaining as f64)
            })
        } else {
            None
        };

        let info = ProgressInfo {
            operation: self.operation,
            subject: self.subject.clone(),
            current: self.current,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            current_frame: frame_number,
            finished,
        };

        self.callback.on_progress(&info);
    }
}
