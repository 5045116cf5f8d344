//! Transport, download, and extraction configuration.
//!
//! The builders in this module thread retry settings, progress callbacks and
//! output tuning through the crate without polluting every function
//! signature. All of them have working defaults; a default-constructed value
//! reproduces the stock behaviour (5 retries with 1 s exponential backoff on
//! 5xx, 8 KiB chunks, JPEG quality 95, 4 decoder threads).
//!
//! # Example
//!
//! ```no_run
//! use std::{sync::Arc, time::Duration};
//!
//! use vidgrab::{ExtractOptions, ProgressCallback, ProgressInfo, RetryPolicy, TransportOptions};
//!
//! struct LogProgress;
//! impl ProgressCallback for LogProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{}: {} done", info.subject, info.current);
//!     }
//! }
//!
//! let transport = TransportOptions::new()
//!     .with_retry_policy(RetryPolicy::new().with_max_retries(3));
//! let extract = ExtractOptions::new()
//!     .with_progress(Arc::new(LogProgress))
//!     .with_jpeg_quality(90);
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::time::Duration;

use crate::progress::{NoOpProgress, ProgressCallback};

/// Default number of retries after the first request.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Statuses retried by default.
pub const DEFAULT_RETRY_STATUSES: [u16; 4] = [500, 502, 503, 504];

/// Default streaming chunk size (8 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Default JPEG quality for extracted frames.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Retry and backoff policy applied by the
/// [`TransportClient`](crate::TransportClient).
///
/// The delay before retry `n` (1-based) is `backoff_factor * 2^(n - 1)`,
/// capped at `max_backoff`. With the defaults that is 1, 2, 4, 8 and 16
/// seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub(crate) max_retries: u32,
    pub(crate) backoff_factor: Duration,
    pub(crate) max_backoff: Duration,
    pub(crate) retry_statuses: Vec<u16>,
    pub(crate) respect_retry_after: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryPolicy {
    /// Create the default policy.
    pub fn new() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_factor: Duration::from_secs(1),
            max_backoff: Duration::from_secs(120),
            retry_statuses: DEFAULT_RETRY_STATUSES.to_vec(),
            respect_retry_after: true,
        }
    }

    /// Set how many times a request is retried after the first attempt.
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the base delay of the exponential backoff.
    #[must_use]
    pub fn with_backoff_factor(mut self, factor: Duration) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Set the upper bound for any single backoff delay.
    #[must_use]
    pub fn with_max_backoff(mut self, max: Duration) -> Self {
        self.max_backoff = max;
        self
    }

    /// Replace the set of retry-eligible status codes.
    #[must_use]
    pub fn with_retry_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.retry_statuses = statuses.into_iter().collect();
        self
    }

    /// Control whether a `Retry-After` header overrides the computed delay.
    #[must_use]
    pub fn with_respect_retry_after(mut self, respect: bool) -> Self {
        self.respect_retry_after = respect;
        self
    }

    /// Number of retries after the first attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns `true` if `status` should be retried rather than reported.
    pub fn is_retry_status(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.backoff_factor
            .saturating_mul(1_u32 << exponent)
            .min(self.max_backoff)
    }
}

/// Settings for the shared HTTP client.
#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub(crate) retry: RetryPolicy,
    /// Idle connections kept per host for reuse.
    pub(crate) max_idle_per_host: usize,
    pub(crate) connect_timeout: Option<Duration>,
    pub(crate) user_agent: String,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportOptions {
    /// Create transport options with default settings.
    pub fn new() -> Self {
        Self {
            retry: RetryPolicy::new(),
            max_idle_per_host: 100,
            connect_timeout: Some(Duration::from_secs(30)),
            user_agent: format!("vidgrab/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Set how many idle connections are kept per host.
    #[must_use]
    pub fn with_max_idle_per_host(mut self, count: usize) -> Self {
        self.max_idle_per_host = count;
        self
    }

    /// Set the TCP connect timeout. `None` waits indefinitely.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the `User-Agent` header sent with every request.
    #[must_use]
    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// The configured retry policy.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }
}

/// Settings for a single streaming download.
#[derive(Clone)]
pub struct DownloadOptions {
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) chunk_size: usize,
}

impl Debug for DownloadOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("DownloadOptions")
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadOptions {
    /// Defaults: no progress callback, 8 KiB chunks.
    pub fn new() -> Self {
        Self {
            progress: Arc::new(NoOpProgress),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Attach a progress callback, invoked after every chunk.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Set the read buffer size. Clamped to a minimum of 1 byte.
    #[must_use]
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }
}

/// Settings for frame extraction.
#[derive(Clone)]
pub struct ExtractOptions {
    pub(crate) progress: Arc<dyn ProgressCallback>,
    /// How often to fire the progress callback (every N frames).
    pub(crate) batch_size: u64,
    pub(crate) jpeg_quality: u8,
    pub(crate) decoder_threads: usize,
}

impl Debug for ExtractOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ExtractOptions")
            .field("batch_size", &self.batch_size)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("decoder_threads", &self.decoder_threads)
            .finish_non_exhaustive()
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractOptions {
    /// Defaults: no progress callback, batch size 1, quality 95, 4 threads.
    pub fn new() -> Self {
        Self {
            progress: Arc::new(NoOpProgress),
            batch_size: 1,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            decoder_threads: 4,
        }
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Set how often the progress callback fires.
    ///
    /// A value of 1 means every frame; 10 means every 10th frame.
    /// Clamped to a minimum of 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Set the JPEG quality of written frames, clamped to `1..=100`.
    #[must_use]
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Set the number of FFmpeg decoder threads. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_decoder_threads(mut self, threads: usize) -> Self {
        self.decoder_threads = threads.max(1);
        self
    }

    /// JPEG quality used for written frames.
    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }
}
