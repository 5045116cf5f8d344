//! Streaming download of a single URL to disk.
//!
//! [`Downloader`] pairs a borrowed [`TransportClient`] with
//! [`DownloadOptions`] and turns each [`DownloadTask`] into a file. Bodies
//! with a declared length are streamed chunk by chunk with progress reports;
//! bodies without one are written in a single piece.
//!
//! # Example
//!
//! ```no_run
//! use vidgrab::{DownloadOptions, DownloadTask, Downloader, TransportClient, TransportOptions};
//!
//! let client = TransportClient::new(&TransportOptions::new())?;
//! let downloader = Downloader::new(&client, DownloadOptions::new());
//!
//! let task = DownloadTask::new("https://example.com/clip.mp4", "downloads/clip.mp4");
//! let bytes = downloader.download(&task)?;
//! println!("wrote {bytes} bytes");
//! # Ok::<(), vidgrab::VidgrabError>(())
//! ```

use std::{
    fs::File,
    io::{Read, Write},
    path::{Path, PathBuf},
};

use reqwest::header::CONTENT_LENGTH;

use crate::{
    configuration::DownloadOptions,
    error::VidgrabError,
    progress::{OperationType, ProgressTracker},
    transport::{TransportClient, error_chain},
};

/// One URL to fetch and the file to write it to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    url: String,
    destination: PathBuf,
}

impl DownloadTask {
    /// Create a task.
    pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
        }
    }

    /// The source URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The destination file path.
    pub fn destination(&self) -> &Path {
        &self.destination
    }
}

/// Result of running one [`DownloadTask`].
#[derive(Debug)]
pub struct DownloadOutcome {
    /// The task that was run.
    pub task: DownloadTask,
    /// Bytes written to the destination (possibly partial on failure).
    pub bytes_written: u64,
    /// Why the task failed, if it did.
    pub error: Option<VidgrabError>,
}

impl DownloadOutcome {
    /// Returns `true` if the file was fully written.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Downloads tasks one at a time through a shared [`TransportClient`].
#[derive(Debug)]
pub struct Downloader<'a> {
    client: &'a TransportClient,
    options: DownloadOptions,
}

impl<'a> Downloader<'a> {
    /// Create a downloader borrowing `client`.
    pub fn new(client: &'a TransportClient, options: DownloadOptions) -> Self {
        Self { client, options }
    }

    /// Fetch `task.url()` into `task.destination()`.
    ///
    /// Returns the number of bytes written. The destination file is created
    /// (or truncated) only once a 2xx response has arrived; on a later failure
    /// any partial file is left in place.
    ///
    /// # Errors
    ///
    /// - Errors from [`TransportClient::get`].
    /// - [`VidgrabError::FileWrite`] if the destination cannot be created or
    ///   written.
    /// - [`VidgrabError::Request`] if the body stream breaks.
    /// - [`VidgrabError::IncompleteDownload`] if fewer bytes than the declared
    ///   `Content-Length` arrive.
    pub fn download(&self, task: &DownloadTask) -> Result<u64, VidgrabError> {
        let url = task.url();
        let destination = task.destination();

        let mut response = self.client.get(url)?;

        let content_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .unwrap_or(0);

        let mut file = File::create(destination).map_err(|error| write_error(destination, &error))?;
        log::info!("Starting download: {url}");

        if content_length == 0 {
            log::warn!("No content length available for {url}, downloading without progress");
            let body = response.bytes().map_err(|error| VidgrabError::Request {
                url: url.to_string(),
                reason: error_chain(&error),
            })?;
            file.write_all(&body)
                .map_err(|error| write_error(destination, &error))?;
            file.flush().map_err(|error| write_error(destination, &error))?;
            return Ok(body.len() as u64);
        }

        let mut tracker = ProgressTracker::new(
            self.options.progress.clone(),
            OperationType::Download,
            url,
            Some(content_length),
            1,
        );
        let mut buffer = vec![0_u8; self.options.chunk_size];

        loop {
            let read = response
                .read(&mut buffer)
                .map_err(|error| VidgrabError::Request {
                    url: url.to_string(),
                    reason: error_chain(&error),
                })?;
            if read == 0 {
                break;
            }
            file.write_all(&buffer[..read])
                .map_err(|error| write_error(destination, &error))?;
            tracker.advance_by(read as u64);
        }

        file.flush().map_err(|error| write_error(destination, &error))?;
        tracker.finish();

        let received = tracker.current();
        if received < content_length {
            return Err(VidgrabError::IncompleteDownload {
                url: url.to_string(),
                expected: content_length,
                received,
            });
        }

        Ok(received)
    }

    /// Run `task` and capture the result as a [`DownloadOutcome`].
    ///
    /// Never fails: errors are logged and stored on the outcome.
    pub fn run(&self, task: DownloadTask) -> DownloadOutcome {
        match self.download(&task) {
            Ok(bytes_written) => {
                log::info!("Download complete: {}", task.destination().display());
                DownloadOutcome {
                    task,
                    bytes_written,
                    error: None,
                }
            }
            Err(error) => {
                log::error!("Error downloading {}: {error}", task.url());
                let bytes_written = std::fs::metadata(task.destination())
                    .map(|metadata| metadata.len())
                    .unwrap_or(0);
                DownloadOutcome {
                    task,
                    bytes_written,
                    error: Some(error),
                }
            }
        }
    }
}

fn write_error(path: &Path, error: &std::io::Error) -> VidgrabError {
    VidgrabError::FileWrite {
        path: path.to_path_buf(),
        reason: error.to_string(),
    }
}
