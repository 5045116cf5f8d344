//! Error types for the `vidgrab` crate.
//!
//! This module defines [`VidgrabError`], the unified error type returned by
//! all fallible operations in the crate. Every variant names the thing that
//! failed (a URL, a path, or a video file) together with the upstream cause,
//! so a failure can be reported without extra context at the call site.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `vidgrab` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VidgrabError {
    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    /// A request failed before a response was received (DNS, connect,
    /// timeout, broken body stream).
    #[error("Request to {url} failed: {reason}")]
    Request {
        /// The URL being fetched.
        url: String,
        /// Underlying transport error.
        reason: String,
    },

    /// The server answered with a non-success status.
    ///
    /// For retry-eligible statuses this is only returned once the retry
    /// budget is exhausted.
    #[error("Request to {url} failed with HTTP {status} after {attempts} attempt(s)")]
    HttpStatus {
        /// The URL being fetched.
        url: String,
        /// Final HTTP status code.
        status: u16,
        /// Number of requests sent, including the first one.
        attempts: u32,
    },

    /// The body ended before the declared `Content-Length` was reached.
    #[error("Download of {url} is incomplete: expected {expected} bytes, received {received}")]
    IncompleteDownload {
        /// The URL being fetched.
        url: String,
        /// Byte count declared by the server.
        expected: u64,
        /// Bytes actually written.
        received: u64,
    },

    /// A destination file could not be created or written.
    #[error("Failed to write {path}: {reason}")]
    FileWrite {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        reason: String,
    },

    /// A directory could not be created.
    #[error("Failed to create directory {path}: {reason}")]
    DirectoryCreate {
        /// Directory that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        reason: String,
    },

    /// No URL was supplied for a single-link download.
    #[error("No link provided")]
    EmptyUrl,

    /// An input directory does not exist.
    #[error("Folder does not exist: {0}")]
    DirectoryNotFound(PathBuf),

    /// A link folder contains no `.txt` link-list files.
    #[error("No .txt files found in {0}")]
    NoLinkLists(PathBuf),

    /// A link-list file contains no links.
    #[error("No links found in {0}")]
    EmptyLinkList(PathBuf),

    /// A directory contains no supported video files.
    #[error("No videos found in {0}")]
    NoVideosFound(PathBuf),

    /// An orientation string was neither `portrait` nor `landscape`.
    #[error("Invalid orientation: {0} (expected portrait or landscape)")]
    InvalidOrientation(String),

    /// An FFmpeg log level string was not recognised.
    #[error("Unsupported FFmpeg log level: {0}")]
    InvalidLogLevel(String),

    /// The media file could not be opened.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::VideoFile::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in {path}")]
    NoVideoStream {
        /// The media file that was opened.
        path: PathBuf,
    },

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// An extracted frame could not be written to disk.
    #[error("Failed to write frame {path}: {reason}")]
    FrameWrite {
        /// Frame image path.
        path: PathBuf,
        /// Underlying encoder or I/O error.
        reason: String,
    },

    /// Extraction of one video stopped part-way through.
    ///
    /// Frames written before the failure are kept on disk.
    #[error("Extraction of {video} stopped after {frames_written} frame(s): {source}")]
    ExtractionAborted {
        /// Name of the video file.
        video: String,
        /// Frames successfully written before the failure.
        frames_written: u64,
        /// What stopped the extraction.
        #[source]
        source: Box<VidgrabError>,
    },

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate during resizing or encoding.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),
}

impl From<FfmpegError> for VidgrabError {
    fn from(error: FfmpegError) -> Self {
        VidgrabError::FfmpegError(error.to_string())
    }
}

impl VidgrabError {
    /// Number of frames that made it to disk before the error, for
    /// [`ExtractionAborted`](VidgrabError::ExtractionAborted). `0` otherwise.
    pub fn frames_written(&self) -> u64 {
        match self {
            VidgrabError::ExtractionAborted { frames_written, .. } => *frames_written,
            _ => 0,
        }
    }

    /// Returns `true` for errors caused by invalid user input rather than by
    /// the network, the filesystem, or a media file.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            VidgrabError::EmptyUrl
                | VidgrabError::DirectoryNotFound(_)
                | VidgrabError::NoLinkLists(_)
                | VidgrabError::EmptyLinkList(_)
                | VidgrabError::NoVideosFound(_)
                | VidgrabError::InvalidOrientation(_)
                | VidgrabError::InvalidLogLevel(_)
        )
    }
}
