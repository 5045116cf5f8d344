//! # vidgrab
//!
//! Download videos over HTTP and split local videos into numbered JPEG
//! frames.
//!
//! `vidgrab` has two pipelines:
//!
//! - a streaming batch downloader that retries transient failures with
//!   exponential backoff and never overwrites an existing file;
//! - a frame extractor that decodes videos with FFmpeg (via
//!   [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next)), optionally swaps
//!   each frame's width and height to match a requested orientation, and
//!   writes every frame as a numbered JPEG.
//!
//! ## Quick Start
//!
//! ### Download a Single Video
//!
//! ```no_run
//! use std::path::Path;
//!
//! use vidgrab::{DownloadOptions, Downloader, TransportClient, TransportOptions, download_single};
//!
//! let client = TransportClient::new(&TransportOptions::new())?;
//! let downloader = Downloader::new(&client, DownloadOptions::new());
//! let report = download_single(&downloader, "https://example.com/clip.mp4", Path::new("downloads"))?;
//! assert!(report.is_clean());
//! # Ok::<(), vidgrab::VidgrabError>(())
//! ```
//!
//! ### Download Every Link in a Folder of Lists
//!
//! ```no_run
//! use std::path::Path;
//!
//! use vidgrab::{DownloadOptions, Downloader, TransportClient, TransportOptions, download_from_folder};
//!
//! let client = TransportClient::new(&TransportOptions::new())?;
//! let downloader = Downloader::new(&client, DownloadOptions::new());
//! let report = download_from_folder(&downloader, Path::new("links"), Path::new("downloads"))?;
//! println!("{} ok, {} failed", report.succeeded(), report.failed());
//! # Ok::<(), vidgrab::VidgrabError>(())
//! ```
//!
//! ### Extract Frames
//!
//! ```no_run
//! use std::path::Path;
//!
//! use vidgrab::{ExtractOptions, Orientation, extract_directory};
//!
//! let options = ExtractOptions::new().with_jpeg_quality(90);
//! let report = extract_directory(Path::new("clips"), Orientation::Portrait, &options)?;
//! println!("{} frames written", report.total_frames());
//! # Ok::<(), vidgrab::VidgrabError>(())
//! ```
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod batch;
pub mod configuration;
mod conversion;
pub mod download;
pub mod error;
pub mod extraction;
pub mod ffmpeg;
pub mod naming;
pub mod progress;
pub mod transport;
pub mod video;

pub use batch::{
    DownloadReport, LinkList, SkippedLinkList, download_from_folder, download_single,
    find_link_lists,
};
pub use configuration::{DownloadOptions, ExtractOptions, RetryPolicy, TransportOptions};
pub use download::{DownloadOutcome, DownloadTask, Downloader};
pub use error::VidgrabError;
pub use extraction::{
    ExtractionReport, VideoOutcome, extract_directory, extract_directory_with, extract_video,
    scan_videos,
};
pub use ffmpeg::{FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level};
pub use naming::FilenameResolver;
pub use progress::{OperationType, ProgressCallback, ProgressInfo};
pub use transport::TransportClient;
pub use video::{
    ExtractedFrame, ExtractionJob, FrameSource, Orientation, VideoFile, VideoSource,
    extract_frames,
};
