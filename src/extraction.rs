//! Frame extraction over a directory of videos.
//!
//! [`extract_directory`] finds every supported video directly inside a
//! directory, extracts each one into a sibling folder named after the video,
//! and collects the per-video results in an [`ExtractionReport`]. Videos are
//! processed strictly one at a time; a failing video is recorded and the
//! batch moves on.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use vidgrab::{ExtractOptions, Orientation, extract_directory};
//!
//! let report = extract_directory(Path::new("clips"), Orientation::Landscape, &ExtractOptions::new())?;
//! println!("{} of {} videos extracted", report.succeeded(), report.outcomes.len());
//! # Ok::<(), vidgrab::VidgrabError>(())
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    configuration::ExtractOptions,
    error::VidgrabError,
    video::{ExtractionJob, FrameSource, Orientation, VideoFile, extract_frames},
};

/// File extensions treated as videos, compared case-insensitively.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["mp4", "avi", "mov", "mkv"];

/// Returns `true` if `path` has one of the [`SUPPORTED_EXTENSIONS`].
pub fn is_supported_video(path: &Path) -> bool {
    path.extension().is_some_and(|extension| {
        SUPPORTED_EXTENSIONS
            .iter()
            .any(|supported| extension.eq_ignore_ascii_case(supported))
    })
}

/// List the supported videos directly inside `directory`, sorted by filename.
///
/// Subdirectories are not searched. Regular files and symlinks to regular
/// files are returned.
///
/// # Errors
///
/// - [`VidgrabError::DirectoryNotFound`] if `directory` is not a directory.
/// - [`VidgrabError::IoError`] if it cannot be listed.
pub fn scan_videos(directory: &Path) -> Result<Vec<PathBuf>, VidgrabError> {
    if !directory.is_dir() {
        return Err(VidgrabError::DirectoryNotFound(directory.to_path_buf()));
    }

    let mut videos = Vec::new();
    for entry in fs::read_dir(directory)? {
        let path = entry?.path();
        // `Path::is_file` follows symlinks, unlike `DirEntry::file_type`.
        if path.is_file() && is_supported_video(&path) {
            videos.push(path);
        }
    }

    videos.sort();
    Ok(videos)
}

/// Result of extracting one video.
#[derive(Debug)]
pub struct VideoOutcome {
    /// The video file.
    pub video: PathBuf,
    /// Frames written to disk, including those written before a failure.
    pub frames_written: u64,
    /// Why extraction failed, if it did.
    pub error: Option<VidgrabError>,
}

impl VideoOutcome {
    /// Returns `true` if the video was extracted to the end.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of a directory extraction, one entry per video in processing
/// order.
#[derive(Debug, Default)]
pub struct ExtractionReport {
    /// Per-video outcomes.
    pub outcomes: Vec<VideoOutcome>,
}

impl ExtractionReport {
    /// Number of videos extracted to the end.
    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.is_success())
            .count()
    }

    /// Number of videos that failed or stopped part-way.
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Frames written across all videos.
    pub fn total_frames(&self) -> u64 {
        self.outcomes.iter().map(|outcome| outcome.frames_written).sum()
    }
}

/// Open `video` with FFmpeg and extract all of its frames into
/// `<working_directory>/<stem>/`.
///
/// Returns the number of frames written.
///
/// # Errors
///
/// Errors from [`VideoFile::open_with_options`] and [`extract_frames`].
pub fn extract_video(
    video: &Path,
    orientation: Orientation,
    working_directory: &Path,
    options: &ExtractOptions,
) -> Result<u64, VidgrabError> {
    let mut file = VideoFile::open_with_options(video, options)?;
    extract_source(&mut file, orientation, working_directory, options)
}

/// Extract every supported video in `directory`, writing frames next to the
/// videos.
///
/// # Errors
///
/// - [`VidgrabError::DirectoryNotFound`] if `directory` does not exist.
/// - [`VidgrabError::NoVideosFound`] if it holds no supported video.
///
/// Per-video failures are reported in the returned [`ExtractionReport`].
pub fn extract_directory(
    directory: &Path,
    orientation: Orientation,
    options: &ExtractOptions,
) -> Result<ExtractionReport, VidgrabError> {
    extract_directory_with(directory, orientation, options, |path| {
        VideoFile::open_with_options(path, options)
    })
}

/// [`extract_directory`] with a custom way of opening each video.
///
/// `open` is called once per scanned video, in order, and may return any
/// [`FrameSource`].
///
/// # Errors
///
/// Same as [`extract_directory`].
pub fn extract_directory_with<S, F>(
    directory: &Path,
    orientation: Orientation,
    options: &ExtractOptions,
    mut open: F,
) -> Result<ExtractionReport, VidgrabError>
where
    S: FrameSource,
    F: FnMut(&Path) -> Result<S, VidgrabError>,
{
    let videos = scan_videos(directory)?;
    if videos.is_empty() {
        return Err(VidgrabError::NoVideosFound(directory.to_path_buf()));
    }

    let total = videos.len();
    let mut report = ExtractionReport::default();

    for (position, video) in videos.into_iter().enumerate() {
        let name = video
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        log::info!("[{}/{total}] Starting with {name}", position + 1);

        let result = open(&video)
            .and_then(|mut source| extract_source(&mut source, orientation, directory, options));

        let outcome = match result {
            Ok(frames_written) => VideoOutcome {
                video,
                frames_written,
                error: None,
            },
            Err(error) => {
                log::error!("Error processing {name}: {error}");
                VideoOutcome {
                    video,
                    frames_written: error.frames_written(),
                    error: Some(error),
                }
            }
        };
        report.outcomes.push(outcome);
    }

    log::info!(
        "All videos processed: {} succeeded, {} failed, {} frames written",
        report.succeeded(),
        report.failed(),
        report.total_frames(),
    );

    Ok(report)
}

fn extract_source<S>(
    source: &mut S,
    orientation: Orientation,
    working_directory: &Path,
    options: &ExtractOptions,
) -> Result<u64, VidgrabError>
where
    S: FrameSource + ?Sized,
{
    let job = ExtractionJob::new(source.source().clone(), orientation, working_directory);
    let frames_written = extract_frames(source, &job, options)?;
    log::info!("Completed {} with {frames_written} frames", job.source().stem());
    Ok(frames_written)
}
