//! Error message and classification tests.
//!
//! Every error should name the URL, path or video that failed so it can be
//! reported without extra context.

use std::{io, path::PathBuf};

use vidgrab::{VidgrabError, VideoFile};

#[test]
fn open_invalid_file_names_the_path() {
    vidgrab::set_ffmpeg_log_level(vidgrab::FfmpegLogLevel::Quiet);
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let invalid_file_path = temporary_directory.path().join("invalid.mp4");
    std::fs::write(&invalid_file_path, b"this is not a media file")
        .expect("Failed to write invalid file");

    let error_message = VideoFile::open(&invalid_file_path).unwrap_err().to_string();
    assert!(
        error_message.contains("Failed to open media file"),
        "Error message should mention file open failure: {error_message}",
    );
    assert!(error_message.contains("invalid.mp4"), "{error_message}");
}

#[test]
fn http_status_message() {
    let error = VidgrabError::HttpStatus {
        url: "https://example.com/a.mp4".to_string(),
        status: 503,
        attempts: 6,
    };
    let message = error.to_string();
    assert!(message.contains("https://example.com/a.mp4"), "{message}");
    assert!(message.contains("503"), "{message}");
    assert!(message.contains("6 attempt"), "{message}");
    assert!(!error.is_input_error());
}

#[test]
fn incomplete_download_message() {
    let message = VidgrabError::IncompleteDownload {
        url: "https://example.com/a.mp4".to_string(),
        expected: 1000,
        received: 10,
    }
    .to_string();
    assert!(message.contains("expected 1000 bytes, received 10"), "{message}");
}

#[test]
fn extraction_aborted_keeps_source() {
    use std::error::Error;

    let error = VidgrabError::ExtractionAborted {
        video: "clip.mp4".to_string(),
        frames_written: 41,
        source: Box::new(VidgrabError::FrameWrite {
            path: PathBuf::from("clip/clip_00041.jpg"),
            reason: "disk full".to_string(),
        }),
    };

    assert_eq!(error.frames_written(), 41);
    let message = error.to_string();
    assert!(message.contains("clip.mp4"), "{message}");
    assert!(message.contains("41 frame(s)"), "{message}");
    assert!(message.contains("disk full"), "{message}");

    let source = error.source().expect("source should be set");
    assert!(source.to_string().contains("clip_00041.jpg"));
}

#[test]
fn input_errors_are_classified() {
    let input_errors = [
        VidgrabError::EmptyUrl,
        VidgrabError::DirectoryNotFound(PathBuf::from("links")),
        VidgrabError::NoLinkLists(PathBuf::from("links")),
        VidgrabError::EmptyLinkList(PathBuf::from("links/a.txt")),
        VidgrabError::NoVideosFound(PathBuf::from("clips")),
        VidgrabError::InvalidOrientation("square".to_string()),
        VidgrabError::InvalidLogLevel("loud".to_string()),
    ];
    for error in &input_errors {
        assert!(error.is_input_error(), "{error}");
        assert_eq!(error.frames_written(), 0);
    }

    let io_error = VidgrabError::from(io::Error::other("boom"));
    assert!(!io_error.is_input_error());
    assert!(io_error.to_string().contains("boom"));
}

#[test]
fn ffmpeg_errors_convert() {
    let error = VidgrabError::from(ffmpeg_next::Error::Eof);
    assert!(matches!(error, VidgrabError::FfmpegError(_)));
}
