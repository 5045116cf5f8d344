//! Frame extraction driven by synthetic frame sources.
//!
//! These tests need no fixtures: frames come from in-memory generators that
//! implement `FrameSource`.

use std::{
    fs,
    path::Path,
    sync::{Arc, Mutex},
};

use image::{Rgb, RgbImage};
use tempfile::TempDir;
use vidgrab::{
    ExtractOptions, ExtractionJob, FrameSource, OperationType, Orientation, ProgressCallback,
    ProgressInfo, VideoSource, VidgrabError, extract_frames, video::frame_file_name,
};

/// Yields `count` frames of `width` × `height`, optionally failing at
/// `fail_at`.
struct SyntheticFrames {
    source: VideoSource,
    width: u32,
    height: u32,
    count: u64,
    produced: u64,
    fail_at: Option<u64>,
    requested: Option<(u32, u32)>,
}

impl SyntheticFrames {
    fn new(width: u32, height: u32, count: u64) -> Self {
        Self {
            source: VideoSource::new("synthetic.mp4", width, height, count),
            width,
            height,
            count,
            produced: 0,
            fail_at: None,
            requested: None,
        }
    }

    fn failing_at(mut self, index: u64) -> Self {
        self.fail_at = Some(index);
        self
    }

    fn declaring(mut self, frame_count: u64) -> Self {
        self.source.frame_count = frame_count;
        self
    }
}

impl FrameSource for SyntheticFrames {
    fn source(&self) -> &VideoSource {
        &self.source
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>, VidgrabError> {
        if self.fail_at == Some(self.produced) {
            return Err(VidgrabError::VideoDecodeError("corrupt packet".to_string()));
        }
        if self.produced == self.count {
            return Ok(None);
        }
        let shade = (self.produced % 256) as u8;
        self.produced += 1;
        Ok(Some(RgbImage::from_pixel(
            self.width,
            self.height,
            Rgb([shade, 255 - shade, 128]),
        )))
    }

    fn set_output_dimensions(&mut self, width: u32, height: u32) {
        self.requested = Some((width, height));
    }
}

struct RecordingProgress {
    infos: Mutex<Vec<ProgressInfo>>,
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.infos.lock().unwrap().push(info.clone());
    }
}

fn written_frames(directory: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(directory)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn dimensions(path: &Path) -> (u32, u32) {
    image::image_dimensions(path).unwrap()
}

// ── Orientation ────────────────────────────────────────────────────

#[test]
fn orientation_parses_case_insensitively() {
    assert_eq!("portrait".parse::<Orientation>().unwrap(), Orientation::Portrait);
    assert_eq!(" LANDSCAPE ".parse::<Orientation>().unwrap(), Orientation::Landscape);
    match "square".parse::<Orientation>() {
        Err(VidgrabError::InvalidOrientation(value)) => assert_eq!(value, "square"),
        other => panic!("Expected InvalidOrientation, got: {other:?}"),
    }
}

#[test]
fn orientation_target_dimensions() {
    assert_eq!(Orientation::Portrait.target_dimensions(1920, 1080), (1080, 1920));
    assert_eq!(Orientation::Portrait.target_dimensions(1080, 1920), (1080, 1920));
    assert_eq!(Orientation::Landscape.target_dimensions(1080, 1920), (1920, 1080));
    assert_eq!(Orientation::Landscape.target_dimensions(1920, 1080), (1920, 1080));
    assert_eq!(Orientation::Portrait.target_dimensions(500, 500), (500, 500));
    assert_eq!(Orientation::Landscape.target_dimensions(500, 500), (500, 500));
}

#[test]
fn extraction_job_layout() {
    let job = ExtractionJob::new(
        VideoSource::new("/videos/intro.mkv", 64, 32, 10),
        Orientation::Portrait,
        Path::new("/videos"),
    );
    assert_eq!(job.output_directory(), Path::new("/videos/intro"));
    assert_eq!(job.target_dimensions(), (32, 64));
    assert!(job.needs_resize());
    assert_eq!(job.frame_path(12), Path::new("/videos/intro/intro_00012.jpg"));
}

// ── dimensions ─────────────────────────────────────────────────────

#[test]
fn landscape_source_as_portrait_swaps_every_frame() {
    let working = TempDir::new().unwrap();
    let mut frames = SyntheticFrames::new(64, 36, 12);
    let job = ExtractionJob::new(frames.source().clone(), Orientation::Portrait, working.path());

    let written = extract_frames(&mut frames, &job, &ExtractOptions::new()).unwrap();
    assert_eq!(written, 12);

    let output = working.path().join("synthetic");
    let names = written_frames(&output);
    assert_eq!(names.len(), 12);
    for name in names {
        assert_eq!(dimensions(&output.join(name)), (36, 64));
    }
}

#[test]
fn portrait_source_as_landscape_swaps_every_frame() {
    let working = TempDir::new().unwrap();
    let mut frames = SyntheticFrames::new(36, 64, 5);
    let job = ExtractionJob::new(frames.source().clone(), Orientation::Landscape, working.path());

    extract_frames(&mut frames, &job, &ExtractOptions::new()).unwrap();

    let output = working.path().join("synthetic");
    for name in written_frames(&output) {
        assert_eq!(dimensions(&output.join(name)), (64, 36));
    }
}

#[test]
fn matching_orientation_keeps_native_size() {
    let working = TempDir::new().unwrap();
    let mut frames = SyntheticFrames::new(64, 36, 5);
    let job = ExtractionJob::new(frames.source().clone(), Orientation::Landscape, working.path());
    assert!(!job.needs_resize());

    extract_frames(&mut frames, &job, &ExtractOptions::new()).unwrap();

    let output = working.path().join("synthetic");
    for name in written_frames(&output) {
        assert_eq!(dimensions(&output.join(name)), (64, 36));
    }
}

#[test]
fn target_size_is_requested_from_source() {
    let working = TempDir::new().unwrap();
    let mut frames = SyntheticFrames::new(64, 36, 1);
    let job = ExtractionJob::new(frames.source().clone(), Orientation::Portrait, working.path());

    extract_frames(&mut frames, &job, &ExtractOptions::new()).unwrap();
    assert_eq!(frames.requested, Some((36, 64)));
}

#[test]
fn frames_of_unexpected_size_are_scaled_to_target() {
    // The source declares 64x36 but produces 80x40 frames.
    let working = TempDir::new().unwrap();
    let mut frames = SyntheticFrames::new(80, 40, 3);
    frames.source.width = 64;
    frames.source.height = 36;
    let job = ExtractionJob::new(frames.source().clone(), Orientation::Landscape, working.path());

    extract_frames(&mut frames, &job, &ExtractOptions::new()).unwrap();

    let output = working.path().join("synthetic");
    for name in written_frames(&output) {
        assert_eq!(dimensions(&output.join(name)), (64, 36));
    }
}

// ── naming ─────────────────────────────────────────────────────────

#[test]
fn frame_names_are_contiguous_and_padded() {
    let working = TempDir::new().unwrap();
    // The declared count is wrong on purpose; naming must not depend on it.
    let mut frames = SyntheticFrames::new(16, 16, 11).declaring(3);
    let job = ExtractionJob::new(frames.source().clone(), Orientation::Portrait, working.path());

    let written = extract_frames(&mut frames, &job, &ExtractOptions::new()).unwrap();
    assert_eq!(written, 11);

    let expected: Vec<String> = (0..11).map(|index| frame_file_name("synthetic", index)).collect();
    assert_eq!(written_frames(&working.path().join("synthetic")), expected);
    assert_eq!(expected[0], "synthetic_00000.jpg");
    assert_eq!(expected[10], "synthetic_00010.jpg");
}

#[test]
fn empty_source_writes_nothing() {
    let working = TempDir::new().unwrap();
    let mut frames = SyntheticFrames::new(16, 16, 0);
    let job = ExtractionJob::new(frames.source().clone(), Orientation::Portrait, working.path());

    assert_eq!(extract_frames(&mut frames, &job, &ExtractOptions::new()).unwrap(), 0);
    assert!(written_frames(&working.path().join("synthetic")).is_empty());
}

// ── failures ───────────────────────────────────────────────────────

#[test]
fn decode_failure_keeps_written_frames() {
    let working = TempDir::new().unwrap();
    let mut frames = SyntheticFrames::new(32, 16, 10).failing_at(4);
    let job = ExtractionJob::new(frames.source().clone(), Orientation::Landscape, working.path());

    let error = extract_frames(&mut frames, &job, &ExtractOptions::new()).unwrap_err();
    match &error {
        VidgrabError::ExtractionAborted {
            video,
            frames_written,
            source,
        } => {
            assert_eq!(video, "synthetic.mp4");
            assert_eq!(*frames_written, 4);
            assert!(matches!(**source, VidgrabError::VideoDecodeError(_)));
        }
        other => panic!("Expected ExtractionAborted, got: {other}"),
    }
    assert_eq!(error.frames_written(), 4);
    assert_eq!(written_frames(&working.path().join("synthetic")).len(), 4);
}

#[test]
fn write_failure_keeps_written_frames() {
    let working = TempDir::new().unwrap();
    let output = working.path().join("synthetic");
    // A directory where frame 2 should be written.
    fs::create_dir_all(output.join(frame_file_name("synthetic", 2))).unwrap();
    let mut frames = SyntheticFrames::new(32, 16, 6);
    let job = ExtractionJob::new(frames.source().clone(), Orientation::Landscape, working.path());

    let error = extract_frames(&mut frames, &job, &ExtractOptions::new()).unwrap_err();
    match &error {
        VidgrabError::ExtractionAborted {
            frames_written,
            source,
            ..
        } => {
            assert_eq!(*frames_written, 2);
            match &**source {
                VidgrabError::FrameWrite { path, .. } => {
                    assert_eq!(path, &output.join("synthetic_00002.jpg"));
                }
                other => panic!("Expected FrameWrite, got: {other}"),
            }
        }
        other => panic!("Expected ExtractionAborted, got: {other}"),
    }

    assert!(output.join("synthetic_00000.jpg").is_file());
    assert!(output.join("synthetic_00001.jpg").is_file());
    assert!(!output.join("synthetic_00003.jpg").exists());
    // Decoding stopped at the frame that could not be written.
    assert_eq!(frames.produced, 3);
}

#[test]
fn unwritable_output_directory_fails_before_decoding() {
    let working = TempDir::new().unwrap();
    // A file where the output directory should go.
    fs::write(working.path().join("synthetic"), b"in the way").unwrap();
    let mut frames = SyntheticFrames::new(16, 16, 3);
    let job = ExtractionJob::new(frames.source().clone(), Orientation::Portrait, working.path());

    let error = extract_frames(&mut frames, &job, &ExtractOptions::new()).unwrap_err();
    assert!(matches!(error, VidgrabError::DirectoryCreate { .. }));
    assert_eq!(frames.produced, 0);
}

// ── output options ─────────────────────────────────────────────────

#[test]
fn jpeg_quality_affects_file_size() {
    let encode = |quality: u8| {
        let working = TempDir::new().unwrap();
        let mut frames = NoisyFrames { remaining: 1 };
        let job = ExtractionJob::new(frames.source().clone(), Orientation::Landscape, working.path());
        let options = ExtractOptions::new().with_jpeg_quality(quality);
        extract_frames(&mut frames, &job, &options).unwrap();
        fs::metadata(working.path().join("noise").join("noise_00000.jpg"))
            .unwrap()
            .len()
    };

    assert!(encode(100) > encode(10));
}

/// One 64x64 frame of high-frequency noise, which compresses poorly.
struct NoisyFrames {
    remaining: u32,
}

impl FrameSource for NoisyFrames {
    fn source(&self) -> &VideoSource {
        static SOURCE: std::sync::OnceLock<VideoSource> = std::sync::OnceLock::new();
        SOURCE.get_or_init(|| VideoSource::new("noise.avi", 64, 64, 1))
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>, VidgrabError> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        Ok(Some(RgbImage::from_fn(64, 64, |x, y| {
            let value = ((x * 7919 + y * 104_729) % 256) as u8;
            Rgb([value, value.wrapping_mul(3), value.wrapping_add(91)])
        })))
    }
}

#[test]
fn progress_reports_every_batch() {
    let working = TempDir::new().unwrap();
    let recorder = Arc::new(RecordingProgress {
        infos: Mutex::new(Vec::new()),
    });
    let options = ExtractOptions::new()
        .with_progress(recorder.clone())
        .with_batch_size(5);
    let mut frames = SyntheticFrames::new(16, 16, 12);
    let job = ExtractionJob::new(frames.source().clone(), Orientation::Portrait, working.path());

    extract_frames(&mut frames, &job, &options).unwrap();

    let infos = recorder.infos.lock().unwrap();
    // Frames 5 and 10, then the final report.
    assert_eq!(infos.len(), 3);
    assert_eq!(infos[0].current, 5);
    assert_eq!(infos[0].current_frame, Some(4));
    assert_eq!(infos[1].current, 10);
    let last = infos.last().unwrap();
    assert!(last.finished);
    assert_eq!(last.current, 12);
    assert_eq!(last.total, Some(12));
    for info in infos.iter() {
        assert_eq!(info.operation, OperationType::FrameExtraction);
        assert_eq!(info.subject, "synthetic.mp4");
    }
}
