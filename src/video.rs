//! Video frame extraction.
//!
//! A [`VideoFile`] opens a container with FFmpeg, probes the best video stream
//! into a [`VideoSource`], and then decodes frames strictly in order, turned
//! upright when the stream carries a display rotation. An
//! [`ExtractionJob`] decides from the requested [`Orientation`] whether frames
//! must be reoriented, and [`extract_frames`] writes every frame as a numbered
//! JPEG (`<stem>_00000.jpg`, `<stem>_00001.jpg`, ...) into the job's output
//! directory.
//!
//! The decode side is abstracted behind [`FrameSource`] so the extraction
//! loop does not care where frames come from.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use vidgrab::{ExtractOptions, ExtractionJob, Orientation, VideoFile, extract_frames};
//!
//! let options = ExtractOptions::new();
//! let mut video = VideoFile::open_with_options("clips/intro.mp4", &options)?;
//! let job = ExtractionJob::new(video.source().clone(), Orientation::Portrait, Path::new("clips"));
//! let written = extract_frames(&mut video, &job, &options)?;
//! println!("{written} frames in {}", job.output_directory().display());
//! # Ok::<(), vidgrab::VidgrabError>(())
//! ```

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use ffmpeg_next::{
    Error as FfmpegError, Packet,
    codec::{context::Context as CodecContext, threading},
    decoder::Video as VideoDecoder,
    error::EAGAIN,
    format::{Pixel, context::Input, stream::Stream},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use ffmpeg_sys_next::{AVPacketSideDataType, av_display_rotation_get, av_packet_side_data_get};
use image::{RgbImage, codecs::jpeg::JpegEncoder, imageops, imageops::FilterType};

use crate::{
    batch::ensure_directory,
    configuration::ExtractOptions,
    conversion::{rational_to_f64, rgb_frame_to_image},
    error::VidgrabError,
    progress::{OperationType, ProgressTracker},
};

/// Requested frame orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Height at least as large as width.
    Portrait,
    /// Width at least as large as height.
    Landscape,
}

impl Orientation {
    /// Returns `true` if a `width` × `height` frame already satisfies this
    /// orientation. Square frames satisfy both.
    pub fn matches(self, width: u32, height: u32) -> bool {
        match self {
            Orientation::Portrait => height >= width,
            Orientation::Landscape => width >= height,
        }
    }

    /// Output dimensions for a `width` × `height` source.
    ///
    /// The source dimensions are kept when they already match, and swapped
    /// otherwise.
    ///
    /// # Example
    ///
    /// ```
    /// use vidgrab::Orientation;
    ///
    /// assert_eq!(Orientation::Portrait.target_dimensions(1920, 1080), (1080, 1920));
    /// assert_eq!(Orientation::Landscape.target_dimensions(1920, 1080), (1920, 1080));
    /// assert_eq!(Orientation::Landscape.target_dimensions(720, 1280), (1280, 720));
    /// ```
    pub fn target_dimensions(self, width: u32, height: u32) -> (u32, u32) {
        if self.matches(width, height) {
            (width, height)
        } else {
            (height, width)
        }
    }
}

impl FromStr for Orientation {
    type Err = VidgrabError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "portrait" => Ok(Orientation::Portrait),
            "landscape" => Ok(Orientation::Landscape),
            _ => Err(VidgrabError::InvalidOrientation(value.trim().to_string())),
        }
    }
}

impl Display for Orientation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Orientation::Portrait => f.write_str("portrait"),
            Orientation::Landscape => f.write_str("landscape"),
        }
    }
}

/// Properties of a video stream, read once when it is opened.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct VideoSource {
    /// Path of the video file.
    pub path: PathBuf,
    /// Frame width in pixels as displayed, after [`rotation`](Self::rotation).
    pub width: u32,
    /// Frame height in pixels as displayed, after [`rotation`](Self::rotation).
    pub height: u32,
    /// Clockwise rotation in degrees (0, 90, 180 or 270) applied to decoded
    /// frames so they come out upright.
    pub rotation: u32,
    /// Frame count as declared by the container or estimated from duration
    /// and frame rate. Only used for progress; it can be wrong.
    pub frame_count: u64,
    /// Average frame rate, `0.0` if unknown.
    pub frames_per_second: f64,
    /// Codec name (e.g. `"h264"`), `"unknown"` if unavailable.
    pub codec: String,
}

impl VideoSource {
    /// Describe a stream without opening anything.
    pub fn new(path: impl Into<PathBuf>, width: u32, height: u32, frame_count: u64) -> Self {
        Self {
            path: path.into(),
            width,
            height,
            rotation: 0,
            frame_count,
            frames_per_second: 0.0,
            codec: "unknown".to_string(),
        }
    }

    /// File name stem, used for the output directory and frame names.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string())
    }

    /// Size of the frames as stored in the stream, before rotation.
    pub fn coded_dimensions(&self) -> (u32, u32) {
        if self.rotation % 180 == 90 {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }

    /// File name including extension, used in messages.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// One video's extraction plan: where frames go and what size they have.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionJob {
    source: VideoSource,
    orientation: Orientation,
    output_directory: PathBuf,
    target_width: u32,
    target_height: u32,
}

impl ExtractionJob {
    /// Plan extraction of `source` into `<working_directory>/<stem>/`.
    pub fn new(source: VideoSource, orientation: Orientation, working_directory: &Path) -> Self {
        let (target_width, target_height) =
            orientation.target_dimensions(source.width, source.height);
        let output_directory = working_directory.join(source.stem());
        Self {
            source,
            orientation,
            output_directory,
            target_width,
            target_height,
        }
    }

    /// The probed video.
    pub fn source(&self) -> &VideoSource {
        &self.source
    }

    /// The requested orientation.
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Directory the frames are written to.
    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Fixed `(width, height)` of every written frame.
    pub fn target_dimensions(&self) -> (u32, u32) {
        (self.target_width, self.target_height)
    }

    /// Returns `true` if frames are reoriented (dimensions swapped).
    pub fn needs_resize(&self) -> bool {
        (self.target_width, self.target_height) != (self.source.width, self.source.height)
    }

    /// Path of the frame with the given index.
    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.output_directory
            .join(frame_file_name(&self.source.stem(), index))
    }

    /// Turn a decoded frame into the [`ExtractedFrame`] for `index`, scaling
    /// it to the target dimensions when its size differs.
    pub fn prepare_frame(&self, index: u64, image: RgbImage) -> ExtractedFrame {
        let image = if image.dimensions() == (self.target_width, self.target_height) {
            image
        } else {
            image::imageops::resize(
                &image,
                self.target_width,
                self.target_height,
                FilterType::Triangle,
            )
        };

        ExtractedFrame {
            index,
            path: self.frame_path(index),
            image,
        }
    }
}

/// File name of frame `index` of a video with the given stem.
///
/// # Example
///
/// ```
/// use vidgrab::video::frame_file_name;
///
/// assert_eq!(frame_file_name("intro", 7), "intro_00007.jpg");
/// ```
pub fn frame_file_name(stem: &str, index: u64) -> String {
    format!("{stem}_{index:05}.jpg")
}

/// A frame ready to be written.
#[derive(Debug, Clone)]
pub struct ExtractedFrame {
    /// Zero-based position in the output sequence.
    pub index: u64,
    /// Destination file.
    pub path: PathBuf,
    /// Pixel data at the job's target dimensions.
    pub image: RgbImage,
}

impl ExtractedFrame {
    /// Encode the frame as JPEG at `quality` and write it to [`path`](Self::path).
    ///
    /// # Errors
    ///
    /// Returns [`VidgrabError::FrameWrite`] if the file cannot be created or
    /// the encoder fails.
    pub fn write(&self, quality: u8) -> Result<(), VidgrabError> {
        let write_error = |reason: String| VidgrabError::FrameWrite {
            path: self.path.clone(),
            reason,
        };

        let file = File::create(&self.path).map_err(|error| write_error(error.to_string()))?;
        let mut writer = BufWriter::new(file);
        let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
        self.image
            .write_with_encoder(encoder)
            .map_err(|error| write_error(error.to_string()))?;
        writer.flush().map_err(|error| write_error(error.to_string()))
    }
}

/// A sequential supply of decoded RGB frames.
pub trait FrameSource {
    /// The probed properties of the stream.
    fn source(&self) -> &VideoSource;

    /// Decode the next frame in presentation order.
    ///
    /// Returns `Ok(None)` at end of stream; that is the only normal stop.
    fn next_frame(&mut self) -> Result<Option<RgbImage>, VidgrabError>;

    /// Ask for frames of `width` × `height`. Sources that can scale while
    /// decoding use it to skip a second resample; callers still scale any
    /// frame that comes out at another size.
    fn set_output_dimensions(&mut self, _width: u32, _height: u32) {}
}

/// What the decoder said when asked for a frame.
#[derive(Debug, PartialEq, Eq)]
enum DecoderState {
    FrameReady,
    NeedsInput,
    Drained,
    Failed(FfmpegError),
}

impl DecoderState {
    fn from_receive(result: Result<(), FfmpegError>) -> Self {
        match result {
            Ok(()) => DecoderState::FrameReady,
            Err(FfmpegError::Other { errno }) if errno == EAGAIN => DecoderState::NeedsInput,
            Err(FfmpegError::Eof) => DecoderState::Drained,
            Err(error) => DecoderState::Failed(error),
        }
    }
}

/// Round a display-matrix angle (degrees, counter-clockwise) to the
/// clockwise quarter turn that makes the frame upright.
fn upright_rotation(counter_clockwise: f64) -> u32 {
    if !counter_clockwise.is_finite() {
        return 0;
    }
    let quarter_turns = ((-counter_clockwise).rem_euclid(360.0) / 90.0).round() as u32;
    (quarter_turns % 4) * 90
}

/// Clockwise rotation declared by the stream's display matrix, 0 if none.
fn display_rotation(stream: &Stream<'_>) -> u32 {
    const MATRIX_BYTES: usize = 9 * std::mem::size_of::<i32>();

    // SAFETY: the stream and its codec parameters live as long as the input
    // context borrowed by `stream`; the side data is only read when FFmpeg
    // reports a full 3x3 matrix.
    let counter_clockwise = unsafe {
        let parameters = (*stream.as_ptr()).codecpar;
        if parameters.is_null() {
            return 0;
        }
        let side_data = av_packet_side_data_get(
            (*parameters).coded_side_data,
            (*parameters).nb_coded_side_data,
            AVPacketSideDataType::AV_PKT_DATA_DISPLAYMATRIX,
        );
        if side_data.is_null() || ((*side_data).size as usize) < MATRIX_BYTES {
            return 0;
        }
        av_display_rotation_get((*side_data).data as *const i32)
    };

    upright_rotation(counter_clockwise)
}

/// An opened video file decoded with FFmpeg.
///
/// Dropping the value closes the demuxer and decoder.
pub struct VideoFile {
    input_context: Input,
    decoder: VideoDecoder,
    scaler: Option<ScalingContext>,
    video_stream_index: usize,
    source: VideoSource,
    output_width: u32,
    output_height: u32,
    decoded_frame: VideoFrame,
    rgb_frame: VideoFrame,
    eof_sent: bool,
    done: bool,
}

impl std::fmt::Debug for VideoFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoFile")
            .field("source", &self.source)
            .field("video_stream_index", &self.video_stream_index)
            .field("eof_sent", &self.eof_sent)
            .finish_non_exhaustive()
    }
}

impl VideoFile {
    /// Open a video with default decoder settings.
    ///
    /// # Errors
    ///
    /// See [`open_with_options`](VideoFile::open_with_options).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, VidgrabError> {
        Self::open_with_options(path, &ExtractOptions::new())
    }

    /// Open a video and probe its best video stream.
    ///
    /// Initialises FFmpeg (idempotent), opens the container, and builds a
    /// decoder using `options.decoder_threads` frame threads.
    ///
    /// # Errors
    ///
    /// - [`VidgrabError::FileOpen`] if the file cannot be opened or the
    ///   stream cannot be decoded.
    /// - [`VidgrabError::NoVideoStream`] if there is no video stream.
    pub fn open_with_options<P: AsRef<Path>>(
        path: P,
        options: &ExtractOptions,
    ) -> Result<Self, VidgrabError> {
        let path = path.as_ref();
        let open_error = |reason: String| VidgrabError::FileOpen {
            path: path.to_path_buf(),
            reason,
        };

        log::debug!("Opening video: {}", path.display());

        ffmpeg_next::init()
            .map_err(|error| open_error(format!("FFmpeg initialisation failed: {error}")))?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| open_error(error.to_string()))?;

        let (video_stream_index, decoder, frames_per_second, declared_frames, rotation) = {
            let stream = input_context
                .streams()
                .best(Type::Video)
                .ok_or_else(|| VidgrabError::NoVideoStream {
                    path: path.to_path_buf(),
                })?;

            let mut decoder_context = CodecContext::from_parameters(stream.parameters())
                .map_err(|error| open_error(format!("Failed to read codec parameters: {error}")))?;
            decoder_context.set_threading(threading::Config {
                kind: threading::Type::Frame,
                count: options.decoder_threads,
                ..threading::Config::default()
            });

            let decoder = decoder_context
                .decoder()
                .video()
                .map_err(|error| open_error(format!("Failed to create video decoder: {error}")))?;

            let frames_per_second = rational_to_f64(stream.avg_frame_rate())
                .or_else(|| rational_to_f64(stream.rate()))
                .unwrap_or(0.0);

            let rotation = display_rotation(&stream);

            (
                stream.index(),
                decoder,
                frames_per_second,
                stream.frames(),
                rotation,
            )
        };

        let coded_width = decoder.width();
        let coded_height = decoder.height();
        if coded_width == 0 || coded_height == 0 {
            return Err(open_error(format!(
                "video stream reports invalid dimensions {coded_width}x{coded_height}"
            )));
        }
        let (width, height) = if rotation % 180 == 90 {
            (coded_height, coded_width)
        } else {
            (coded_width, coded_height)
        };

        let frame_count = if declared_frames > 0 {
            declared_frames as u64
        } else {
            let microseconds = input_context.duration();
            if microseconds > 0 && frames_per_second > 0.0 {
                let duration = Duration::from_micros(microseconds as u64);
                (duration.as_secs_f64() * frames_per_second).round() as u64
            } else {
                0
            }
        };

        let codec = decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let source = VideoSource {
            path: path.to_path_buf(),
            width,
            height,
            rotation,
            frame_count,
            frames_per_second,
            codec,
        };

        log::debug!(
            "Probed {}: stream={}, {}x{} (rotation {}), {:.2} fps, codec={}, ~{} frames",
            path.display(),
            video_stream_index,
            source.width,
            source.height,
            source.rotation,
            source.frames_per_second,
            source.codec,
            source.frame_count,
        );

        Ok(Self {
            input_context,
            decoder,
            scaler: None,
            video_stream_index,
            output_width: width,
            output_height: height,
            source,
            decoded_frame: VideoFrame::empty(),
            rgb_frame: VideoFrame::empty(),
            eof_sent: false,
            done: false,
        })
    }

    /// The probed stream properties.
    pub fn source(&self) -> &VideoSource {
        &self.source
    }

    /// Convert `decoded_frame` to an upright RGB image at the output size.
    ///
    /// The scaler converts to RGB24 and resamples in one pass to the output
    /// size before rotation. It is built on the first frame and rebuilt if
    /// the decoder's output format or size changes mid-stream, so every frame
    /// comes out at the same dimensions.
    fn convert_decoded_frame(&mut self) -> Result<RgbImage, VidgrabError> {
        let format = self.decoded_frame.format();
        let width = self.decoded_frame.width();
        let height = self.decoded_frame.height();
        let (scaled_width, scaled_height) = if self.source.rotation % 180 == 90 {
            (self.output_height, self.output_width)
        } else {
            (self.output_width, self.output_height)
        };

        let stale = self.scaler.as_ref().is_none_or(|scaler| {
            let input = scaler.input();
            let output = scaler.output();
            input.format != format
                || input.width != width
                || input.height != height
                || output.width != scaled_width
                || output.height != scaled_height
        });

        if stale {
            if self.scaler.is_some() {
                log::debug!(
                    "{}: rebuilding scaler for {width}x{height} ({format:?}) -> {scaled_width}x{scaled_height}",
                    self.source.file_name(),
                );
            }
            self.scaler = Some(ScalingContext::get(
                format,
                width,
                height,
                Pixel::RGB24,
                scaled_width,
                scaled_height,
                ScalingFlags::BILINEAR,
            )?);
        }

        let scaler = self
            .scaler
            .as_mut()
            .ok_or_else(|| VidgrabError::VideoDecodeError("scaler unavailable".to_string()))?;
        scaler.run(&self.decoded_frame, &mut self.rgb_frame)?;

        let image = rgb_frame_to_image(&self.rgb_frame)?;
        Ok(match self.source.rotation {
            90 => imageops::rotate90(&image),
            180 => imageops::rotate180(&image),
            270 => imageops::rotate270(&image),
            _ => image,
        })
    }

    fn decode_error(&mut self, reason: impl Display) -> VidgrabError {
        self.done = true;
        VidgrabError::VideoDecodeError(format!("{}: {reason}", self.source.file_name()))
    }
}

impl FrameSource for VideoFile {
    fn source(&self) -> &VideoSource {
        &self.source
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>, VidgrabError> {
        if self.done {
            return Ok(None);
        }

        loop {
            let received = self.decoder.receive_frame(&mut self.decoded_frame);
            match DecoderState::from_receive(received) {
                DecoderState::FrameReady => {
                    return match self.convert_decoded_frame() {
                        Ok(image) => Ok(Some(image)),
                        Err(error) => {
                            self.done = true;
                            Err(error)
                        }
                    };
                }
                DecoderState::Drained => {
                    self.done = true;
                    return Ok(None);
                }
                DecoderState::Failed(error) => return Err(self.decode_error(error)),
                DecoderState::NeedsInput if self.eof_sent => {
                    return Err(self.decode_error("decoder stalled after end of input"));
                }
                DecoderState::NeedsInput => {}
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input_context) {
                Ok(()) => {
                    if packet.stream() == self.video_stream_index {
                        if let Err(error) = self.decoder.send_packet(&packet) {
                            return Err(self.decode_error(error));
                        }
                    }
                }
                Err(FfmpegError::Eof) => {
                    if let Err(error) = self.decoder.send_eof() {
                        return Err(self.decode_error(format!("failed to flush decoder: {error}")));
                    }
                    self.eof_sent = true;
                }
                Err(error) => {
                    return Err(self.decode_error(format!("failed to read packet: {error}")));
                }
            }
        }
    }

    fn set_output_dimensions(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.output_width = width;
            self.output_height = height;
        }
    }
}

/// Decode every frame of `frames` and write it according to `job`.
///
/// Frames are written in order starting at index 0 until the source reports
/// end of stream. The probed frame count only feeds progress reports.
/// Returns the number of frames written.
///
/// # Errors
///
/// - [`VidgrabError::DirectoryCreate`] if the output directory cannot be
///   created (nothing is written).
/// - [`VidgrabError::ExtractionAborted`] if a frame fails to decode or write.
///   Frames written before the failure stay on disk and their count is
///   carried by the error.
pub fn extract_frames<S>(
    frames: &mut S,
    job: &ExtractionJob,
    options: &ExtractOptions,
) -> Result<u64, VidgrabError>
where
    S: FrameSource + ?Sized,
{
    ensure_directory(job.output_directory())?;

    let video = job.source().file_name();
    let (target_width, target_height) = job.target_dimensions();
    frames.set_output_dimensions(target_width, target_height);
    log::debug!(
        "{video}: {}x{} -> {target_width}x{target_height} ({}, resize={})",
        job.source().width,
        job.source().height,
        job.orientation(),
        job.needs_resize(),
    );

    let mut tracker = ProgressTracker::new(
        options.progress.clone(),
        OperationType::FrameExtraction,
        video.clone(),
        Some(job.source().frame_count),
        options.batch_size,
    );

    let aborted = |frames_written: u64, source: VidgrabError| VidgrabError::ExtractionAborted {
        video: video.clone(),
        frames_written,
        source: Box::new(source),
    };

    let mut index: u64 = 0;
    while let Some(image) = frames.next_frame().map_err(|error| aborted(index, error))? {
        let frame = job.prepare_frame(index, image);
        frame
            .write(options.jpeg_quality)
            .map_err(|error| aborted(index, error))?;
        tracker.advance(Some(index));
        index += 1;
    }

    tracker.finish();
    Ok(index)
}
