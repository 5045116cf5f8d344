use std::{
    path::{Path, PathBuf},
    process,
    sync::{Arc, Mutex},
    time::Duration,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, LevelFilter, Log, Metadata, Record};
use serde_json::json;
use vidgrab::{
    DownloadOptions, DownloadReport, Downloader, ExtractOptions, ExtractionReport, FfmpegLogLevel,
    OperationType, Orientation, ProgressCallback, ProgressInfo, RetryPolicy, TransportClient,
    TransportOptions, VideoFile, configuration::DEFAULT_JPEG_QUALITY,
};

const CLI_AFTER_HELP: &str = "Examples:\n  vidgrab download https://example.com/clip.mp4 --out downloads\n  vidgrab download-folder links --out downloads --progress\n  vidgrab extract-frames clips --orientation portrait --quality 90\n  vidgrab probe clips/intro.mp4 --json\n  vidgrab completions zsh > _vidgrab";

/// Exit status when a batch finished but some tasks failed.
const EXIT_PARTIAL_FAILURE: i32 = 2;

#[derive(Debug, Parser)]
#[command(
    name = "vidgrab",
    version,
    about = "Download videos and extract their frames as JPEG images",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only show errors.
    #[arg(long)]
    quiet: bool,

    /// Show progress bars for downloads and frame extraction.
    #[arg(long)]
    progress: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long)]
    log_level: Option<FfmpegLogLevel>,

    /// Retries after the first attempt for transient HTTP failures.
    #[arg(long)]
    retries: Option<u32>,

    /// Base backoff delay in milliseconds, doubled on every retry.
    #[arg(long)]
    backoff_ms: Option<u64>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download a single URL.
    #[command(
        about = "Download one video",
        after_help = "Examples:\n  vidgrab download https://example.com/clip.mp4 --out downloads"
    )]
    Download {
        /// URL to download.
        url: String,
        /// Destination directory, created if missing.
        #[arg(long)]
        out: PathBuf,
    },

    /// Download every link of every `.txt` list in a folder.
    #[command(
        about = "Download all links from a folder of link lists",
        after_help = "Examples:\n  vidgrab download-folder links\n  vidgrab download-folder links --out downloads --progress"
    )]
    DownloadFolder {
        /// Folder holding `.txt` link lists, one URL per line.
        folder: PathBuf,
        /// Destination directory. Defaults to the link folder.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Extract all frames of every video in a directory.
    #[command(
        about = "Extract video frames as numbered JPEGs",
        after_help = "Examples:\n  vidgrab extract-frames clips --orientation landscape\n  vidgrab extract-frames clips --orientation portrait --quality 85 --threads 8 --progress"
    )]
    ExtractFrames {
        /// Directory holding .mp4, .avi, .mov or .mkv files.
        directory: PathBuf,
        /// Output orientation: portrait | landscape.
        #[arg(long)]
        orientation: Orientation,
        /// JPEG quality (1-100).
        #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: u8,
        /// FFmpeg decoder threads per video.
        #[arg(long, default_value_t = 4)]
        threads: usize,
    },

    /// Print the properties of a video file.
    #[command(
        about = "Print video stream properties",
        after_help = "Examples:\n  vidgrab probe clip.mp4\n  vidgrab probe clip.mp4 --json"
    )]
    Probe {
        /// Video file path.
        video: PathBuf,
        /// Output as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// Writes crate log records to stderr with a coloured level tag.
struct CliLogger;

static LOGGER: CliLogger = CliLogger;

impl Log for CliLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        // HTTP and TLS crates log every connection at debug and info; only
        // their warnings and errors are shown.
        metadata.level() <= log::max_level()
            && (metadata.target().starts_with("vidgrab") || metadata.level() <= Level::Warn)
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            Level::Error => "error:".red().bold(),
            Level::Warn => "warning:".yellow().bold(),
            Level::Info => "info:".cyan().bold(),
            Level::Debug => "debug:".dimmed(),
            Level::Trace => "trace:".dimmed(),
        };
        eprintln!("{tag} {}", record.args());
    }

    fn flush(&self) {}
}

fn log_level_filter(global: &GlobalOptions) -> LevelFilter {
    if global.quiet {
        LevelFilter::Error
    } else if global.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    log::set_logger(&LOGGER).map_err(|error| error.to_string())?;
    log::set_max_level(log_level_filter(global));

    if let Some(level) = global.log_level {
        vidgrab::set_ffmpeg_log_level(level);
    }

    Ok(())
}

fn transport_options(global: &GlobalOptions) -> TransportOptions {
    let mut retry = RetryPolicy::new();
    if let Some(retries) = global.retries {
        retry = retry.with_max_retries(retries);
    }
    if let Some(backoff_ms) = global.backoff_ms {
        retry = retry.with_backoff_factor(Duration::from_millis(backoff_ms));
    }
    TransportOptions::new().with_retry_policy(retry)
}

/// Progress bars keyed by subject: a new bar starts whenever the download
/// URL or the video being extracted changes.
#[derive(Default)]
struct TerminalProgress {
    active: Mutex<Option<(String, ProgressBar)>>,
}

impl TerminalProgress {
    fn new() -> Self {
        Self::default()
    }

    fn bar_for(info: &ProgressInfo) -> ProgressBar {
        let template = match (info.operation, info.total.is_some()) {
            (OperationType::Download, true) => {
                "{spinner:.green} {bar:40.cyan/blue} {bytes}/{total_bytes} {msg}"
            }
            (OperationType::Download, false) => "{spinner:.green} {bytes} {msg}",
            (_, true) => "{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}",
            (_, false) => "{spinner:.green} {pos} frames {msg}",
        };

        let bar = match info.total {
            Some(total) => ProgressBar::new(total),
            None => ProgressBar::new_spinner(),
        };
        if let Ok(style) = ProgressStyle::with_template(template) {
            bar.set_style(style.progress_chars("##-"));
        }
        bar.set_message(info.subject.clone());
        bar
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        let Ok(mut active) = self.active.lock() else {
            return;
        };

        let stale = active
            .as_ref()
            .is_none_or(|(subject, _)| subject != &info.subject);
        if stale {
            if let Some((_, previous)) = active.take() {
                previous.finish_and_clear();
            }
            *active = Some((info.subject.clone(), Self::bar_for(info)));
        }

        if let Some((_, bar)) = active.as_ref() {
            // Frame counts are estimates; let the bar grow past them.
            if bar.length().is_some_and(|length| info.current > length) {
                bar.set_length(info.current);
            }
            bar.set_position(info.current);
            if info.finished {
                bar.finish_and_clear();
            }
        }
        if info.finished {
            *active = None;
        }
    }
}

fn progress_callback(global: &GlobalOptions) -> Option<Arc<dyn ProgressCallback>> {
    global
        .progress
        .then(|| Arc::new(TerminalProgress::new()) as Arc<dyn ProgressCallback>)
}

fn print_download_report(report: &DownloadReport) {
    for outcome in &report.outcomes {
        match &outcome.error {
            None => println!(
                "{} {} ({} bytes)",
                "success:".green().bold(),
                outcome.task.destination().display(),
                outcome.bytes_written,
            ),
            Some(error) => println!(
                "{} {}: {error}",
                "failed:".red().bold(),
                outcome.task.url()
            ),
        }
    }
    for skipped in &report.skipped {
        println!(
            "{} skipped {}: {}",
            "warning:".yellow().bold(),
            skipped.path.display(),
            skipped.reason,
        );
    }
    println!(
        "{} succeeded, {} failed, {} list(s) skipped",
        report.succeeded(),
        report.failed(),
        report.skipped.len(),
    );
}

fn print_extraction_report(report: &ExtractionReport) {
    for outcome in &report.outcomes {
        let name = outcome
            .video
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        match &outcome.error {
            None => println!(
                "{} {name}: {} frames",
                "success:".green().bold(),
                outcome.frames_written,
            ),
            Some(error) => println!("{} {name}: {error}", "failed:".red().bold()),
        }
    }
    println!(
        "{} of {} videos extracted, {} frames written",
        report.succeeded(),
        report.outcomes.len(),
        report.total_frames(),
    );
}

fn download_options(global: &GlobalOptions) -> DownloadOptions {
    match progress_callback(global) {
        Some(callback) => DownloadOptions::new().with_progress(callback),
        None => DownloadOptions::new(),
    }
}

fn probe(video: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let file = VideoFile::open(video)?;
    let source = file.source();
    if json {
        let payload = json!({
            "path": source.path.display().to_string(),
            "width": source.width,
            "height": source.height,
            "rotation": source.rotation,
            "frame_count": source.frame_count,
            "fps": source.frames_per_second,
            "codec": source.codec,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("File: {}", source.path.display());
        println!(
            "Video: {}x{} @ {:.2} fps [{}]",
            source.width, source.height, source.frames_per_second, source.codec,
        );
        if source.rotation != 0 {
            println!("Rotation: {} degrees clockwise", source.rotation);
        }
        println!("Frames: ~{}", source.frame_count);
    }
    Ok(())
}

/// Runs the selected command. Returns `false` if a batch had failures.
fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Download { url, out } => {
            let client = TransportClient::new(&transport_options(&cli.global))?;
            let downloader = Downloader::new(&client, download_options(&cli.global));
            let report = vidgrab::download_single(&downloader, &url, &out)?;
            print_download_report(&report);
            Ok(report.is_clean())
        }
        Commands::DownloadFolder { folder, out } => {
            let destination = out.unwrap_or_else(|| folder.clone());
            let client = TransportClient::new(&transport_options(&cli.global))?;
            let downloader = Downloader::new(&client, download_options(&cli.global));
            let report = vidgrab::download_from_folder(&downloader, &folder, &destination)?;
            print_download_report(&report);
            Ok(report.is_clean())
        }
        Commands::ExtractFrames {
            directory,
            orientation,
            quality,
            threads,
        } => {
            let mut options = ExtractOptions::new()
                .with_jpeg_quality(quality)
                .with_decoder_threads(threads);
            if let Some(callback) = progress_callback(&cli.global) {
                options = options.with_progress(callback);
            }
            let report = vidgrab::extract_directory(&directory, orientation, &options)?;
            print_extraction_report(&report);
            Ok(report.failed() == 0)
        }
        Commands::Probe { video, json } => {
            probe(&video, json)?;
            Ok(true)
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "vidgrab", &mut std::io::stdout());
            Ok(true)
        }
    }
}

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => process::exit(EXIT_PARTIAL_FAILURE),
        Err(error) => {
            eprintln!("{} {error}", "error:".red().bold());
            process::exit(1);
        }
    }
}
