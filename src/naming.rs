//! Destination filenames for downloads.
//!
//! Names come from the last path segment of the URL. When a URL has no usable
//! segment, single-link downloads fall back to [`DEFAULT_FILE_NAME`] and batch
//! downloads synthesise a name from the link-list file. [`FilenameResolver`]
//! then makes the name unique inside the destination directory so that no
//! existing file, and no path already handed out in the same batch, is ever
//! overwritten.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use url::Url;

/// Fallback name for single-link downloads whose URL has no filename.
pub const DEFAULT_FILE_NAME: &str = "downloaded_video.mp4";

/// Extension used when a batch URL supplies no filename.
pub const DEFAULT_EXTENSION: &str = ".mp4";

/// Extract the filename component of `url`.
///
/// This is the last path segment with the query string and fragment removed.
/// Returns `None` when that segment is empty (e.g. `https://host/videos/`).
///
/// # Example
///
/// ```
/// use vidgrab::naming::url_file_name;
///
/// assert_eq!(
///     url_file_name("https://cdn.example.com/a/clip.mp4?token=1").as_deref(),
///     Some("clip.mp4"),
/// );
/// assert_eq!(url_file_name("https://cdn.example.com/a/"), None);
/// ```
pub fn url_file_name(url: &str) -> Option<String> {
    let segment = match Url::parse(url.trim()) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_string),
        Err(_) => {
            // Not an absolute URL; fall back to plain string splitting.
            let without_query = url.trim().split(['?', '#']).next().unwrap_or_default();
            without_query.rsplit('/').next().map(str::to_string)
        }
    }?;

    if segment.is_empty() || segment == "." || segment == ".." {
        None
    } else {
        Some(segment)
    }
}

/// Filename for a single-link download.
pub fn single_link_file_name(url: &str) -> String {
    url_file_name(url).unwrap_or_else(|| DEFAULT_FILE_NAME.to_string())
}

/// Filename for the link at `index` (0-based) of a link list holding
/// `link_count` links.
///
/// Uses the URL's own filename when it has one. Otherwise the name is
/// `<list_stem>_<index + 1>.mp4`, or just `<list_stem>.mp4` when the list
/// holds a single link.
///
/// # Example
///
/// ```
/// use vidgrab::naming::batch_file_name;
///
/// assert_eq!(batch_file_name("https://example.com/", "trip", 1, 3), "trip_2.mp4");
/// assert_eq!(batch_file_name("https://example.com/", "trip", 0, 1), "trip.mp4");
/// assert_eq!(batch_file_name("https://example.com/x.webm", "trip", 0, 3), "x.webm");
/// ```
pub fn batch_file_name(url: &str, list_stem: &str, index: usize, link_count: usize) -> String {
    if let Some(name) = url_file_name(url) {
        return name;
    }

    if link_count > 1 {
        format!("{list_stem}_{}{DEFAULT_EXTENSION}", index + 1)
    } else {
        format!("{list_stem}{DEFAULT_EXTENSION}")
    }
}

/// Hands out collision-free destination paths.
///
/// A path counts as taken if it exists on disk or was returned earlier by the
/// same resolver. Keep one resolver per batch so that paths stay pairwise
/// distinct even when an earlier download failed before creating its file.
#[derive(Debug, Default)]
pub struct FilenameResolver {
    claimed: HashSet<PathBuf>,
}

impl FilenameResolver {
    /// Create a resolver with no claimed paths.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return an unused path for `file_name` inside `directory` and claim it.
    ///
    /// If `directory/file_name` is taken, `_1`, `_2`, ... is inserted before
    /// the extension until a free name is found: `clip.mp4` becomes
    /// `clip_1.mp4`, then `clip_2.mp4`.
    pub fn resolve(&mut self, directory: &Path, file_name: &str) -> PathBuf {
        let candidate = directory.join(file_name);
        if !self.is_taken(&candidate) {
            return self.claim(candidate);
        }

        let (stem, extension) = split_extension(file_name);
        let mut counter: u64 = 1;
        loop {
            let candidate = directory.join(format!("{stem}_{counter}{extension}"));
            if !self.is_taken(&candidate) {
                log::debug!("{file_name} exists; using {}", candidate.display());
                return self.claim(candidate);
            }
            counter += 1;
        }
    }

    /// Number of paths handed out so far.
    pub fn claimed_count(&self) -> usize {
        self.claimed.len()
    }

    fn is_taken(&self, path: &Path) -> bool {
        self.claimed.contains(path) || path.exists()
    }

    fn claim(&mut self, path: PathBuf) -> PathBuf {
        self.claimed.insert(path.clone());
        path
    }
}

/// Split `name` into stem and extension, keeping the dot on the extension.
///
/// Leading dots do not start an extension, so `.hidden` has none.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(position) if position > 0 => name.split_at(position),
        _ => (name, ""),
    }
}
