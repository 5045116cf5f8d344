//! Batch download orchestration.
//!
//! Two entry points turn user input into [`DownloadTask`]s and run them
//! strictly one after another:
//!
//! - [`download_single`]: one URL into a destination directory.
//! - [`download_from_folder`]: every `.txt` link list in a folder, one task per
//!   non-blank line.
//!
//! Individual failures never stop a batch. They are collected in the returned
//! [`DownloadReport`]; only invalid input (missing folder, no link lists,
//! empty URL) is returned as an error, before any download starts.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    download::{DownloadOutcome, DownloadTask, Downloader},
    error::VidgrabError,
    naming::{FilenameResolver, batch_file_name, single_link_file_name},
};

/// A link-list file and the links it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkList {
    path: PathBuf,
    links: Vec<String>,
}

impl LinkList {
    /// Read a link list: one URL per line, whitespace trimmed, blank lines
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`VidgrabError::IoError`] if the file cannot be read as UTF-8.
    pub fn read(path: impl Into<PathBuf>) -> Result<Self, VidgrabError> {
        let path = path.into();
        let contents = fs::read_to_string(&path)?;
        Ok(Self::parse(path, &contents))
    }

    /// Build a link list from already-loaded text.
    pub fn parse(path: impl Into<PathBuf>, contents: &str) -> Self {
        let links = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            path: path.into(),
            links,
        }
    }

    /// Path of the list file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The links, in file order.
    pub fn links(&self) -> &[String] {
        &self.links
    }

    /// Number of links.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns `true` if the list holds no links.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// File stem of the list, used for synthesised download names.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "links".to_string())
    }

    /// Build the task for the link at `index`, claiming its destination.
    ///
    /// Returns `None` if `index` is out of range.
    pub fn task(
        &self,
        index: usize,
        destination: &Path,
        resolver: &mut FilenameResolver,
    ) -> Option<DownloadTask> {
        let url = self.links.get(index)?;
        let file_name = batch_file_name(url, &self.stem(), index, self.links.len());
        let path = resolver.resolve(destination, &file_name);
        Some(DownloadTask::new(url.clone(), path))
    }

    /// Build every task of this list, in order.
    pub fn tasks(&self, destination: &Path, resolver: &mut FilenameResolver) -> Vec<DownloadTask> {
        (0..self.links.len())
            .filter_map(|index| self.task(index, destination, resolver))
            .collect()
    }
}

/// A link-list file that was not processed.
#[derive(Debug)]
pub struct SkippedLinkList {
    /// The list file.
    pub path: PathBuf,
    /// Why it was skipped.
    pub reason: VidgrabError,
}

/// Outcome of a batch download.
#[derive(Debug, Default)]
pub struct DownloadReport {
    /// Per-task outcomes, in execution order.
    pub outcomes: Vec<DownloadOutcome>,
    /// Link lists that were skipped.
    pub skipped: Vec<SkippedLinkList>,
}

impl DownloadReport {
    /// Number of tasks that completed.
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_success()).count()
    }

    /// Number of tasks that failed.
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Returns `true` if every task succeeded and nothing was skipped.
    pub fn is_clean(&self) -> bool {
        self.failed() == 0 && self.skipped.is_empty()
    }
}

/// Download one URL into `destination`.
///
/// The directory is created if needed. The filename comes from the URL (or
/// [`DEFAULT_FILE_NAME`](crate::naming::DEFAULT_FILE_NAME)) and is made unique.
///
/// # Errors
///
/// - [`VidgrabError::EmptyUrl`] if `url` is blank.
/// - [`VidgrabError::DirectoryCreate`] if `destination` cannot be created.
///
/// Download failures are reported in the returned [`DownloadReport`].
pub fn download_single(
    downloader: &Downloader<'_>,
    url: &str,
    destination: &Path,
) -> Result<DownloadReport, VidgrabError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(VidgrabError::EmptyUrl);
    }

    ensure_directory(destination)?;

    let mut resolver = FilenameResolver::new();
    let path = resolver.resolve(destination, &single_link_file_name(url));
    let outcome = downloader.run(DownloadTask::new(url, path));

    Ok(DownloadReport {
        outcomes: vec![outcome],
        skipped: Vec::new(),
    })
}

/// Find the `.txt` files (case-insensitive) directly inside `folder`, sorted
/// by filename.
///
/// # Errors
///
/// - [`VidgrabError::DirectoryNotFound`] if `folder` is not a directory.
/// - [`VidgrabError::IoError`] if the directory cannot be listed.
pub fn find_link_lists(folder: &Path) -> Result<Vec<PathBuf>, VidgrabError> {
    if !folder.is_dir() {
        return Err(VidgrabError::DirectoryNotFound(folder.to_path_buf()));
    }

    let mut lists = Vec::new();
    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        let is_txt = path
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("txt"));
        if is_txt && path.is_file() {
            lists.push(path);
        }
    }

    lists.sort();
    Ok(lists)
}

/// Download every link of every link list in `link_folder` into
/// `destination`.
///
/// Lists are processed in filename order and links in file order. Empty or
/// unreadable lists are recorded as skipped.
///
/// # Errors
///
/// - [`VidgrabError::DirectoryNotFound`] if `link_folder` does not exist.
/// - [`VidgrabError::NoLinkLists`] if it contains no `.txt` file.
/// - [`VidgrabError::DirectoryCreate`] if `destination` cannot be created.
pub fn download_from_folder(
    downloader: &Downloader<'_>,
    link_folder: &Path,
    destination: &Path,
) -> Result<DownloadReport, VidgrabError> {
    let lists = find_link_lists(link_folder)?;
    if lists.is_empty() {
        return Err(VidgrabError::NoLinkLists(link_folder.to_path_buf()));
    }

    ensure_directory(destination)?;
    log::info!("Found {} .txt files in {}", lists.len(), link_folder.display());

    let mut report = DownloadReport::default();
    let mut resolver = FilenameResolver::new();

    for list_path in lists {
        let list = match LinkList::read(&list_path) {
            Ok(list) => list,
            Err(error) => {
                log::warn!("Skipping {}: {error}", list_path.display());
                report.skipped.push(SkippedLinkList {
                    path: list_path,
                    reason: error,
                });
                continue;
            }
        };

        if list.is_empty() {
            log::warn!("No links found in {}. Skipping.", list_path.display());
            report.skipped.push(SkippedLinkList {
                reason: VidgrabError::EmptyLinkList(list_path.clone()),
                path: list_path,
            });
            continue;
        }

        log::debug!("{}: {} link(s)", list_path.display(), list.len());
        for index in 0..list.len() {
            if let Some(task) = list.task(index, destination, &mut resolver) {
                report.outcomes.push(downloader.run(task));
            }
        }
    }

    log::info!(
        "Batch finished: {} succeeded, {} failed, {} list(s) skipped",
        report.succeeded(),
        report.failed(),
        report.skipped.len(),
    );

    Ok(report)
}

/// Create `directory` and any missing parents.
pub(crate) fn ensure_directory(directory: &Path) -> Result<(), VidgrabError> {
    fs::create_dir_all(directory).map_err(|error| VidgrabError::DirectoryCreate {
        path: directory.to_path_buf(),
        reason: error.to_string(),
    })
}
