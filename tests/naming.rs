//! Filename extraction and collision-avoidance tests.

use std::{collections::HashSet, fs};

use tempfile::TempDir;
use vidgrab::{
    FilenameResolver,
    naming::{DEFAULT_FILE_NAME, batch_file_name, single_link_file_name, url_file_name},
};

// ── url_file_name ──────────────────────────────────────────────────

#[test]
fn url_file_name_takes_last_segment() {
    assert_eq!(
        url_file_name("https://cdn.example.com/media/2024/clip.mp4").as_deref(),
        Some("clip.mp4")
    );
}

#[test]
fn url_file_name_strips_query_and_fragment() {
    assert_eq!(
        url_file_name("https://example.com/v/clip.mov?sig=abc&exp=1#t=10").as_deref(),
        Some("clip.mov")
    );
}

#[test]
fn url_file_name_empty_segment() {
    assert_eq!(url_file_name("https://example.com/videos/"), None);
    assert_eq!(url_file_name("https://example.com"), None);
    assert_eq!(url_file_name("https://example.com/?id=3"), None);
}

#[test]
fn url_file_name_without_scheme() {
    assert_eq!(
        url_file_name("example.com/a/b.mkv?x=1").as_deref(),
        Some("b.mkv")
    );
}

#[test]
fn single_link_falls_back_to_default() {
    assert_eq!(
        single_link_file_name("https://example.com/watch/"),
        DEFAULT_FILE_NAME
    );
    assert_eq!(
        single_link_file_name("https://example.com/watch/a.mp4"),
        "a.mp4"
    );
}

#[test]
fn batch_names_synthesised_from_list() {
    assert_eq!(batch_file_name("https://x.test/", "holiday", 0, 3), "holiday_1.mp4");
    assert_eq!(batch_file_name("https://x.test/", "holiday", 2, 3), "holiday_3.mp4");
    assert_eq!(batch_file_name("https://x.test/", "holiday", 0, 1), "holiday.mp4");
    assert_eq!(
        batch_file_name("https://x.test/a.avi", "holiday", 0, 3),
        "a.avi"
    );
}

// ── FilenameResolver ───────────────────────────────────────────────

#[test]
fn resolver_returns_plain_name_when_free() {
    let directory = TempDir::new().unwrap();
    let mut resolver = FilenameResolver::new();
    let path = resolver.resolve(directory.path(), "clip.mp4");
    assert_eq!(path, directory.path().join("clip.mp4"));
    assert_eq!(resolver.claimed_count(), 1);
}

#[test]
fn resolver_appends_counter_before_extension() {
    let directory = TempDir::new().unwrap();
    fs::write(directory.path().join("clip.mp4"), b"x").unwrap();
    fs::write(directory.path().join("clip_1.mp4"), b"x").unwrap();

    let mut resolver = FilenameResolver::new();
    let path = resolver.resolve(directory.path(), "clip.mp4");
    assert_eq!(path, directory.path().join("clip_2.mp4"));
}

#[test]
fn resolver_without_extension() {
    let directory = TempDir::new().unwrap();
    fs::write(directory.path().join("README"), b"x").unwrap();
    fs::write(directory.path().join(".hidden"), b"x").unwrap();

    let mut resolver = FilenameResolver::new();
    assert_eq!(
        resolver.resolve(directory.path(), "README"),
        directory.path().join("README_1")
    );
    assert_eq!(
        resolver.resolve(directory.path(), ".hidden"),
        directory.path().join(".hidden_1")
    );
}

#[test]
fn resolver_yields_distinct_unused_paths() {
    let directory = TempDir::new().unwrap();
    let existing = 4;
    fs::write(directory.path().join("clip.mp4"), b"x").unwrap();
    for counter in 1..existing {
        fs::write(directory.path().join(format!("clip_{counter}.mp4")), b"x").unwrap();
    }

    // Nothing is written between calls, so only the resolver's memory keeps
    // the paths apart.
    let mut resolver = FilenameResolver::new();
    let paths: Vec<_> = (0..=existing)
        .map(|_| resolver.resolve(directory.path(), "clip.mp4"))
        .collect();

    let unique: HashSet<_> = paths.iter().collect();
    assert_eq!(unique.len(), paths.len());
    for path in &paths {
        assert!(!path.exists(), "{} already existed", path.display());
    }
    assert_eq!(paths[0], directory.path().join("clip_4.mp4"));
}
