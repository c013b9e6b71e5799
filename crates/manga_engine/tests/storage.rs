use std::fs;

use manga_core::{Page, Source, WorkUnit};
use manga_engine::{ensure_output_dir, AtomicFileWriter, SourceCache, StorageWriter, WriteOutcome};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn sample_source() -> Source {
    let mut unit = WorkUnit::chapter(1, "Chapter 1: Start?", "https://manganelo.com/ch-1");
    unit.pages = (1..=3)
        .map(|i| {
            Page::resolved(
                i,
                "https://manganelo.com/ch-1",
                format!("https://cdn.example/ch-1/{i}.png"),
            )
        })
        .collect();
    Source::new("https://manganelo.com/manga/x", "Some/Manga", vec![unit])
}

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out").join("nested");
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn output_dir_that_is_a_file_is_rejected() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("taken");
    fs::write(&file, "x").unwrap();
    assert!(ensure_output_dir(&file).is_err());
}

#[test]
fn atomic_write_replaces_existing() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().join("dir"));
    let first = writer.write("a.bin", b"hello").unwrap();
    let second = writer.write("a.bin", b"world").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), b"world");
    let leftovers: Vec<_> = fs::read_dir(temp.path().join("dir"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(leftovers, vec![std::ffi::OsString::from("a.bin")]);
}

#[test]
fn pages_land_under_sanitized_title_and_unit() {
    let temp = TempDir::new().unwrap();
    let storage = StorageWriter::new(temp.path());
    let source = sample_source();
    let unit = &source.units[0];

    // Completion order does not matter; names follow page indexes.
    for page in unit.pages.iter().rev() {
        let outcome = storage
            .write(&source, unit, page, format!("page {}", page.index).as_bytes(), None)
            .unwrap();
        assert!(matches!(outcome, WriteOutcome::Written { .. }));
    }

    let dir = temp.path().join("Some_Manga").join("Chapter 1_ Start");
    for i in 1..=3 {
        let file = dir.join(format!("{i:03}.png"));
        assert_eq!(fs::read_to_string(file).unwrap(), format!("page {i}"));
    }
}

#[test]
fn second_write_is_skipped_and_empty_files_are_not_trusted() {
    let temp = TempDir::new().unwrap();
    let storage = StorageWriter::new(temp.path());
    let source = sample_source();
    let unit = &source.units[0];
    let page = &unit.pages[0];

    let first = storage.write(&source, unit, page, b"data", None).unwrap();
    let WriteOutcome::Written { path, bytes } = first else {
        panic!("expected a write, got {first:?}");
    };
    assert_eq!(bytes, 4);
    assert_eq!(
        storage.write(&source, unit, page, b"other", None).unwrap(),
        WriteOutcome::AlreadySkipped { path: path.clone() }
    );
    assert_eq!(fs::read(&path).unwrap(), b"data");

    let truncated = &unit.pages[1];
    let empty = storage.page_path(&source, unit, truncated, "png");
    fs::write(&empty, b"").unwrap();
    assert_eq!(storage.existing(&source, unit, truncated), None);
    assert!(matches!(
        storage.write(&source, unit, truncated, b"full", None).unwrap(),
        WriteOutcome::Written { .. }
    ));
}

#[test]
fn unresolved_page_cannot_be_written() {
    let temp = TempDir::new().unwrap();
    let storage = StorageWriter::new(temp.path());
    let source = sample_source();
    let unit = &source.units[0];
    let page = Page::unresolved(9, "https://manganelo.com/ch-1/9");
    assert!(storage.write(&source, unit, &page, b"x", None).is_err());
}

#[test]
fn cache_round_trips_and_skips_identical_rewrites() {
    let temp = TempDir::new().unwrap();
    let cache = SourceCache::new(StorageWriter::new(temp.path()));
    let source = sample_source();

    assert_eq!(cache.load(&source.title, &source.url), None);
    assert!(cache.save(&source).unwrap());
    assert!(!cache.save(&source).unwrap());
    assert!(cache.path_for(&source.title).ends_with("Some_Manga/cache.json"));
    assert_eq!(cache.load(&source.title, &source.url), Some(source.clone()));

    // A cache written for another url is ignored.
    assert_eq!(cache.load(&source.title, "https://manganelo.com/manga/y"), None);
}

#[test]
fn corrupt_cache_is_ignored() {
    let temp = TempDir::new().unwrap();
    let cache = SourceCache::new(StorageWriter::new(temp.path()));
    let path = cache.path_for("Broken");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "{ not json").unwrap();
    assert_eq!(cache.load("Broken", "https://manganelo.com/manga/b"), None);
}
