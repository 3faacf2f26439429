//! Directory jobs: copy, rename, convert, split, extract.

mod common;

use assert_fs::prelude::*;
use predicates::prelude::*;

use docintake::batch::{archive, convert, copy, rename, split};
use docintake::config::PasswordRule;

use common::{fast_retry, MarkerTools, RecordingArchiver};

fn no_progress(_: usize, _: usize) {}

#[test]
fn test_copy_filters_extensions_and_skips_same_size() {
    let source = assert_fs::TempDir::new().unwrap();
    let dest = assert_fs::TempDir::new().unwrap();
    source.child("a.pdf").write_str("aaaa").unwrap();
    source.child("b.PDF").write_str("bbbb").unwrap();
    source.child("notes.txt").write_str("skip me").unwrap();
    dest.child("a.pdf").write_str("AAAA").unwrap();

    let report = copy::copy_files(
        source.path(),
        dest.path(),
        &["pdf".to_string()],
        false,
        &no_progress,
    )
    .unwrap();

    assert_eq!(report.copied, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.bytes, 4);
    dest.child("a.pdf").assert("AAAA");
    dest.child("b.PDF").assert("bbbb");
    dest.child("notes.txt").assert(predicate::path::missing());
}

#[test]
fn test_copy_overwrite_replaces_and_creates_destination() {
    let source = assert_fs::TempDir::new().unwrap();
    let root = assert_fs::TempDir::new().unwrap();
    source.child("a.pdf").write_str("new!").unwrap();
    let dest = root.child("share").child("in");
    dest.create_dir_all().unwrap();
    dest.child("a.pdf").write_str("old!").unwrap();

    let report = copy::copy_files(source.path(), dest.path(), &[], true, &no_progress).unwrap();

    assert_eq!(report.copied, 1);
    dest.child("a.pdf").assert("new!");
}

#[test]
fn test_copy_missing_source_is_an_error() {
    let root = assert_fs::TempDir::new().unwrap();
    let result = copy::copy_files(
        &root.path().join("nope"),
        root.path(),
        &[],
        false,
        &no_progress,
    );
    assert!(result.is_err());
}

#[test]
fn test_rename_sanitizes_and_avoids_collisions() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("Rješenje broj 1.PDF").write_str("1").unwrap();
    dir.child("Rje_enje_broj_1.pdf").write_str("2").unwrap();
    dir.child("clean.pdf").write_str("3").unwrap();

    let renamed = rename::normalize_names(dir.path(), &no_progress).unwrap();

    assert_eq!(renamed.len(), 1);
    dir.child("Rje_enje_broj_1.pdf").assert("2");
    dir.child("Rje_enje_broj_1_01.pdf").assert("1");
    dir.child("clean.pdf").assert("3");
    dir.child("Rješenje broj 1.PDF").assert(predicate::path::missing());
}

#[test]
fn test_convert_images_in_directory() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("scan1.jpg").write_str("JPEG").unwrap();
    dir.child("scan2.PNG").write_str("PNG").unwrap();
    dir.child("doc.pdf").write_str("%PDF").unwrap();

    let tools = MarkerTools::default();
    let images = ["jpg".to_string(), "png".to_string()];
    let report = convert::convert_images(dir.path(), &tools, fast_retry(), &images, &no_progress).unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(report.failed, 0);
    dir.child("scan1.pdf").assert(predicate::path::exists());
    dir.child("scan2.pdf").assert(predicate::path::exists());
    dir.child("scan1.jpg").assert(predicate::path::missing());
    dir.child("doc.pdf").assert("%PDF");
}

#[test]
fn test_split_only_multi_page_documents() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("single.pdf").write_str("%PDF pages=1").unwrap();
    dir.child("multi.pdf").write_str("%PDF pages=2").unwrap();

    let tools = MarkerTools::default();
    let report = split::split_documents(dir.path(), &tools, fast_retry(), &no_progress).unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(report.skipped, 1);
    dir.child("multi.pdf").assert(predicate::path::missing());
    dir.child("multi_0001.pdf").assert(predicate::path::exists());
    dir.child("multi_0002.pdf").assert(predicate::path::exists());
    dir.child("single.pdf").assert(predicate::str::contains("pages=1"));
}

#[test]
fn test_split_failure_keeps_document() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("multi.pdf").write_str("%PDF pages=4").unwrap();

    let tools = MarkerTools {
        fail_split: true,
        ..Default::default()
    };
    let report = split::split_documents(dir.path(), &tools, fast_retry(), &no_progress).unwrap();

    assert_eq!(report.failed, 1);
    dir.child("multi.pdf").assert(predicate::path::exists());
}

fn passwords() -> Vec<PasswordRule> {
    vec![PasswordRule {
        prefix: "hzzo".to_string(),
        password: "tajna".to_string(),
    }]
}

#[test]
fn test_extract_directory_with_password_table() {
    let input = assert_fs::TempDir::new().unwrap();
    let output = assert_fs::TempDir::new().unwrap();
    input.child("HZZO_01.zip").write_str("PK").unwrap();
    input.child("other.7z").write_str("7z").unwrap();
    input.child("readme.txt").write_str("-").unwrap();

    let tool = RecordingArchiver::default();
    let exts = ["zip", "7z", "rar"].map(String::from);
    let report = archive::extract_archives(
        input.path(),
        output.path(),
        &tool,
        &exts,
        &passwords(),
        &no_progress,
    )
    .unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(
        *tool.calls.borrow(),
        [
            ("HZZO_01.zip".to_string(), Some("tajna".to_string())),
            ("other.7z".to_string(), None),
        ]
    );
    output
        .child("HZZO_01")
        .child("content.txt")
        .assert("HZZO_01.zip");
    output.child("other").assert(predicate::path::is_dir());
}

#[test]
fn test_extract_failure_is_counted_and_run_continues() {
    let input = assert_fs::TempDir::new().unwrap();
    let output = assert_fs::TempDir::new().unwrap();
    input.child("a.zip").write_str("PK").unwrap();
    input.child("b.zip").write_str("PK").unwrap();

    let tool = RecordingArchiver {
        fail_on: Some("a.zip".to_string()),
        ..Default::default()
    };
    let report = archive::extract_archives(
        input.path(),
        output.path(),
        &tool,
        &["zip".to_string()],
        &[],
        &no_progress,
    )
    .unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.processed, 1);
    output.child("b").child("content.txt").assert("b.zip");
}

#[test]
fn test_extract_single_archive_path() {
    let input = assert_fs::TempDir::new().unwrap();
    let output = assert_fs::TempDir::new().unwrap();
    let archive_file = input.child("hzzo_x.rar");
    archive_file.write_str("Rar!").unwrap();

    let tool = RecordingArchiver::default();
    let report = archive::extract_archives(
        archive_file.path(),
        output.path(),
        &tool,
        &[],
        &passwords(),
        &no_progress,
    )
    .unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(tool.calls.borrow()[0].1.as_deref(), Some("tajna"));
}
