//! Tests for the archive adapter using local `file://` sources

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use depsync_fs::checksum;
use depsync_vcs::{ArchiveAdapter, Error, RevisionSpec, SourceLocator, VersionControl};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

fn file_url(path: &Path) -> String {
    format!("file://{}", path.to_string_lossy())
}

fn digest_of(path: &Path) -> String {
    checksum::canonical_hex(&checksum::compute_file_checksum(path).unwrap())
}

fn write_zip(path: &Path, entries: &[(&str, &str)]) {
    let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
    for (name, content) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}

fn dest(temp: &TempDir) -> PathBuf {
    temp.path().join("work").join("tools")
}

#[test]
fn test_single_file_is_kept_as_is() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("tool.bin");
    fs::write(&source, "binary").unwrap();
    let dest = dest(&temp);

    let archive = ArchiveAdapter::new();
    archive
        .clone_source(&SourceLocator::archive(file_url(&source)), &RevisionSpec::Default, &dest)
        .unwrap();
    let id = archive.checkout(&dest, &RevisionSpec::Default).unwrap();

    assert_eq!(id, digest_of(&source));
    assert_eq!(fs::read_to_string(dest.join("tool.bin")).unwrap(), "binary");
    assert!(archive.is_checkout(&dest));
    assert!(!archive.has_local_modifications(&dest).unwrap());
    assert_eq!(archive.current_revision(&dest).unwrap(), id);
}

#[test]
fn test_zip_with_single_top_level_dir_is_stripped() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("pkg.zip");
    write_zip(
        &source,
        &[
            ("pkg-1.0/include/a.h", "int a;"),
            ("pkg-1.0/lib/a.a", "lib"),
        ],
    );
    let dest = dest(&temp);

    let archive = ArchiveAdapter::new();
    archive
        .clone_source(&SourceLocator::archive(file_url(&source)), &RevisionSpec::Default, &dest)
        .unwrap();

    assert_eq!(
        fs::read_to_string(dest.join("include/a.h")).unwrap(),
        "int a;"
    );
    assert!(dest.join("lib/a.a").exists());
    assert!(!dest.join("pkg.zip").exists());
}

#[test]
fn test_digest_is_verified() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("tool.bin");
    fs::write(&source, "v1").unwrap();
    let dest = dest(&temp);
    let expected = digest_of(&source);

    let archive = ArchiveAdapter::new();
    archive
        .clone_source(&SourceLocator::archive(file_url(&source)), &RevisionSpec::Default, &dest)
        .unwrap();

    let id = archive
        .checkout(&dest, &RevisionSpec::Digest(expected.to_uppercase()))
        .unwrap();
    assert_eq!(id, expected);

    let err = archive
        .checkout(&dest, &RevisionSpec::Digest("00".repeat(32)))
        .unwrap_err();
    assert!(matches!(err, Error::DigestMismatch { .. }), "got {err}");
    // Verification failure leaves the previous content intact
    assert_eq!(fs::read_to_string(dest.join("tool.bin")).unwrap(), "v1");
}

#[test]
fn test_changed_digest_downloads_again() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("tool.bin");
    fs::write(&source, "v1").unwrap();
    let dest = dest(&temp);

    let archive = ArchiveAdapter::new();
    archive
        .clone_source(&SourceLocator::archive(file_url(&source)), &RevisionSpec::Default, &dest)
        .unwrap();

    fs::write(&source, "v2").unwrap();
    let id = archive
        .checkout(&dest, &RevisionSpec::Digest(digest_of(&source)))
        .unwrap();
    assert_eq!(id, digest_of(&source));
    assert_eq!(fs::read_to_string(dest.join("tool.bin")).unwrap(), "v2");
}

#[test]
fn test_missing_marker_counts_as_modified() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("tool.bin");
    fs::write(&source, "v1").unwrap();
    let dest = dest(&temp);

    let archive = ArchiveAdapter::new();
    archive
        .clone_source(&SourceLocator::archive(file_url(&source)), &RevisionSpec::Default, &dest)
        .unwrap();
    fs::remove_file(dest.join(".depsync-archive")).unwrap();

    assert!(!archive.is_checkout(&dest));
    assert!(archive.has_local_modifications(&dest).unwrap());
    assert!(matches!(archive.fetch(&dest), Err(Error::NotACheckout { .. })));
}

#[test]
fn test_named_refs_are_rejected() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("tool.bin");
    fs::write(&source, "v1").unwrap();
    let dest = dest(&temp);

    let archive = ArchiveAdapter::new();
    archive
        .clone_source(&SourceLocator::archive(file_url(&source)), &RevisionSpec::Default, &dest)
        .unwrap();
    let err = archive
        .checkout(&dest, &RevisionSpec::Branch("main".into()))
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedRevision { .. }));
}

#[test]
fn test_clone_verifies_digest_before_placing_content() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("tool.bin");
    fs::write(&source, "tampered").unwrap();
    let dest = dest(&temp);

    let archive = ArchiveAdapter::new();
    let err = archive
        .clone_source(
            &SourceLocator::archive(file_url(&source)),
            &RevisionSpec::Digest("00".repeat(32)),
            &dest,
        )
        .unwrap_err();

    assert!(matches!(err, Error::DigestMismatch { .. }), "got {err}");
    assert!(!dest.exists());
    assert!(!archive.is_checkout(&dest));
    // No staging directory is left next to the destination
    let leftovers: Vec<_> = fs::read_dir(dest.parent().unwrap())
        .unwrap()
        .filter_map(|e| e.ok())
        .collect();
    assert!(leftovers.is_empty(), "found {leftovers:?}");
}

#[test]
fn test_clone_at_digest_is_ready_for_checkout() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("tool.bin");
    fs::write(&source, "v1").unwrap();
    let dest = dest(&temp);
    let digest = RevisionSpec::Digest(digest_of(&source));

    let archive = ArchiveAdapter::new();
    archive
        .clone_source(&SourceLocator::archive(file_url(&source)), &digest, &dest)
        .unwrap();
    // The source changing afterwards must not matter: nothing is downloaded again
    fs::write(&source, "v2").unwrap();

    assert_eq!(archive.checkout(&dest, &digest).unwrap(), digest_of(&dest.join("tool.bin")));
    assert_eq!(fs::read_to_string(dest.join("tool.bin")).unwrap(), "v1");
}

#[test]
fn test_clone_at_named_ref_is_rejected() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("tool.bin");
    fs::write(&source, "v1").unwrap();
    let dest = dest(&temp);

    let err = ArchiveAdapter::new()
        .clone_source(
            &SourceLocator::archive(file_url(&source)),
            &RevisionSpec::Tag("v1".into()),
            &dest,
        )
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedRevision { .. }));
    assert!(!dest.exists());
}
