//! Tests for managed-tree path handling

use depsync_fs::{Error, NormalizedPath, RelativePath};
use pretty_assertions::assert_eq;
use rstest::rstest;

#[rstest]
#[case("lib", "lib")]
#[case("./lib", "lib")]
#[case("lib//sub/", "lib/sub")]
#[case("lib\\sub", "lib/sub")]
#[case("lib/../vendor", "vendor")]
#[case("a/b/../../c", "c")]
#[case(".", ".")]
fn parse_normalizes(#[case] raw: &str, #[case] expected: &str) {
    assert_eq!(RelativePath::parse(raw).unwrap().as_str(), expected);
}

#[rstest]
#[case("..")]
#[case("../outside")]
#[case("lib/../../outside")]
fn parse_rejects_escape(#[case] raw: &str) {
    let err = RelativePath::parse(raw).unwrap_err();
    assert!(matches!(err, Error::PathEscape { .. }), "got {err:?}");
}

#[rstest]
#[case("/etc/passwd")]
#[case("C:/Windows")]
#[case("")]
#[case("   ")]
fn parse_rejects_absolute_and_empty(#[case] raw: &str) {
    let err = RelativePath::parse(raw).unwrap_err();
    assert!(matches!(err, Error::InvalidPath { .. }), "got {err:?}");
}

#[test]
fn join_allows_sibling_within_root() {
    let origin = RelativePath::parse("app/sub1").unwrap();
    let joined = origin.join("../sub2").unwrap();
    assert_eq!(joined.as_str(), "app/sub2");
}

#[test]
fn join_escape_reports_combined_path() {
    let origin = RelativePath::parse("app").unwrap();
    match origin.join("../../etc") {
        Err(Error::PathEscape { path }) => assert_eq!(path, "app/../../etc"),
        other => panic!("expected PathEscape, got {other:?}"),
    }
}

#[test]
fn depth_and_parent() {
    let p = RelativePath::parse("third_party/zlib/contrib").unwrap();
    assert_eq!(p.depth(), 3);
    assert_eq!(p.parent().unwrap().as_str(), "third_party/zlib");
    assert_eq!(RelativePath::parse("lib").unwrap().parent(), Some(RelativePath::root()));
    assert_eq!(RelativePath::root().parent(), None);
    assert_eq!(RelativePath::root().depth(), 0);
}

#[test]
fn overlaps_is_symmetric() {
    let lib = RelativePath::parse("lib").unwrap();
    let sub = RelativePath::parse("lib/sub").unwrap();
    let other = RelativePath::parse("other").unwrap();
    assert!(lib.overlaps(&sub));
    assert!(sub.overlaps(&lib));
    assert!(!lib.overlaps(&other));
}

#[test]
fn to_native_joins_components() {
    let root = std::path::Path::new("/work");
    let p = RelativePath::parse("a/b").unwrap();
    assert_eq!(p.to_native(root), root.join("a").join("b"));
    assert_eq!(RelativePath::root().to_native(root), root.to_path_buf());
}

#[test]
fn serde_round_trip_validates() {
    #[derive(serde::Serialize, serde::Deserialize)]
    struct Holder {
        path: RelativePath,
    }

    let holder: Holder = toml::from_str("path = \"lib/./sub\"").unwrap();
    assert_eq!(holder.path.as_str(), "lib/sub");

    let escaped: Result<Holder, _> = toml::from_str("path = \"../x\"");
    assert!(escaped.is_err());
}

#[test]
fn normalized_parent_and_file_name() {
    let p = NormalizedPath::new("/work/.depsync/state.toml");
    assert_eq!(p.file_name(), Some("state.toml"));
    assert_eq!(p.parent().unwrap().as_str(), "/work/.depsync");
}
