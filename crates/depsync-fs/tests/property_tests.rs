use depsync_fs::RelativePath;
use proptest::prelude::*;

proptest! {
    #[test]
    fn parsed_paths_are_canonical(segments in prop::collection::vec("[a-z]{1,6}|\\.|\\.\\.", 1..8)) {
        let raw = segments.join("/");
        if let Ok(path) = RelativePath::parse(&raw) {
            let s = path.as_str();
            prop_assert!(!s.contains("//"));
            prop_assert!(!s.split('/').any(|c| c == ".."));
            prop_assert!(s == "." || !s.split('/').any(|c| c == "."));

            // Re-parsing a canonical path is the identity
            prop_assert_eq!(RelativePath::parse(s).unwrap(), path.clone());
        }
    }

    #[test]
    fn ancestors_sort_first(a in "[a-z]{1,4}(/[a-z]{1,4}){0,3}", b in "[a-z]{1,4}(/[a-z]{1,4}){0,3}") {
        let pa = RelativePath::parse(&a).unwrap();
        let pb = RelativePath::parse(&b).unwrap();
        if pa.is_ancestor_of(&pb) {
            prop_assert!(pa < pb);
            prop_assert!(pa.depth() < pb.depth());
        }
    }
}
