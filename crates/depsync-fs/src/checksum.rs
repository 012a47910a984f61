//! SHA-256 checksum utilities
//!
//! Digests are rendered as `sha256:<hex>`. Comparison accepts bare hex as
//! written in manifests.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// Prefix for all checksums produced by this module
const PREFIX: &str = "sha256:";

/// Compute the SHA-256 checksum of string content.
pub fn compute_content_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{}{:x}", PREFIX, hasher.finalize())
}

/// Compute the SHA-256 checksum of a file, streaming its contents.
pub fn compute_file_checksum(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let n = file.read(&mut buffer).map_err(|e| Error::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{}{:x}", PREFIX, hasher.finalize()))
}

/// Strip the `sha256:` prefix and lowercase.
pub fn canonical_hex(checksum: &str) -> String {
    checksum
        .trim()
        .strip_prefix(PREFIX)
        .unwrap_or(checksum.trim())
        .to_ascii_lowercase()
}

/// Compare two checksums regardless of prefix or hex case.
pub fn checksums_match(expected: &str, actual: &str) -> bool {
    canonical_hex(expected) == canonical_hex(actual)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_checksum_known_value() {
        let checksum = compute_content_checksum("hello world");
        assert_eq!(
            checksum,
            "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn file_checksum_matches_content_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.txt");
        std::fs::write(&path, "hello world").unwrap();

        let file_cs = compute_file_checksum(&path).unwrap();
        assert_eq!(file_cs, compute_content_checksum("hello world"));
    }

    #[test]
    fn match_ignores_prefix_and_case() {
        assert!(checksums_match(
            "B94D27B9934D3E08A52E52D7DA7DABFAC484EFE37A5380EE9088F7ACE2EFCDE9",
            "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9",
        ));
        assert!(!checksums_match("abc", "sha256:abd"));
    }
}
