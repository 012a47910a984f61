//! Archive adapter for opaque binary dependencies
//!
//! A download is staged next to its destination, verified, unpacked and then
//! renamed into place, so an interrupted transfer never leaves a half-written
//! tree behind. The `.depsync-archive` marker records where the content came
//! from and its digest; without it the directory is not considered a checkout.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use depsync_fs::{DepsyncPath, NormalizedPath, checksum};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, RevisionSpec, SourceLocator, VcsKind, VersionControl};

/// Contents of the marker file written into every materialized archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveMarker {
    pub url: String,
    /// Bare lowercase hex SHA-256 of the downloaded payload
    pub digest: String,
}

/// [`VersionControl`] implementation for downloadable archives and files.
#[derive(Debug, Clone, Default)]
pub struct ArchiveAdapter;

impl ArchiveAdapter {
    pub fn new() -> Self {
        Self
    }

    fn marker_path(dest: &Path) -> PathBuf {
        dest.join(DepsyncPath::ArchiveMarker)
    }

    /// Read the marker of the archive materialized at `dest`.
    pub fn read_marker(dest: &Path) -> Result<ArchiveMarker> {
        let path = NormalizedPath::new(Self::marker_path(dest));
        let content = depsync_fs::io::read_text_if_exists(&path)?.ok_or_else(|| {
            Error::NotACheckout {
                path: dest.to_path_buf(),
            }
        })?;
        toml::from_str(&content).map_err(|e| Error::Archive {
            url: dest.display().to_string(),
            message: format!("unreadable marker: {}", e),
        })
    }

    fn write_marker(dest: &Path, marker: &ArchiveMarker) -> Result<()> {
        let content = toml::to_string(marker).map_err(|e| Error::Archive {
            url: marker.url.clone(),
            message: e.to_string(),
        })?;
        depsync_fs::io::write_atomic(
            &NormalizedPath::new(Self::marker_path(dest)),
            content.as_bytes(),
        )?;
        Ok(())
    }

    /// Download `url`, verify it against `expected` and move the unpacked
    /// content to `dest`, replacing whatever was there. Returns the digest.
    ///
    /// A mismatch is reported while the payload is still staged; `dest` is
    /// left as it was.
    fn materialize(url: &str, dest: &Path, expected: Option<&str>) -> Result<String> {
        let parent = dest
            .parent()
            .ok_or_else(|| Error::NotACheckout {
                path: dest.to_path_buf(),
            })?
            .to_path_buf();
        fs::create_dir_all(&parent)?;

        let staging = tempfile::Builder::new()
            .prefix(".depsync-staging")
            .tempdir_in(&parent)?;
        let file_name = payload_name(url);
        let payload = staging.path().join(&file_name);
        download(url, &payload)?;

        let digest = checksum::canonical_hex(&checksum::compute_file_checksum(&payload)?);
        if let Some(expected) = expected
            && !checksum::checksums_match(expected, &digest)
        {
            return Err(Error::DigestMismatch {
                url: url.to_string(),
                expected: checksum::canonical_hex(expected),
                actual: digest,
            });
        }

        let tree = staging.path().join("tree");
        fs::create_dir_all(&tree)?;
        if file_name.to_ascii_lowercase().ends_with(".zip") {
            extract_zip(url, &payload, &tree)?;
            fs::remove_file(&payload)?;
        } else {
            fs::rename(&payload, tree.join(&file_name))?;
        }

        let content_root = single_top_level_dir(&tree)?.unwrap_or(tree);
        depsync_fs::io::remove_all(dest)?;
        fs::rename(&content_root, dest)?;

        Self::write_marker(
            dest,
            &ArchiveMarker {
                url: url.to_string(),
                digest: digest.clone(),
            },
        )?;
        tracing::info!(%url, dest = %dest.display(), %digest, "Materialized archive");
        Ok(digest)
    }
}

/// Last URL segment, without query, used to name the staged payload.
fn payload_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())
        .unwrap_or("download")
        .to_string()
}

fn download(url: &str, target: &Path) -> Result<()> {
    let transport = |message: String| Error::Transport {
        url: url.to_string(),
        message,
    };

    if url.starts_with("http://") || url.starts_with("https://") {
        tracing::debug!(%url, "Downloading");
        let response = ureq::get(url).call().map_err(|e| transport(e.to_string()))?;
        let mut reader = response.into_body().into_reader();
        let mut file = File::create(target)?;
        io::copy(&mut reader, &mut file).map_err(|e| transport(e.to_string()))?;
        return Ok(());
    }

    let local = url.strip_prefix("file://").unwrap_or(url);
    let source = Path::new(local);
    if !source.is_absolute() {
        return Err(Error::UnsupportedLocator {
            url: url.to_string(),
            kind: VcsKind::Archive.to_string(),
        });
    }
    fs::copy(source, target).map_err(|e| transport(e.to_string()))?;
    Ok(())
}

fn extract_zip(url: &str, archive_path: &Path, target_dir: &Path) -> Result<()> {
    let corrupt = |e: zip::result::ZipError| Error::Archive {
        url: url.to_string(),
        message: e.to_string(),
    };

    let file = File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(corrupt)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(corrupt)?;
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!(%url, name = entry.name(), "Skipping archive entry outside the target");
            continue;
        };
        let outpath = target_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&outpath)?;
        } else {
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut outfile = File::create(&outpath)?;
            io::copy(&mut entry, &mut outfile)?;
        }
    }
    Ok(())
}

/// The lone directory inside `dir`, if that is all it contains.
fn single_top_level_dir(dir: &Path) -> Result<Option<PathBuf>> {
    let mut entries = fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
    if entries.len() == 1 && entries[0].file_type()?.is_dir() {
        return Ok(entries.pop().map(|e| e.path()));
    }
    Ok(None)
}

impl VersionControl for ArchiveAdapter {
    fn kind(&self) -> VcsKind {
        VcsKind::Archive
    }

    fn clone_source(&self, locator: &SourceLocator, revision: &RevisionSpec, dest: &Path) -> Result<()> {
        if depsync_fs::io::is_non_empty_dir(dest) {
            return Err(Error::DestinationOccupied {
                path: dest.to_path_buf(),
            });
        }
        let expected = match revision {
            RevisionSpec::Default => None,
            RevisionSpec::Digest(digest) => Some(digest.as_str()),
            RevisionSpec::Branch(_) | RevisionSpec::Tag(_) | RevisionSpec::Commit(_) => {
                return Err(Error::UnsupportedRevision {
                    revision: revision.to_string(),
                    kind: VcsKind::Archive.to_string(),
                });
            }
        };
        Self::materialize(&locator.url, dest, expected)?;
        Ok(())
    }

    fn fetch(&self, dest: &Path) -> Result<()> {
        Self::read_marker(dest)?;
        Ok(())
    }

    fn checkout(&self, dest: &Path, revision: &RevisionSpec) -> Result<String> {
        let marker = Self::read_marker(dest)?;
        match revision {
            RevisionSpec::Default => Ok(marker.digest),
            RevisionSpec::Digest(expected) if checksum::checksums_match(expected, &marker.digest) => {
                Ok(marker.digest)
            }
            RevisionSpec::Digest(expected) => {
                tracing::debug!(dest = %dest.display(), %expected, current = %marker.digest, "Digest changed, downloading again");
                Self::materialize(&marker.url, dest, Some(expected))
            }
            RevisionSpec::Branch(_) | RevisionSpec::Tag(_) | RevisionSpec::Commit(_) => {
                Err(Error::UnsupportedRevision {
                    revision: revision.to_string(),
                    kind: VcsKind::Archive.to_string(),
                })
            }
        }
    }

    fn current_revision(&self, dest: &Path) -> Result<String> {
        Ok(Self::read_marker(dest)?.digest)
    }

    fn has_local_modifications(&self, dest: &Path) -> Result<bool> {
        Ok(!Self::marker_path(dest).exists())
    }

    fn is_checkout(&self, dest: &Path) -> bool {
        Self::marker_path(dest).is_file()
    }

    fn source_url(&self, dest: &Path) -> Result<Option<String>> {
        Ok(Some(Self::read_marker(dest)?.url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_name_uses_last_segment() {
        assert_eq!(payload_name("https://x.org/a/b/tool.zip?x=1"), "tool.zip");
        assert_eq!(payload_name("file:///tmp/blob.bin"), "blob.bin");
        assert_eq!(payload_name("https://x.org/"), "x.org");
    }

    #[test]
    fn relative_paths_are_not_locators() {
        let dir = tempfile::tempdir().unwrap();
        let err = download("relative/file.bin", &dir.path().join("out")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedLocator { .. }));
    }
}
