//! Release manifest schema and its read-modify-write cycle.
//!
//! The manifest is a JSON object keyed by release version:
//!
//! ```json
//! {
//!     "1.0.0": {
//!         "filename": "PULSAR-KiCad-Lib-1.0.0.zip",
//!         "sha256": "...",
//!         "size_bytes": 48213,
//!         "install_size_bytes": 190554,
//!         "status": "stable",
//!         "kicad_version": "8.0"
//!     }
//! }
//! ```
//!
//! Updates go through [`ManifestUpdate`], which holds an advisory lock for
//! its lifetime and replaces the file atomically on [`ManifestUpdate::commit`].

use super::sha256_digest::Sha256Digest;
use super::version::ReleaseVersion;
use crate::error::{PackagingError, Result};
use fs2::FileExt;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Metadata recorded for one released archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Archive filename, e.g. `PULSAR-KiCad-Lib-1.0.0.zip`.
    pub filename: String,
    /// SHA-256 digest of the archive bytes.
    pub sha256: Sha256Digest,
    /// Archive size in bytes.
    pub size_bytes: u64,
    /// Total uncompressed size of the archived files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_size_bytes: Option<u64>,
    /// Where the distribution channel serves the archive from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// Release status, e.g. `stable`, as stamped into the library metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Minimum KiCad version the release supports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kicad_version: Option<String>,
}

/// Mapping from release version to archive metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReleaseManifest {
    releases: BTreeMap<ReleaseVersion, ManifestEntry>,
}

impl ReleaseManifest {
    /// Insert or replace the entry for `version`.
    ///
    /// Returns the entry previously recorded for that version, if any.
    pub fn upsert(&mut self, version: ReleaseVersion, entry: ManifestEntry) -> Option<ManifestEntry> {
        self.releases.insert(version, entry)
    }

    /// Look up the entry for `version`.
    #[must_use]
    pub fn get(&self, version: &ReleaseVersion) -> Option<&ManifestEntry> {
        self.releases.get(version)
    }

    /// Number of recorded releases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.releases.len()
    }

    /// Returns true when no releases are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    /// Iterate over releases in version-key order.
    pub fn iter(&self) -> impl Iterator<Item = (&ReleaseVersion, &ManifestEntry)> {
        self.releases.iter()
    }
}

/// Read the manifest at `path`, or an empty manifest when it does not exist.
///
/// # Errors
///
/// Returns [`PackagingError::ManifestCorrupt`] if the file exists but is not
/// a valid manifest, and [`PackagingError::Io`] if it cannot be read.
pub fn load_manifest(path: &Path) -> Result<ReleaseManifest> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!("no manifest at {}, starting empty", path.display());
            return Ok(ReleaseManifest::default());
        }
        Err(err) => return Err(PackagingError::io("read", path, err)),
    };
    serde_json::from_str(&raw).map_err(|source| PackagingError::ManifestCorrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Replace the file at `path` with `bytes` via a temporary file and rename.
///
/// A failure at any point leaves the previous file intact.
///
/// # Errors
///
/// Returns [`PackagingError::Io`] if the temporary file cannot be written
/// or renamed into place.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|source| PackagingError::io("create", dir, source))?;

    let mut temp = NamedTempFile::new_in(dir)
        .map_err(|source| PackagingError::io("create temporary file in", dir, source))?;
    temp.write_all(bytes)
        .map_err(|source| PackagingError::io("write", temp.path().to_path_buf(), source))?;
    temp.as_file()
        .sync_all()
        .map_err(|source| PackagingError::io("sync", path, source))?;
    temp.persist(path)
        .map_err(|err| PackagingError::io("replace", path, err.error))?;
    Ok(())
}

/// Path of the advisory lock file guarding `manifest_path`.
#[must_use]
pub fn lock_path_for(manifest_path: &Path) -> PathBuf {
    let mut name = manifest_path
        .file_name()
        .map_or_else(|| OsString::from("manifest"), ToOwned::to_owned);
    name.push(".lock");
    manifest_path.with_file_name(name)
}

/// An in-progress manifest update.
///
/// Holds an exclusive advisory lock on the manifest's lock file until
/// dropped. Dropping without calling [`Self::commit`] discards the changes
/// and leaves the file on disk as it was.
///
/// # Examples
///
/// ```
/// use pulsar_packager::release::manifest::{ManifestEntry, ManifestUpdate};
/// use pulsar_packager::release::sha256_digest::Sha256Digest;
/// use pulsar_packager::release::version::ReleaseVersion;
///
/// let dir = tempfile::tempdir().expect("temp dir");
/// let path = dir.path().join("releases.json");
///
/// let mut update = ManifestUpdate::begin(&path).expect("lock acquired");
/// update.upsert(
///     ReleaseVersion::try_from("1.0.0").expect("valid version"),
///     ManifestEntry {
///         filename: "PULSAR-KiCad-Lib-1.0.0.zip".to_owned(),
///         sha256: Sha256Digest::of_bytes(b"archive"),
///         size_bytes: 7,
///         install_size_bytes: None,
///         download_url: None,
///         status: Some("stable".to_owned()),
///         kicad_version: Some("8.0".to_owned()),
///     },
/// );
/// let manifest = update.commit().expect("manifest written");
/// assert_eq!(manifest.len(), 1);
/// ```
#[derive(Debug)]
pub struct ManifestUpdate {
    path: PathBuf,
    manifest: ReleaseManifest,
    _lock: File,
}

impl ManifestUpdate {
    /// Lock and load the manifest at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PackagingError::ManifestLocked`] if another process holds
    /// the lock, [`PackagingError::ManifestCorrupt`] if the existing file is
    /// invalid, and [`PackagingError::Io`] on filesystem failures.
    pub fn begin(path: &Path) -> Result<Self> {
        let lock_path = lock_path_for(path);
        if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|source| PackagingError::io("create", parent, source))?;
        }
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|source| PackagingError::io("open", &lock_path, source))?;
        FileExt::try_lock_exclusive(&lock).map_err(|err| {
            if err.kind() == fs2::lock_contended_error().kind() {
                PackagingError::ManifestLocked {
                    path: path.to_path_buf(),
                }
            } else {
                PackagingError::io("lock", &lock_path, err)
            }
        })?;
        debug!("locked {}", lock_path.display());

        let manifest = load_manifest(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            manifest,
            _lock: lock,
        })
    }

    /// The manifest as loaded plus any pending changes.
    #[must_use]
    pub fn manifest(&self) -> &ReleaseManifest {
        &self.manifest
    }

    /// Insert or replace the entry for `version`.
    pub fn upsert(&mut self, version: ReleaseVersion, entry: ManifestEntry) {
        if self.manifest.upsert(version.clone(), entry).is_some() {
            info!("replacing manifest entry for {version}");
        } else {
            info!("adding manifest entry for {version}");
        }
    }

    /// Write the manifest atomically and release the lock.
    ///
    /// # Errors
    ///
    /// Returns [`PackagingError::Serialization`] or [`PackagingError::Io`]
    /// if the manifest cannot be written; the previous file is kept.
    pub fn commit(self) -> Result<ReleaseManifest> {
        let bytes = super::json::to_pretty_bytes(&self.manifest)?;
        write_atomically(&self.path, &bytes)?;
        info!("updated {}", self.path.display());
        Ok(self.manifest)
    }
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
