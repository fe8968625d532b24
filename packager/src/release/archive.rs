//! Zip archive creation, hashing, and layout inspection.
//!
//! Archives are reproducible: members are written in the order given, every
//! entry carries the same timestamp and permissions, and compression is
//! fixed at deflate level 9. The archive is assembled in a temporary file
//! next to its destination and renamed into place once complete.

use super::sha256_digest::Sha256Digest;
use crate::error::{PackagingError, Result};
use log::{debug, trace};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// Permission bits stored for every archive entry.
const ENTRY_PERMISSIONS: u32 = 0o644;

/// Deflate level used for every entry.
const COMPRESSION_LEVEL: i64 = 9;

/// Where the bytes of an archive member come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberContents {
    /// Stream the file at this path.
    File(PathBuf),
    /// Write these bytes verbatim.
    Bytes(Vec<u8>),
}

/// A single archive member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMember {
    /// `/`-separated name inside the archive.
    pub archive_path: String,
    /// Source of the member's bytes.
    pub contents: MemberContents,
}

/// Totals gathered while writing an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArchiveSummary {
    /// Number of members written.
    pub file_count: usize,
    /// Sum of the uncompressed member sizes.
    pub install_size_bytes: u64,
}

/// Result of checking an archive against the expected layout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArchiveInspection {
    /// Number of entries in the archive.
    pub entry_count: usize,
    /// Required files that are absent.
    pub missing_files: Vec<String>,
    /// Required directory prefixes with no matching entry.
    pub missing_prefixes: Vec<String>,
}

impl ArchiveInspection {
    /// Returns true when every required file and prefix is present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_files.is_empty() && self.missing_prefixes.is_empty()
    }
}

/// Write `members` into a zip archive at `output_path`.
///
/// An existing archive at `output_path` is replaced only after the new one
/// has been written in full.
///
/// # Errors
///
/// Returns [`PackagingError::Io`] if a member cannot be read or the archive
/// cannot be written, and [`PackagingError::Archive`] on zip encoder
/// failures.
pub fn create_archive(output_path: &Path, members: &[ArchiveMember]) -> Result<ArchiveSummary> {
    let dir = parent_dir(output_path);
    let mut temp = NamedTempFile::new_in(dir)
        .map_err(|source| PackagingError::io("create temporary archive in", dir, source))?;

    let summary = write_members(temp.as_file_mut(), members, output_path)?;

    temp.as_file()
        .sync_all()
        .map_err(|source| PackagingError::io("sync", output_path, source))?;
    temp.persist(output_path)
        .map_err(|err| PackagingError::io("replace", output_path, err.error))?;

    debug!(
        "wrote {} member(s) to {}",
        summary.file_count,
        output_path.display()
    );
    Ok(summary)
}

fn write_members(
    file: &mut File,
    members: &[ArchiveMember],
    output_path: &Path,
) -> Result<ArchiveSummary> {
    let archive_err = |source| PackagingError::Archive {
        path: output_path.to_path_buf(),
        source,
    };
    let mut zip = ZipWriter::new(file);
    let mut summary = ArchiveSummary::default();

    for member in members {
        zip.start_file(member.archive_path.as_str(), entry_options())
            .map_err(archive_err)?;
        let size = match &member.contents {
            MemberContents::File(path) => {
                let mut source =
                    File::open(path).map_err(|err| PackagingError::io("open", path, err))?;
                io::copy(&mut source, &mut zip)
                    .map_err(|err| PackagingError::io("archive", path, err))?
            }
            MemberContents::Bytes(bytes) => {
                zip.write_all(bytes)
                    .map_err(|err| PackagingError::io("write", output_path, err))?;
                bytes.len() as u64
            }
        };
        trace!("added {} ({size} bytes)", member.archive_path);
        summary.file_count += 1;
        summary.install_size_bytes += size;
    }

    zip.finish().map_err(archive_err)?;
    Ok(summary)
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL))
        .last_modified_time(DateTime::default())
        .unix_permissions(ENTRY_PERMISSIONS)
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Compute the SHA-256 digest and byte size of a file.
///
/// # Errors
///
/// Returns [`PackagingError::Io`] if the file cannot be read.
pub fn compute_sha256(path: &Path) -> Result<(Sha256Digest, u64)> {
    let read_err = |source| PackagingError::io("read", path, source);
    let mut file = File::open(path).map_err(read_err)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    let mut total = 0u64;
    loop {
        let bytes_read = file.read(&mut buffer).map_err(read_err)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
        total += bytes_read as u64;
    }
    Ok((Sha256Digest::from_hasher(hasher), total))
}

/// List the entry names of the zip archive at `path`.
///
/// # Errors
///
/// Returns [`PackagingError::Io`] if the file cannot be opened and
/// [`PackagingError::Archive`] if it is not a readable zip archive.
pub fn list_entries(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|source| PackagingError::io("open", path, source))?;
    let archive = ZipArchive::new(file).map_err(|source| PackagingError::Archive {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(archive.file_names().map(str::to_owned).collect())
}

/// Check that the archive contains every required file and prefix.
///
/// # Errors
///
/// Propagates the errors of [`list_entries`].
pub fn inspect_archive(
    path: &Path,
    required_files: &[String],
    required_prefixes: &[String],
) -> Result<ArchiveInspection> {
    let names = list_entries(path)?;
    let missing_files = required_files
        .iter()
        .filter(|required| !names.iter().any(|name| name == *required))
        .cloned()
        .collect();
    let missing_prefixes = required_prefixes
        .iter()
        .filter(|prefix| !names.iter().any(|name| name.starts_with(prefix.as_str())))
        .cloned()
        .collect();
    Ok(ArchiveInspection {
        entry_count: names.len(),
        missing_files,
        missing_prefixes,
    })
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
