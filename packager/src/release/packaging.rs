//! Release packaging pipeline.
//!
//! Collects the asset tree, writes the versioned zip archive, hashes it,
//! and records the result in the release manifest. The manifest lock is
//! taken before any output is written so a corrupt or busy manifest stops
//! the run early.

use super::archive::{
    ArchiveInspection, ArchiveMember, MemberContents, compute_sha256, create_archive,
    inspect_archive,
};
use super::assets::{AssetEntry, OutputExclusions, collect_assets, entry_name, normalise_path};
use super::download_url::{UrlContext, render_download_url};
use super::manifest::{ManifestEntry, ManifestUpdate, lock_path_for};
use super::metadata::{MetadataVersion, rewrite_metadata_file};
use super::naming::{ArchiveName, LibraryName};
use super::sha256_digest::Sha256Digest;
use super::version::ReleaseVersion;
use crate::error::{PackagingError, Result};
use log::{info, warn};
use std::fs;
use std::path::PathBuf;

/// How to rewrite the plugin manager metadata file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataSettings {
    /// Metadata file path relative to the library root.
    pub file: PathBuf,
    /// Release status written into the `versions` array.
    pub status: String,
    /// Minimum supported KiCad version.
    pub kicad_version: String,
}

/// Entries the finished archive is expected to contain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutRequirements {
    /// Exact entry names that must be present.
    pub required_files: Vec<String>,
    /// Prefixes that at least one entry must start with.
    pub required_prefixes: Vec<String>,
}

/// Input parameters for [`package_release`].
#[derive(Debug, Clone)]
pub struct PackageParams {
    /// The release version.
    pub version: ReleaseVersion,
    /// Release tag used for download URLs; defaults to `v<version>`.
    pub tag: Option<String>,
    /// Archive filename prefix.
    pub library_name: LibraryName,
    /// Directory archive paths are made relative to.
    pub root: PathBuf,
    /// Files and directories to archive, relative to `root`.
    pub sources: Vec<PathBuf>,
    /// Directory the archive is written to.
    pub output_dir: PathBuf,
    /// Release manifest to update.
    pub manifest_path: PathBuf,
    /// Metadata rewrite settings, if the library ships a metadata file.
    pub metadata: Option<MetadataSettings>,
    /// Template for the manifest's `download_url` field.
    pub download_url: Option<String>,
    /// Layout checks run against the finished archive.
    pub layout: LayoutRequirements,
}

/// Output produced by [`package_release`].
#[derive(Debug, Clone)]
pub struct PackageInfo {
    /// Path to the created archive.
    pub archive_path: PathBuf,
    /// SHA-256 digest of the archive.
    pub sha256: Sha256Digest,
    /// Archive size in bytes.
    pub size_bytes: u64,
    /// Total uncompressed size of the archived files.
    pub install_size_bytes: u64,
    /// Number of files in the archive.
    pub file_count: usize,
    /// Path to the updated manifest.
    pub manifest_path: PathBuf,
    /// Result of the layout checks.
    pub inspection: ArchiveInspection,
}

/// Package the asset tree and record the release in the manifest.
///
/// # Errors
///
/// Returns [`PackagingError::Input`] for invalid sources or templates,
/// [`PackagingError::ManifestCorrupt`] when the existing manifest cannot
/// be parsed, [`PackagingError::ManifestLocked`] when another run holds the
/// manifest, and [`PackagingError::Io`] / [`PackagingError::Archive`] on
/// filesystem or zip failures.
pub fn package_release(params: &PackageParams) -> Result<PackageInfo> {
    let archive_name = ArchiveName::new(params.library_name.clone(), params.version.clone());
    let filename = archive_name.filename();
    let archive_path = params.output_dir.join(&filename);
    let tag = params
        .tag
        .clone()
        .unwrap_or_else(|| params.version.default_tag());

    info!("packaging {} {}", params.library_name, params.version);

    let download_url = params
        .download_url
        .as_deref()
        .map(|template| {
            render_download_url(
                template,
                UrlContext {
                    tag: &tag,
                    version: params.version.as_str(),
                    filename: &filename,
                },
            )
        })
        .transpose()?;

    let exclude = OutputExclusions {
        files: vec![
            normalise_path(&archive_path),
            normalise_path(&params.manifest_path),
            normalise_path(&lock_path_for(&params.manifest_path)),
        ],
        archive_dir: Some(normalise_path(&params.output_dir)),
        archive_prefix: format!("{}-", params.library_name),
    };
    let entries = collect_assets(&params.root, &params.sources, &exclude)?;
    let members = build_members(params, entries)?;

    fs::create_dir_all(&params.output_dir)
        .map_err(|source| PackagingError::io("create", &params.output_dir, source))?;
    let mut update = ManifestUpdate::begin(&params.manifest_path)?;

    let summary = create_archive(&archive_path, &members)?;
    let (sha256, size_bytes) = compute_sha256(&archive_path)?;
    info!("created {} ({size_bytes} bytes)", archive_path.display());

    let inspection = inspect_archive(
        &archive_path,
        &params.layout.required_files,
        &params.layout.required_prefixes,
    )?;
    report_inspection(&inspection);

    update.upsert(
        params.version.clone(),
        ManifestEntry {
            filename,
            sha256: sha256.clone(),
            size_bytes,
            install_size_bytes: Some(summary.install_size_bytes),
            download_url,
            status: params.metadata.as_ref().map(|m| m.status.clone()),
            kicad_version: params.metadata.as_ref().map(|m| m.kicad_version.clone()),
        },
    );
    update.commit()?;

    Ok(PackageInfo {
        archive_path,
        sha256,
        size_bytes,
        install_size_bytes: summary.install_size_bytes,
        file_count: summary.file_count,
        manifest_path: params.manifest_path.clone(),
        inspection,
    })
}

/// Turn collected assets into archive members, substituting the rewritten
/// metadata document for the on-disk copy.
fn build_members(params: &PackageParams, entries: Vec<AssetEntry>) -> Result<Vec<ArchiveMember>> {
    let metadata_entry = params
        .metadata
        .as_ref()
        .and_then(|settings| entry_name(&settings.file));

    let mut rewrote_metadata = false;
    let mut members = Vec::with_capacity(entries.len());
    for entry in entries {
        let contents = match (&params.metadata, &metadata_entry) {
            (Some(settings), Some(target)) if *target == entry.archive_path => {
                let release = MetadataVersion {
                    version: params.version.clone(),
                    status: settings.status.clone(),
                    kicad_version: settings.kicad_version.clone(),
                };
                rewrote_metadata = true;
                MemberContents::Bytes(rewrite_metadata_file(&entry.source, &release)?)
            }
            _ => MemberContents::File(entry.source),
        };
        members.push(ArchiveMember {
            archive_path: entry.archive_path,
            contents,
        });
    }

    if let (Some(settings), false) = (&params.metadata, rewrote_metadata) {
        warn!(
            "metadata file {} is not among the packaged sources; archive keeps no version record",
            settings.file.display()
        );
    }
    Ok(members)
}

fn report_inspection(inspection: &ArchiveInspection) {
    for file in &inspection.missing_files {
        warn!("archive is missing required file {file}");
    }
    for prefix in &inspection.missing_prefixes {
        warn!("archive has no entries under {prefix}");
    }
    info!("archive contains {} file(s)", inspection.entry_count);
}

#[cfg(test)]
#[path = "packaging_tests.rs"]
mod tests;
