//! Asset tree collection.
//!
//! Resolves the configured source paths against the library root and walks
//! them into a flat, sorted list of files. The sort key is the archive
//! entry name, which makes the archive layout independent of directory
//! iteration order.

use crate::error::{InputError, PackagingError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, trace};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// One file scheduled for archiving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEntry {
    /// Location of the file on disk, as reached from the library root.
    pub source: PathBuf,
    /// `/`-separated path of the entry inside the archive.
    pub archive_path: String,
}

/// Packager outputs that collection skips.
///
/// Paths are compared after [`normalise_path`], so callers should pass
/// normalised locations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputExclusions {
    /// Individual files, such as the manifest and its lock file.
    pub files: Vec<PathBuf>,
    /// Directory release archives are written to.
    pub archive_dir: Option<PathBuf>,
    /// Filename prefix shared by every release archive of the library,
    /// e.g. `PULSAR-KiCad-Lib-`.
    pub archive_prefix: String,
}

impl OutputExclusions {
    /// Returns true when `path` is a manifest file or any release archive
    /// of this library, whatever its version.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        if self.files.iter().any(|file| file == path) {
            return true;
        }
        let Some(dir) = self.archive_dir.as_deref() else {
            return false;
        };
        path.parent() == Some(dir)
            && path
                .file_name()
                .and_then(OsStr::to_str)
                .is_some_and(|name| {
                    name.starts_with(self.archive_prefix.as_str())
                        && name.ends_with(".zip")
                })
    }
}

/// Collect every file under `sources`, sorted by archive path.
///
/// Relative sources resolve against `root`. Symlinks are followed but
/// entries keep the path they are reached by, so a linked file is archived
/// under its own name. Overlapping sources (for example `symbols` and
/// `symbols/BC846A.kicad_sym`) yield a single entry. Paths matched by
/// `exclude` are skipped so the packager never archives its own outputs.
///
/// # Errors
///
/// Returns [`InputError::NoSources`] for an empty source list,
/// [`InputError::MissingSource`] when a source does not exist,
/// [`InputError::OutsideRoot`] when a source escapes the root,
/// [`InputError::NoFiles`] when nothing remains to archive, and
/// [`PackagingError::Io`] when the tree cannot be read.
pub fn collect_assets(
    root: &Path,
    sources: &[PathBuf],
    exclude: &OutputExclusions,
) -> Result<Vec<AssetEntry>> {
    if sources.is_empty() {
        return Err(InputError::NoSources.into());
    }

    let canonical_root = root
        .canonicalize()
        .map_err(|source| PackagingError::io("resolve library root", root, source))?;

    let mut entries = BTreeMap::new();
    for source in sources {
        let start = resolve_source(&canonical_root, source)?;
        debug!("collecting assets from {}", start.display());
        walk_source(&canonical_root, &start, exclude, &mut entries)?;
    }

    if entries.is_empty() {
        return Err(InputError::NoFiles.into());
    }

    Ok(entries
        .into_iter()
        .map(|(archive_path, source)| AssetEntry {
            source,
            archive_path,
        })
        .collect())
}

/// Resolve `path` to an absolute location, canonicalizing the parent
/// directory when the file itself does not exist yet.
#[must_use]
pub fn normalise_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            parent
                .canonicalize()
                .map_or_else(|_| path.to_path_buf(), |dir| dir.join(name))
        }
        _ => path.to_path_buf(),
    }
}

/// Archive entry name for a path relative to the library root.
///
/// Returns `None` for absolute paths, paths that climb out of the root,
/// and paths that are not valid UTF-8.
///
/// # Examples
///
/// ```
/// use pulsar_packager::release::assets::entry_name;
/// use std::path::Path;
///
/// assert_eq!(
///     entry_name(Path::new("./symbols/../metadata.json")).as_deref(),
///     Some("metadata.json")
/// );
/// assert_eq!(entry_name(Path::new("../outside.json")), None);
/// ```
#[must_use]
pub fn entry_name(relative: &Path) -> Option<String> {
    let mut depth = 0usize;
    let mut parts: Vec<&str> = Vec::new();
    for component in relative.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                depth = depth.checked_sub(1)?;
                parts.pop();
            }
            Component::Normal(part) => {
                depth += 1;
                parts.push(part.to_str()?);
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// Remove `.` and `..` components without touching the filesystem.
fn lexical_normalise(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Locate `source` under the root. The returned path is the one walked and
/// named in the archive; its canonical form only serves the containment
/// check.
fn resolve_source(canonical_root: &Path, source: &Path) -> Result<PathBuf> {
    let outside = || InputError::OutsideRoot {
        path: source.to_path_buf(),
        root: canonical_root.to_path_buf(),
    };
    let joined = canonical_root.join(source);
    if !joined.exists() {
        return Err(InputError::MissingSource(source.to_path_buf()).into());
    }
    let canonical = joined
        .canonicalize()
        .map_err(|err| PackagingError::io("resolve source", &joined, err))?;
    if !canonical.starts_with(canonical_root) {
        return Err(outside().into());
    }

    let lexical = lexical_normalise(&joined);
    if lexical.starts_with(canonical_root) {
        Ok(lexical)
    } else {
        // Absolute sources spelled through a symlinked root.
        Ok(canonical)
    }
}

fn walk_source(
    canonical_root: &Path,
    start: &Path,
    exclude: &OutputExclusions,
    entries: &mut BTreeMap<String, PathBuf>,
) -> Result<()> {
    let walker = WalkDir::new(start)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|item| {
            let skip = exclude.matches(item.path());
            if skip {
                trace!("skipping packager output {}", item.path().display());
            }
            !skip
        });
    for item in walker {
        let item = item.map_err(|err| {
            let path = err
                .path()
                .map_or_else(|| start.to_path_buf(), Path::to_path_buf);
            PackagingError::io("read", path, err.into())
        })?;
        if !item.file_type().is_file() {
            continue;
        }
        let path = item.path();
        let archive_path = archive_path_for(canonical_root, path)?;
        trace!("queued {archive_path}");
        entries.insert(archive_path, path.to_path_buf());
    }
    Ok(())
}

/// Convert `path` to a `/`-separated name relative to `canonical_root`.
fn archive_path_for(canonical_root: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(canonical_root)
        .map_err(|_| InputError::OutsideRoot {
            path: path.to_path_buf(),
            root: canonical_root.to_path_buf(),
        })?;
    let relative = Utf8PathBuf::from_path_buf(relative.to_path_buf())
        .map_err(InputError::NonUtf8Path)?;
    Ok(join_components(&relative))
}

fn join_components(relative: &Utf8Path) -> String {
    relative
        .components()
        .map(|component| component.as_str())
        .collect::<Vec<_>>()
        .join("/")
}
