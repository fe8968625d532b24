//! Plugin manager metadata rewriting.
//!
//! KiCad's Plugin and Content Manager reads `metadata.json` from the archive
//! root and expects its `versions` array to describe the package being
//! installed. The packager rewrites that array in memory and archives the
//! result; the file in the asset tree is left untouched.

use super::version::ReleaseVersion;
use crate::error::{InputError, PackagingError, Result};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

/// Release attributes written into the metadata `versions` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataVersion {
    /// The release version.
    pub version: ReleaseVersion,
    /// Release status, e.g. `stable` or `testing`.
    pub status: String,
    /// Minimum KiCad version the library supports.
    pub kicad_version: String,
}

/// Read the metadata document at `path` and return the rewritten bytes.
///
/// # Errors
///
/// Returns [`PackagingError::Io`] if the file cannot be read and
/// [`InputError::InvalidMetadata`] if it is not a JSON object.
pub fn rewrite_metadata_file(path: &Path, release: &MetadataVersion) -> Result<Vec<u8>> {
    let raw =
        std::fs::read_to_string(path).map_err(|source| PackagingError::io("read", path, source))?;
    rewrite_metadata(&raw, release).map_err(|reason| {
        InputError::InvalidMetadata {
            path: path.to_path_buf(),
            reason,
        }
        .into()
    })
}

/// Replace the `versions` array of the metadata document in `raw`.
///
/// Every other key is preserved. The output uses four-space indentation
/// and ends with a newline so it matches hand-edited metadata files.
///
/// # Errors
///
/// Returns a description of the problem when `raw` is not a JSON object.
pub fn rewrite_metadata(raw: &str, release: &MetadataVersion) -> std::result::Result<Vec<u8>, String> {
    let mut document: Value = serde_json::from_str(raw).map_err(|err| err.to_string())?;
    let Some(object) = document.as_object_mut() else {
        return Err("top-level value must be a JSON object".to_owned());
    };
    let entry = serde_json::to_value(release).map_err(|err| err.to_string())?;
    object.insert("versions".to_owned(), Value::Array(vec![entry]));
    super::json::to_pretty_bytes(&document).map_err(|err| err.to_string())
}
