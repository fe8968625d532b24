//! Archive naming policy for library releases.
//!
//! Constructs deterministic archive names in the form
//! `<LibraryName>-<version>.zip`.

use super::version::{ReleaseVersion, validate_component};
use crate::error::InputError;
use std::fmt;

/// The library name used when no configuration overrides it.
pub const DEFAULT_LIBRARY_NAME: &str = "PULSAR-KiCad-Lib";

/// The fixed file extension for release archives.
const ARCHIVE_EXTENSION: &str = ".zip";

/// A validated library name used as the archive prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LibraryName(String);

impl LibraryName {
    /// Return the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LibraryName {
    fn default() -> Self {
        Self(DEFAULT_LIBRARY_NAME.to_owned())
    }
}

impl TryFrom<&str> for LibraryName {
    type Error = InputError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        validate_component(value).map_err(|reason| InputError::InvalidLibraryName {
            value: value.to_owned(),
            reason,
        })?;
        Ok(Self(value.to_owned()))
    }
}

impl fmt::Display for LibraryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fully-qualified release archive name.
///
/// # Examples
///
/// ```
/// use pulsar_packager::release::naming::{ArchiveName, LibraryName};
/// use pulsar_packager::release::version::ReleaseVersion;
///
/// let version = ReleaseVersion::try_from("1.0.0").expect("valid version");
/// let name = ArchiveName::new(LibraryName::default(), version);
/// assert_eq!(name.to_string(), "PULSAR-KiCad-Lib-1.0.0.zip");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveName {
    library: LibraryName,
    version: ReleaseVersion,
}

impl ArchiveName {
    /// Create an archive name from validated components.
    #[must_use]
    pub fn new(library: LibraryName, version: ReleaseVersion) -> Self {
        Self { library, version }
    }

    /// Return the library component.
    #[must_use]
    pub fn library(&self) -> &LibraryName {
        &self.library
    }

    /// Return the version component.
    #[must_use]
    pub fn version(&self) -> &ReleaseVersion {
        &self.version
    }

    /// Return the filename as a string without consuming the value.
    #[must_use]
    pub fn filename(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ArchiveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}{ARCHIVE_EXTENSION}", self.library, self.version)
    }
}
