//! Release version newtype.
//!
//! The version string is used verbatim as the manifest key and inside the
//! archive filename, so beyond being non-empty it must not contain path
//! separators or whitespace.

use crate::error::InputError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated release version such as `1.0.0`.
///
/// # Examples
///
/// ```
/// use pulsar_packager::release::version::ReleaseVersion;
///
/// let version = ReleaseVersion::try_from("1.0.0").expect("valid version");
/// assert_eq!(version.as_str(), "1.0.0");
/// assert_eq!(version.default_tag(), "v1.0.0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReleaseVersion(String);

impl ReleaseVersion {
    /// Return the version as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the release tag conventionally paired with this version.
    #[must_use]
    pub fn default_tag(&self) -> String {
        format!("v{}", self.0)
    }
}

impl TryFrom<&str> for ReleaseVersion {
    type Error = InputError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        validate_component(value).map_err(|reason| InputError::InvalidVersion {
            value: value.to_owned(),
            reason,
        })?;
        Ok(Self(value.to_owned()))
    }
}

impl TryFrom<String> for ReleaseVersion {
    type Error = InputError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<ReleaseVersion> for String {
    fn from(value: ReleaseVersion) -> Self {
        value.0
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shared check for strings embedded in archive filenames.
pub(crate) fn validate_component(value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err("must not be empty".to_owned());
    }
    if let Some(bad) = value
        .chars()
        .find(|c| matches!(c, '/' | '\\') || c.is_whitespace() || c.is_control())
    {
        return Err(format!("forbidden character {bad:?}"));
    }
    Ok(())
}
