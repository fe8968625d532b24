//! Packager configuration loaded from `packager.toml`.
//!
//! Every key is optional; omitted keys fall back to the layout of the
//! PULSAR library repository. Relative paths resolve against the library
//! root, and command-line flags take precedence over file values.

use crate::error::InputError;
use crate::release::naming::{DEFAULT_LIBRARY_NAME, LibraryName};
use crate::release::packaging::{LayoutRequirements, MetadataSettings, PackageParams};
use crate::release::version::ReleaseVersion;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Conventional configuration filename in the library root.
pub const CONFIG_FILENAME: &str = "packager.toml";

/// Download location of PULSAR release assets.
const DEFAULT_DOWNLOAD_URL: &str =
    "https://github.com/Alex-C-EE/PULSAR-KiCad-Lib/releases/download/{tag}/{filename}";

/// Errors arising while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    Read {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML or has unknown keys.
    #[error("invalid configuration {path}: {source}")]
    Parse {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level packager configuration.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PackagerConfig {
    /// Archive filename prefix.
    pub library_name: String,
    /// Files and directories to archive, relative to the library root.
    pub sources: Vec<PathBuf>,
    /// Directory the archive is written to.
    pub output_dir: PathBuf,
    /// Release manifest path.
    pub manifest: PathBuf,
    /// Plugin manager metadata rewriting.
    pub metadata: MetadataConfig,
    /// Distribution channel settings.
    pub distribution: DistributionConfig,
    /// Archive layout checks.
    pub validation: ValidationConfig,
}

impl Default for PackagerConfig {
    fn default() -> Self {
        Self {
            library_name: DEFAULT_LIBRARY_NAME.to_owned(),
            sources: ["metadata.json", "resources", "symbols", "footprints", "3dmodels"]
                .into_iter()
                .map(PathBuf::from)
                .collect(),
            output_dir: PathBuf::from("."),
            manifest: PathBuf::from("releases.json"),
            metadata: MetadataConfig::default(),
            distribution: DistributionConfig::default(),
            validation: ValidationConfig::default(),
        }
    }
}

/// Settings for the in-archive `metadata.json` rewrite.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MetadataConfig {
    /// Whether to rewrite the metadata `versions` array.
    pub rewrite: bool,
    /// Metadata file, relative to the library root.
    pub file: PathBuf,
    /// Release status recorded in the metadata.
    pub status: String,
    /// Minimum supported KiCad version.
    pub kicad_version: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            rewrite: true,
            file: PathBuf::from("metadata.json"),
            status: "stable".to_owned(),
            kicad_version: "8.0".to_owned(),
        }
    }
}

/// Distribution channel settings.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DistributionConfig {
    /// Download URL template with `{tag}`, `{version}` and `{filename}`
    /// placeholders. A blank value omits `download_url` from the manifest.
    pub download_url: String,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            download_url: DEFAULT_DOWNLOAD_URL.to_owned(),
        }
    }
}

impl DistributionConfig {
    /// Returns the download URL template, treating blank values as absent.
    #[must_use]
    pub fn download_url(&self) -> Option<&str> {
        let trimmed = self.download_url.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// Layout checks applied to the finished archive.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    /// Entry names that must be present.
    pub required_files: Vec<String>,
    /// Prefixes that at least one entry must start with.
    pub required_prefixes: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            required_files: vec!["metadata.json".to_owned()],
            required_prefixes: vec!["symbols/".to_owned(), "footprints/".to_owned()],
        }
    }
}

/// Per-invocation values that complete a configuration into
/// [`PackageParams`].
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    /// Release version string.
    pub version: String,
    /// Release tag override.
    pub tag: Option<String>,
    /// Output directory override.
    pub output_dir: Option<PathBuf>,
    /// Manifest path override.
    pub manifest: Option<PathBuf>,
}

impl PackagerConfig {
    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns the TOML error for malformed input or unknown keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use pulsar_packager::config::PackagerConfig;
    ///
    /// let config = PackagerConfig::from_toml_str("library_name = \"Acme\"\n")
    ///     .expect("valid configuration");
    /// assert_eq!(config.library_name, "Acme");
    /// assert_eq!(config.manifest.to_str(), Some("releases.json"));
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    /// Load configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration from `path`, using defaults when it is absent.
    ///
    /// # Errors
    ///
    /// As for [`Self::load`], except that a missing file is not an error.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Combine this configuration with per-run options into packaging
    /// parameters rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`InputError`] if the version or library name is invalid.
    pub fn package_params(&self, root: &Path, run: RunOptions) -> Result<PackageParams, InputError> {
        let version = ReleaseVersion::try_from(run.version)?;
        let library_name = LibraryName::try_from(self.library_name.as_str())?;
        let output_dir = run.output_dir.unwrap_or_else(|| root.join(&self.output_dir));
        let manifest_path = run.manifest.unwrap_or_else(|| root.join(&self.manifest));
        let metadata = self.metadata.rewrite.then(|| MetadataSettings {
            file: self.metadata.file.clone(),
            status: self.metadata.status.clone(),
            kicad_version: self.metadata.kicad_version.clone(),
        });

        Ok(PackageParams {
            version,
            tag: run.tag,
            library_name,
            root: root.to_path_buf(),
            sources: self.sources.clone(),
            output_dir,
            manifest_path,
            metadata,
            download_url: self.distribution.download_url().map(str::to_owned),
            layout: LayoutRequirements {
                required_files: self.validation.required_files.clone(),
                required_prefixes: self.validation.required_prefixes.clone(),
            },
        })
    }
}
