//! Error types for the release packager.
//!
//! Every failure is classified into one of three categories that drive the
//! CLI exit code: bad input, I/O failure, or a corrupt release manifest.
//! Variants carry the offending path so operators can act on the message
//! without re-running with extra logging.

use std::path::PathBuf;
use thiserror::Error;

/// Validation failures for caller-supplied inputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// The release version is empty or contains forbidden characters.
    #[error("invalid release version \"{value}\": {reason}")]
    InvalidVersion {
        /// The rejected version string.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },

    /// The library name is empty or contains forbidden characters.
    #[error("invalid library name \"{value}\": {reason}")]
    InvalidLibraryName {
        /// The rejected library name.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },

    /// No source paths were supplied.
    #[error("no source paths provided for packaging")]
    NoSources,

    /// A source path does not exist on disk.
    #[error("source path not found: {0}")]
    MissingSource(PathBuf),

    /// A source path resolves outside the library root.
    #[error("source path {path} lies outside the library root {root}")]
    OutsideRoot {
        /// The offending source path.
        path: PathBuf,
        /// The library root it was resolved against.
        root: PathBuf,
    },

    /// A file path cannot be represented as a UTF-8 archive entry name.
    #[error("path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),

    /// The source paths contain no regular files.
    #[error("source paths contain no files to archive")]
    NoFiles,

    /// The library metadata document is not a JSON object.
    #[error("metadata file {path} is invalid: {reason}")]
    InvalidMetadata {
        /// Path to the metadata file.
        path: PathBuf,
        /// Description of the problem.
        reason: String,
    },

    /// The download URL template references an unknown placeholder.
    #[error("download URL template has unknown placeholder \"{{{placeholder}}}\"")]
    UnknownPlaceholder {
        /// Placeholder name without braces.
        placeholder: String,
    },

    /// The download URL template has an unterminated placeholder.
    #[error("download URL template has an unterminated placeholder: {template}")]
    UnterminatedPlaceholder {
        /// The offending template.
        template: String,
    },
}

/// Coarse classification of a [`PackagingError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller input was rejected before any output was written.
    Input,
    /// Reading sources or writing outputs failed.
    Io,
    /// The existing release manifest could not be parsed.
    ManifestCorrupt,
}

impl ErrorCategory {
    /// Process exit code reported for this category.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Io => 1,
            Self::Input => 2,
            Self::ManifestCorrupt => 3,
        }
    }
}

/// Errors arising from a packaging run.
#[derive(Debug, Error)]
pub enum PackagingError {
    /// Caller input failed validation.
    #[error(transparent)]
    Input(#[from] InputError),

    /// A filesystem operation failed.
    #[error("failed to {action} {path}: {source}")]
    Io {
        /// What the packager was doing, e.g. "read" or "create".
        action: &'static str,
        /// The path involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The zip writer or reader failed.
    #[error("archive error for {path}: {source}")]
    Archive {
        /// Path to the archive.
        path: PathBuf,
        /// Underlying zip error.
        #[source]
        source: zip::result::ZipError,
    },

    /// Another process holds the manifest lock.
    #[error("manifest {path} is locked by another packaging run")]
    ManifestLocked {
        /// Path to the manifest.
        path: PathBuf,
    },

    /// The existing manifest is not a valid release manifest.
    #[error("manifest {path} is corrupt ({source}); fix or remove it manually")]
    ManifestCorrupt {
        /// Path to the manifest.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PackagingError {
    /// Wrap an I/O error with the action and path that produced it.
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Classify the error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Input(_) => ErrorCategory::Input,
            Self::ManifestCorrupt { .. } => ErrorCategory::ManifestCorrupt,
            Self::Io { .. }
            | Self::Archive { .. }
            | Self::ManifestLocked { .. }
            | Self::Serialization(_) => ErrorCategory::Io,
        }
    }
}

/// Result type alias using [`PackagingError`].
pub type Result<T> = std::result::Result<T, PackagingError>;
