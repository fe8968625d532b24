//! Release archive naming, packaging, and manifest maintenance.
//!
//! # Sub-modules
//!
//! - [`archive`]: Reproducible zip creation, hashing, and layout checks.
//! - [`assets`]: Asset tree collection in deterministic order.
//! - [`download_url`]: Download URL templating.
//! - [`json`]: Four-space JSON output shared by the writers.
//! - [`manifest`]: Release manifest schema and locked, atomic updates.
//! - [`metadata`]: In-archive plugin manager metadata rewriting.
//! - [`naming`]: Archive naming policy (`ArchiveName`).
//! - [`packaging`]: The end-to-end packaging pipeline.
//! - [`sha256_digest`]: SHA-256 digest newtype (`Sha256Digest`).
//! - [`version`]: Release version newtype (`ReleaseVersion`).

pub mod archive;
pub mod assets;
pub mod download_url;
pub mod json;
pub mod manifest;
pub mod metadata;
pub mod naming;
pub mod packaging;
pub mod sha256_digest;
pub mod version;
