//! Release packager for the PULSAR KiCad library.
//!
//! Zips the library's symbols, footprints, and 3D models into a versioned
//! archive and records its SHA-256 digest and size in a release manifest
//! read by the plugin distribution channel.
//!
//! # Modules
//!
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - `packager.toml` loading and CLI overrides
//! - [`error`] - Error types and exit-code classification
//! - [`logging`] - Stderr subscriber for the `log` facade
//! - [`release`] - Archive creation and manifest maintenance

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod release;
