//! Command-line interface for the release packager.
//!
//! Flags override the values loaded from `packager.toml`; the library
//! layout itself lives in configuration so release scripts only pass the
//! version.

use crate::config::{CONFIG_FILENAME, RunOptions};
use clap::Parser;
use std::path::PathBuf;

/// Package a KiCad library into a versioned zip and update the release
/// manifest.
#[derive(Parser, Debug, Clone)]
#[command(name = "pulsar-package", disable_version_flag = true)]
#[command(about = "Package a KiCad library release and update releases.json")]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Package release 1.2.0 from the current directory:\n",
    "    $ pulsar-package --version 1.2.0\n\n",
    "  Write the archive to dist/ with a custom tag:\n",
    "    $ pulsar-package --version 1.2.0 --tag release-1.2.0 --output-dir dist\n\n",
    "EXIT STATUS:\n",
    "  0  success\n",
    "  1  filesystem or archive failure\n",
    "  2  invalid input or configuration\n",
    "  3  existing manifest is corrupt",
))]
pub struct Cli {
    /// Release version to package (e.g. "1.2.0").
    #[arg(long, value_name = "VERSION")]
    pub version: String,

    /// Release tag used in download URLs [default: v<VERSION>].
    #[arg(long, value_name = "TAG")]
    pub tag: Option<String>,

    /// Library root containing the assets to package.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// Configuration file [default: <ROOT>/packager.toml].
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory the archive is written to [default: from configuration].
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Release manifest to update [default: from configuration].
    #[arg(long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Only report errors.
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Cli {
    /// Configuration file to load, and whether it was named explicitly.
    ///
    /// An explicit `--config` must exist; the conventional file in the
    /// library root is optional.
    #[must_use]
    pub fn config_path(&self) -> (PathBuf, bool) {
        match &self.config {
            Some(path) => (path.clone(), true),
            None => (self.root.join(CONFIG_FILENAME), false),
        }
    }

    /// Per-run values forwarded to the configuration layer.
    #[must_use]
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            version: self.version.clone(),
            tag: self.tag.clone(),
            output_dir: self.output_dir.clone(),
            manifest: self.manifest.clone(),
        }
    }
}
