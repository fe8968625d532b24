//! `pulsar-package` entrypoint.
//!
//! Loads `packager.toml`, applies command-line overrides, runs the
//! packaging pipeline, and prints a release summary on stdout. Diagnostics
//! and errors go to stderr; the exit status reflects the error category.

use clap::Parser;
use log::debug;
use pulsar_packager::cli::Cli;
use pulsar_packager::config::{ConfigError, PackagerConfig};
use pulsar_packager::error::{InputError, PackagingError};
use pulsar_packager::logging;
use pulsar_packager::release::packaging::{PackageInfo, package_release};
use std::io::Write;
use thiserror::Error;

/// Errors returned by the packaging CLI.
#[derive(Debug, Error)]
enum RunError {
    /// The configuration file could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A command-line or configuration value failed validation.
    #[error(transparent)]
    Input(#[from] InputError),

    /// The packaging pipeline failed.
    #[error(transparent)]
    Packaging(#[from] PackagingError),

    /// The release summary could not be written.
    #[error("failed to write summary: {0}")]
    Output(#[source] std::io::Error),
}

impl RunError {
    fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Input(_) => 2,
            Self::Packaging(err) => err.category().exit_code(),
            Self::Output(_) => 1,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = logging::init(logging::level_for(cli.verbosity, cli.quiet)) {
        eprintln!("warning: logging unavailable: {err}");
    }

    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stdout);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stdout: &mut dyn Write) -> Result<PackageInfo, RunError> {
    let config = load_config(cli)?;
    let params = config.package_params(&cli.root, cli.run_options())?;
    let info = package_release(&params)?;
    write_summary(&info, stdout).map_err(RunError::Output)?;
    Ok(info)
}

fn load_config(cli: &Cli) -> Result<PackagerConfig, ConfigError> {
    let (path, explicit) = cli.config_path();
    debug!("loading configuration from {}", path.display());
    if explicit {
        PackagerConfig::load(&path)
    } else {
        PackagerConfig::load_or_default(&path)
    }
}

fn write_summary(info: &PackageInfo, out: &mut dyn Write) -> std::io::Result<()> {
    writeln!(out, "Created {}", info.archive_path.display())?;
    writeln!(out, "  sha256:        {}", info.sha256)?;
    writeln!(out, "  download size: {} bytes", info.size_bytes)?;
    writeln!(out, "  install size:  {} bytes", info.install_size_bytes)?;
    writeln!(out, "  files:         {}", info.file_count)?;
    writeln!(out, "Updated {}", info.manifest_path.display())
}

fn exit_code_for_run_result(result: Result<PackageInfo, RunError>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(_) => 0,
        Err(err) => {
            let _ = writeln!(stderr, "error: {err}");
            err.exit_code()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::fs;
    use tempfile::TempDir;

    #[fixture]
    fn library() -> TempDir {
        let dir = TempDir::new().expect("temp dir");
        let root = dir.path();
        fs::create_dir_all(root.join("symbols")).expect("mkdir");
        fs::create_dir_all(root.join("footprints")).expect("mkdir");
        fs::write(root.join("symbols/BC846A.kicad_sym"), b"(symbol)").expect("write");
        fs::write(root.join("footprints/SOT-23.kicad_mod"), b"(footprint)").expect("write");
        fs::write(
            root.join("packager.toml"),
            concat!(
                "sources = [\"symbols\", \"footprints\"]\n",
                "output_dir = \"dist\"\n",
                "[metadata]\n",
                "rewrite = false\n",
                "[validation]\n",
                "required_files = []\n",
            ),
        )
        .expect("write");
        dir
    }

    fn cli_for(root: &TempDir, extra: &[&str]) -> Cli {
        let root = root.path().to_str().expect("utf8 temp path").to_owned();
        let args = ["pulsar-package", "--version", "1.0.0", "--root", root.as_str()]
            .into_iter()
            .chain(extra.iter().copied());
        Cli::parse_from(args)
    }

    #[rstest]
    fn run_packages_and_prints_summary(library: TempDir) {
        let cli = cli_for(&library, &[]);
        let mut stdout = Vec::new();

        let info = run(&cli, &mut stdout).expect("run succeeds");

        let summary = String::from_utf8(stdout).expect("utf8");
        assert!(summary.contains("PULSAR-KiCad-Lib-1.0.0.zip"));
        assert!(summary.contains(info.sha256.as_str()));
        assert!(summary.contains(&format!("download size: {} bytes", info.size_bytes)));
        assert!(library.path().join("dist/PULSAR-KiCad-Lib-1.0.0.zip").is_file());
        assert!(library.path().join("releases.json").is_file());
    }

    #[rstest]
    fn missing_explicit_config_exits_with_input_code(library: TempDir) {
        let cli = cli_for(&library, &["--config", "/nonexistent/packager.toml"]);
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        let code = exit_code_for_run_result(run(&cli, &mut stdout), &mut stderr);

        assert_eq!(code, 2);
        let message = String::from_utf8(stderr).expect("utf8");
        assert!(message.starts_with("error: failed to read configuration"));
    }

    #[rstest]
    fn invalid_version_exits_with_input_code(library: TempDir) {
        let root = library.path().to_str().expect("utf8").to_owned();
        let cli = Cli::parse_from(["pulsar-package", "--version", "1.0/evil", "--root", root.as_str()]);
        let mut stderr = Vec::new();

        let code = exit_code_for_run_result(run(&cli, &mut Vec::new()), &mut stderr);

        assert_eq!(code, 2);
        assert!(!library.path().join("releases.json").exists());
    }

    #[rstest]
    fn corrupt_manifest_exits_with_code_three(library: TempDir) {
        fs::write(library.path().join("releases.json"), "not json").expect("write");
        let cli = cli_for(&library, &[]);
        let mut stderr = Vec::new();

        let code = exit_code_for_run_result(run(&cli, &mut Vec::new()), &mut stderr);

        assert_eq!(code, 3);
        assert_eq!(
            fs::read_to_string(library.path().join("releases.json")).expect("read"),
            "not json"
        );
    }

    #[rstest]
    fn manifest_flag_overrides_configuration(library: TempDir) {
        let manifest = library.path().join("docs/releases.json");
        let manifest_arg = manifest.to_str().expect("utf8").to_owned();
        let cli = cli_for(&library, &["--manifest", manifest_arg.as_str()]);

        run(&cli, &mut Vec::new()).expect("run succeeds");

        assert!(manifest.is_file());
        assert!(!library.path().join("releases.json").exists());
    }

    #[test]
    fn success_exits_with_zero() {
        let info = PackageInfo {
            archive_path: "lib.zip".into(),
            sha256: pulsar_packager::release::sha256_digest::Sha256Digest::of_bytes(b""),
            size_bytes: 0,
            install_size_bytes: 0,
            file_count: 0,
            manifest_path: "releases.json".into(),
            inspection: pulsar_packager::release::archive::ArchiveInspection::default(),
        };
        let mut stderr = Vec::new();
        assert_eq!(exit_code_for_run_result(Ok(info), &mut stderr), 0);
        assert!(stderr.is_empty());
    }
}
