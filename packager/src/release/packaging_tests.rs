//! Unit tests for the release packaging pipeline.

use super::*;
use crate::error::InputError;
use crate::release::archive::list_entries;
use crate::release::manifest::load_manifest;
use rstest::{fixture, rstest};
use std::io::Read;
use std::path::Path;
use tempfile::TempDir;

const METADATA: &str = r#"{
    "name": "PULSAR KiCad Library",
    "identifier": "com.github.alex-c-ee.pulsar-kicad-lib",
    "type": "library",
    "versions": []
}
"#;

#[fixture]
fn library() -> TempDir {
    let dir = TempDir::new().expect("temp dir creation succeeds");
    let root = dir.path();
    fs::create_dir_all(root.join("symbols")).expect("mkdir");
    fs::create_dir_all(root.join("footprints/PULSAR.pretty")).expect("mkdir");
    fs::write(root.join("symbols/BC846A.kicad_sym"), b"(kicad_symbol_lib BC846A)").expect("write");
    fs::write(
        root.join("footprints/PULSAR.pretty/SOT-23.kicad_mod"),
        b"(footprint \"SOT-23\")",
    )
    .expect("write");
    fs::write(root.join("metadata.json"), METADATA).expect("write");
    dir
}

fn params(root: &Path, version: &str) -> PackageParams {
    PackageParams {
        version: ReleaseVersion::try_from(version).expect("valid version"),
        tag: None,
        library_name: LibraryName::default(),
        root: root.to_path_buf(),
        sources: vec![
            PathBuf::from("metadata.json"),
            PathBuf::from("symbols"),
            PathBuf::from("footprints"),
        ],
        output_dir: root.join("dist"),
        manifest_path: root.join("releases.json"),
        metadata: Some(MetadataSettings {
            file: PathBuf::from("metadata.json"),
            status: "stable".to_owned(),
            kicad_version: "8.0".to_owned(),
        }),
        download_url: None,
        layout: LayoutRequirements {
            required_files: vec!["metadata.json".to_owned()],
            required_prefixes: vec!["symbols/".to_owned(), "footprints/".to_owned()],
        },
    }
}

fn read_entry(archive_path: &Path, name: &str) -> String {
    let file = fs::File::open(archive_path).expect("open archive");
    let mut archive = zip::ZipArchive::new(file).expect("zip archive");
    let mut entry = archive.by_name(name).expect("entry present");
    let mut out = String::new();
    entry.read_to_string(&mut out).expect("read entry");
    out
}

#[rstest]
fn packages_symbol_with_relative_path(library: TempDir) {
    let mut params = params(library.path(), "1.0.0");
    params.sources = vec![PathBuf::from("symbols")];
    params.metadata = None;
    params.layout = LayoutRequirements::default();

    let info = package_release(&params).expect("packaging succeeds");

    assert_eq!(
        info.archive_path.file_name().expect("filename").to_string_lossy(),
        "PULSAR-KiCad-Lib-1.0.0.zip"
    );
    assert_eq!(
        list_entries(&info.archive_path).expect("list"),
        vec!["symbols/BC846A.kicad_sym"]
    );

    let manifest = load_manifest(&params.manifest_path).expect("manifest");
    let entry = manifest.get(&params.version).expect("entry recorded");
    assert_eq!(entry.filename, "PULSAR-KiCad-Lib-1.0.0.zip");
    assert_eq!(entry.sha256, info.sha256);
    assert_eq!(entry.size_bytes, info.size_bytes);
}

#[rstest]
fn manifest_sha256_matches_archive_digest(library: TempDir) {
    let params = params(library.path(), "1.0.0");
    let info = package_release(&params).expect("packaging succeeds");

    let (digest, size) = compute_sha256(&info.archive_path).expect("digest");
    let manifest = load_manifest(&params.manifest_path).expect("manifest");
    let entry = manifest.get(&params.version).expect("entry");
    assert_eq!(entry.sha256, digest);
    assert_eq!(entry.size_bytes, size);
    assert_eq!(
        size,
        fs::metadata(&info.archive_path).expect("stat").len()
    );
}

#[rstest]
fn repackaging_is_byte_identical(library: TempDir) {
    let params = params(library.path(), "1.0.0");

    let first = package_release(&params).expect("first run");
    let first_bytes = fs::read(&first.archive_path).expect("read");
    let second = package_release(&params).expect("second run");
    let second_bytes = fs::read(&second.archive_path).expect("read");

    assert_eq!(first_bytes, second_bytes);
    assert_eq!(first.sha256, second.sha256);
    let manifest = load_manifest(&params.manifest_path).expect("manifest");
    assert_eq!(manifest.len(), 1);
}

#[rstest]
fn new_version_keeps_existing_entries(library: TempDir) {
    let first = params(library.path(), "1.0.0");
    let first_info = package_release(&first).expect("1.0.0");
    let second = params(library.path(), "1.1.0");
    package_release(&second).expect("1.1.0");

    fs::write(library.path().join("symbols/AO3400.kicad_sym"), b"(new part)").expect("write");
    let rebuilt = package_release(&second).expect("1.1.0 rebuilt");

    let manifest = load_manifest(&first.manifest_path).expect("manifest");
    assert_eq!(manifest.len(), 2);
    assert_eq!(
        manifest.get(&first.version).map(|e| &e.sha256),
        Some(&first_info.sha256)
    );
    assert_eq!(
        manifest.get(&second.version).map(|e| &e.sha256),
        Some(&rebuilt.sha256)
    );
}

#[rstest]
fn empty_source_set_is_an_input_error(library: TempDir) {
    let mut params = params(library.path(), "1.0.0");
    params.sources.clear();

    let err = package_release(&params).expect_err("no sources");

    assert!(matches!(err, PackagingError::Input(InputError::NoSources)));
    assert!(!params.output_dir.join("PULSAR-KiCad-Lib-1.0.0.zip").exists());
    assert!(!params.manifest_path.exists());
}

#[rstest]
fn missing_source_is_an_input_error(library: TempDir) {
    let mut params = params(library.path(), "1.0.0");
    params.sources.push(PathBuf::from("3dmodels"));

    let err = package_release(&params).expect_err("missing 3dmodels");
    assert!(matches!(
        err,
        PackagingError::Input(InputError::MissingSource(_))
    ));
}

#[rstest]
fn corrupt_manifest_is_surfaced_and_preserved(library: TempDir) {
    let params = params(library.path(), "1.0.0");
    fs::write(&params.manifest_path, "{\"0.9.0\": ").expect("write");

    let err = package_release(&params).expect_err("corrupt manifest");

    assert!(matches!(err, PackagingError::ManifestCorrupt { .. }));
    assert_eq!(err.category().exit_code(), 3);
    assert_eq!(
        fs::read_to_string(&params.manifest_path).expect("read"),
        "{\"0.9.0\": "
    );
}

#[rstest]
fn metadata_is_rewritten_only_inside_the_archive(library: TempDir) {
    let params = params(library.path(), "2.0.0");
    let info = package_release(&params).expect("packaging succeeds");

    let on_disk = fs::read_to_string(library.path().join("metadata.json")).expect("read");
    assert_eq!(on_disk, METADATA);

    let archived: serde_json::Value =
        serde_json::from_str(&read_entry(&info.archive_path, "metadata.json")).expect("json");
    assert_eq!(archived["versions"][0]["version"], "2.0.0");
    assert_eq!(archived["versions"][0]["status"], "stable");
    assert_eq!(archived["versions"][0]["kicad_version"], "8.0");
    assert_eq!(archived["name"], "PULSAR KiCad Library");
}

#[rstest]
fn install_size_counts_uncompressed_members(library: TempDir) {
    let mut params = params(library.path(), "1.0.0");
    params.metadata = None;
    let info = package_release(&params).expect("packaging succeeds");

    let expected = METADATA.len() as u64
        + b"(kicad_symbol_lib BC846A)".len() as u64
        + b"(footprint \"SOT-23\")".len() as u64;
    assert_eq!(info.install_size_bytes, expected);
    assert_eq!(info.file_count, 3);
}

#[rstest]
fn download_url_uses_default_tag(library: TempDir) {
    let mut params = params(library.path(), "1.0.0");
    params.download_url = Some("https://example.com/{tag}/{filename}".to_owned());

    package_release(&params).expect("packaging succeeds");

    let manifest = load_manifest(&params.manifest_path).expect("manifest");
    let entry = manifest.get(&params.version).expect("entry");
    assert_eq!(
        entry.download_url.as_deref(),
        Some("https://example.com/v1.0.0/PULSAR-KiCad-Lib-1.0.0.zip")
    );
}

#[rstest]
fn bad_url_template_fails_before_writing(library: TempDir) {
    let mut params = params(library.path(), "1.0.0");
    params.download_url = Some("https://example.com/{sha}".to_owned());

    let err = package_release(&params).expect_err("unknown placeholder");

    assert!(matches!(
        err,
        PackagingError::Input(InputError::UnknownPlaceholder { .. })
    ));
    assert!(!params.output_dir.exists());
}

#[rstest]
fn layout_gaps_are_reported_not_fatal(library: TempDir) {
    let mut params = params(library.path(), "1.0.0");
    params.sources = vec![PathBuf::from("symbols")];
    params.metadata = None;

    let info = package_release(&params).expect("packaging succeeds");

    assert!(!info.inspection.is_complete());
    assert_eq!(info.inspection.missing_files, vec!["metadata.json"]);
    assert_eq!(info.inspection.missing_prefixes, vec!["footprints/"]);
}

#[rstest]
fn outputs_inside_the_tree_are_not_archived(library: TempDir) {
    let mut first = params(library.path(), "1.0.0");
    first.sources = vec![PathBuf::from(".")];
    first.output_dir = library.path().to_path_buf();
    first.metadata = None;
    let mut second = first.clone();
    second.version = ReleaseVersion::try_from("1.1.0").expect("valid version");

    package_release(&first).expect("1.0.0");
    package_release(&first).expect("1.0.0 rebuilt");
    let info = package_release(&second).expect("1.1.0");

    let names = list_entries(&info.archive_path).expect("list");
    assert!(!names.iter().any(|name| name.ends_with(".zip")), "{names:?}");
    assert!(!names.iter().any(|name| name.starts_with("releases.json")));
    assert_eq!(
        names,
        vec![
            "footprints/PULSAR.pretty/SOT-23.kicad_mod",
            "metadata.json",
            "symbols/BC846A.kicad_sym",
        ]
    );
}

#[rstest]
fn archive_contents_do_not_depend_on_earlier_releases(library: TempDir) {
    let mut params = params(library.path(), "1.1.0");
    params.sources = vec![PathBuf::from(".")];
    params.output_dir = library.path().to_path_buf();
    params.manifest_path = library.path().join("docs/releases.json");

    let clean = package_release(&params).expect("clean tree");
    fs::write(library.path().join("PULSAR-KiCad-Lib-0.9.0.zip"), b"PK old").expect("write");
    let cluttered = package_release(&params).expect("with older archive");

    assert_eq!(clean.sha256, cluttered.sha256);
}

#[cfg(unix)]
#[rstest]
fn symlinked_metadata_is_archived_and_rewritten_under_its_own_name(library: TempDir) {
    let root = library.path();
    fs::rename(root.join("metadata.json"), root.join("meta-real.json")).expect("rename");
    std::os::unix::fs::symlink("meta-real.json", root.join("metadata.json")).expect("link");
    let params = params(root, "3.0.0");

    let info = package_release(&params).expect("packaging succeeds");

    let names = list_entries(&info.archive_path).expect("list");
    assert!(names.contains(&"metadata.json".to_owned()), "{names:?}");
    assert!(!names.contains(&"meta-real.json".to_owned()));
    let archived: serde_json::Value =
        serde_json::from_str(&read_entry(&info.archive_path, "metadata.json")).expect("json");
    assert_eq!(archived["versions"][0]["version"], "3.0.0");
    assert_eq!(
        fs::read_to_string(root.join("meta-real.json")).expect("read"),
        METADATA
    );
}

#[rstest]
fn manifest_entry_records_release_status(library: TempDir) {
    let params = params(library.path(), "1.0.0");
    package_release(&params).expect("packaging succeeds");

    let manifest = load_manifest(&params.manifest_path).expect("manifest");
    let entry = manifest.get(&params.version).expect("entry");
    assert_eq!(entry.status.as_deref(), Some("stable"));
    assert_eq!(entry.kicad_version.as_deref(), Some("8.0"));
}

#[rstest]
fn release_status_is_omitted_without_metadata(library: TempDir) {
    let mut params = params(library.path(), "1.0.0");
    params.metadata = None;
    package_release(&params).expect("packaging succeeds");

    let manifest = load_manifest(&params.manifest_path).expect("manifest");
    let entry = manifest.get(&params.version).expect("entry");
    assert_eq!(entry.status, None);
    assert_eq!(entry.kicad_version, None);
}
