//! Behaviour-driven tests for packaging and `SHASUMS256.txt` maintenance.

use addon_installer::artefact::container::decode;
use addon_installer::artefact::error::ArtefactError;
use addon_installer::artefact::manifest::{MANIFEST_FILE_NAME, verify};
use addon_installer::artefact::packaging::{PackageOutput, PackageRequest, create_package};
use addon_installer::artefact::packaging_error::PackagingError;
use addon_installer::config::InstallerConfig;
use addon_installer::test_utils::{digest_of, manifest_text, sample_config, utf8_temp_dir};
use camino::Utf8PathBuf;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::fs;
use tempfile::TempDir;

const LICENSE: &[u8] = b"Apache License 2.0\n";

// ---------------------------------------------------------------------------
// World types
// ---------------------------------------------------------------------------

struct PackagingWorld {
    _dir: TempDir,
    config: InstallerConfig,
    binary_path: Utf8PathBuf,
    binary: Vec<u8>,
    output_dir: Utf8PathBuf,
    result: Option<Result<PackageOutput, PackagingError>>,
}

#[fixture]
fn world() -> PackagingWorld {
    let (dir, root) = utf8_temp_dir();
    let config = sample_config(&root);
    PackagingWorld {
        _dir: dir,
        binary_path: config.binary_path.clone(),
        config,
        binary: Vec::new(),
        output_dir: root.join("dist"),
        result: None,
    }
}

impl PackagingWorld {
    fn write_build(&mut self, content: &[u8]) {
        fs::create_dir_all(self.binary_path.parent().expect("binary dir"))
            .expect("create binary dir");
        fs::write(&self.binary_path, content).expect("write binary");
        fs::write(&self.config.license_path, LICENSE).expect("write license");
        self.binary = content.to_vec();
    }

    fn package(&mut self) {
        fs::create_dir_all(&self.output_dir).expect("create output dir");
        let request = PackageRequest {
            identity: &self.config.identity,
            binary_file_name: &self.config.binary_file_name,
            binary_path: &self.binary_path,
            license_path: &self.config.license_path,
            output_dir: &self.output_dir,
        };
        self.result = Some(create_package(&request));
    }

    fn output(&self) -> &PackageOutput {
        match self.result.as_ref().expect("packaging ran") {
            Ok(output) => output,
            Err(err) => panic!("packaging failed: {err}"),
        }
    }

    fn manifest(&self) -> String {
        fs::read_to_string(self.output_dir.join(MANIFEST_FILE_NAME)).expect("read manifest")
    }
}

// ---------------------------------------------------------------------------
// Step definitions
// ---------------------------------------------------------------------------

#[given("a built binary and its license")]
fn given_build(world: &mut PackagingWorld) {
    world.write_build(b"\x7fELF build one");
}

#[given("a built binary named \"{name}\" and its license")]
fn given_misnamed_build(world: &mut PackagingWorld, name: String) {
    world.binary_path = world.binary_path.with_file_name(name);
    world.write_build(b"\x7fELF misnamed");
}

#[given("a manifest already listing another build")]
fn given_existing_manifest(world: &mut PackagingWorld) {
    fs::create_dir_all(&world.output_dir).expect("create output dir");
    fs::write(
        world.output_dir.join(MANIFEST_FILE_NAME),
        manifest_text(&[("oracledb-v6.2.0-abi108-linux-x86_64-oracledb.node", b"other")]),
    )
    .expect("write manifest");
}

#[when("the binary is packaged")]
fn when_packaged(world: &mut PackagingWorld) {
    world.package();
}

#[when("the binary is rebuilt and packaged again")]
fn when_repackaged(world: &mut PackagingWorld) {
    world.write_build(b"\x7fELF build two");
    world.package();
}

#[then("the manifest has {count:usize} lines")]
fn then_manifest_lines(world: &mut PackagingWorld, count: usize) {
    let manifest = world.manifest();
    assert_eq!(manifest.lines().filter(|line| !line.is_empty()).count(), count);
}

#[then("the manifest verifies the packaged binary")]
fn then_manifest_verifies(world: &mut PackagingWorld) {
    let output = world.output();
    let digest = digest_of(&world.binary);
    assert_eq!(output.digest, digest);
    assert!(verify(&world.config.manifest_key(), &digest, &world.manifest()));
}

#[then("the package decodes to the binary and license")]
fn then_package_decodes(world: &mut PackagingWorld) {
    let package = fs::read(&world.output().package_path).expect("read package");
    let mut license = Vec::new();
    let mut binary = Vec::new();
    decode(package.as_slice(), &mut license, &mut binary).expect("decode package");
    assert_eq!(license, LICENSE);
    assert_eq!(binary, world.binary);
}

#[then("packaging fails with an unexpected binary name")]
fn then_unexpected_name(world: &mut PackagingWorld) {
    let result = world.result.as_ref().expect("packaging ran");
    assert!(
        matches!(
            result,
            Err(PackagingError::Format(ArtefactError::UnexpectedBinaryName { .. }))
        ),
        "unexpected result {result:?}"
    );
}

#[then("no manifest is written")]
fn then_no_manifest(world: &mut PackagingWorld) {
    assert!(!world.output_dir.join(MANIFEST_FILE_NAME).exists());
}

// ---------------------------------------------------------------------------
// Scenario bindings
// ---------------------------------------------------------------------------

#[scenario(
    path = "tests/features/manifest.feature",
    name = "Packaging records the binary digest"
)]
fn scenario_records_digest(world: PackagingWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/manifest.feature",
    name = "Repackaging replaces the manifest line"
)]
fn scenario_repackaging_replaces_line(world: PackagingWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/manifest.feature",
    name = "Other builds in the manifest are kept"
)]
fn scenario_other_builds_kept(world: PackagingWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/manifest.feature",
    name = "A binary with the wrong name is rejected"
)]
fn scenario_wrong_name_rejected(world: PackagingWorld) {
    let _ = world;
}
