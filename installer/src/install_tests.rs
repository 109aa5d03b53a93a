//! Tests for the verify-or-fetch install flow.

use super::*;
use crate::artefact::container::DecodeSummary;
use crate::artefact::error::ArtefactError;
use crate::artefact::extraction::{ExtractionError, MockPackageExtractor};
use crate::fetch::{FetchError, MockRemoteSource};
use crate::test_utils::{StubSource, manifest_text, package_bytes, sample_config, utf8_temp_dir};
use camino::Utf8PathBuf;
use rstest::{fixture, rstest};
use tempfile::TempDir;

const LICENSE: &[u8] = b"Apache License 2.0\n";
const BINARY: &[u8] = b"\x7fELF published build";

struct Site {
    _dir: TempDir,
    config: InstallerConfig,
}

#[fixture]
fn site() -> Site {
    let (dir, root) = utf8_temp_dir();
    Site {
        _dir: dir,
        config: sample_config(&root),
    }
}

impl Site {
    fn manifest(&self, content: &[u8]) -> String {
        manifest_text(&[
            ("oracledb-v6.2.0-abi108-linux-x86_64-oracledb.node", b"other"),
            (self.config.manifest_key().as_str(), content),
        ])
    }

    fn source(&self, manifest_content: &[u8]) -> StubSource {
        let mut source = StubSource::new();
        source.serve(
            self.config.manifest_remote_path(),
            self.manifest(manifest_content),
        );
        source.serve(
            self.config.package_remote_path(),
            package_bytes(LICENSE, BINARY),
        );
        source
    }

    fn place_binary(&self, content: &[u8]) {
        let path = &self.config.binary_path;
        fs::create_dir_all(path.parent().expect("binary dir")).expect("create binary dir");
        fs::write(path, content).expect("write binary");
    }
}

fn stderr_text(stderr: Vec<u8>) -> String {
    String::from_utf8(stderr).expect("utf8 stderr")
}

#[rstest]
fn fresh_install_downloads_extracts_and_verifies(site: Site) {
    let source = site.source(BINARY);
    let mut stderr = Vec::new();

    let outcome = run_install(&site.config, &source, &mut stderr).expect("install succeeds");

    assert_eq!(outcome, InstallOutcome::Installed);
    assert_eq!(fs::read(&site.config.binary_path).expect("binary"), BINARY);
    assert_eq!(fs::read(&site.config.license_path).expect("license"), LICENSE);
    assert_eq!(
        source.requests(),
        vec![
            site.config.package_remote_path(),
            site.config.manifest_remote_path()
        ]
    );
    let text = stderr_text(stderr);
    assert_eq!(
        text.lines().collect::<Vec<_>>(),
        vec![
            "oracledb Beginning installation",
            "oracledb Verifying installation",
            "oracledb Continuing installation",
            "oracledb Downloaded oracledb-v6.2.0-abi115-linux-x86_64.gz",
            "oracledb Verifying installation",
            "oracledb Binary SHA matches",
        ]
    );
}

#[rstest]
fn matching_binary_is_left_alone(site: Site) {
    site.place_binary(BINARY);
    let source = site.source(BINARY);
    let mut extractor = MockPackageExtractor::new();
    extractor.expect_extract().times(0);
    let mut stderr = Vec::new();

    let outcome =
        run_install_with(&site.config, &source, &extractor, &mut stderr).expect("verified");

    assert_eq!(outcome, InstallOutcome::AlreadyInstalled);
    assert_eq!(source.request_count(&site.config.package_remote_path()), 0);
    assert!(stderr_text(stderr).contains("Binary SHA matches"));
}

#[rstest]
fn stale_binary_is_replaced(site: Site) {
    site.place_binary(b"an older build");
    let source = site.source(BINARY);
    let mut stderr = Vec::new();

    let outcome = run_install(&site.config, &source, &mut stderr).expect("install succeeds");

    assert_eq!(outcome, InstallOutcome::Installed);
    assert_eq!(fs::read(&site.config.binary_path).expect("binary"), BINARY);
    let text = stderr_text(stderr);
    assert!(text.contains("Binary SHA does not match"));
    assert!(text.ends_with("Binary SHA matches\n"));
}

#[rstest]
fn package_that_never_matches_is_an_integrity_failure(site: Site) {
    let source = site.source(b"a different published build");
    let mut stderr = Vec::new();

    let err = run_install(&site.config, &source, &mut stderr).expect_err("integrity");

    assert!(matches!(
        err,
        InstallerError::Integrity { ref key, ref reason }
            if *key == site.config.manifest_key() && reason == "Binary SHA does not match"
    ));
    assert_eq!(source.request_count(&site.config.package_remote_path()), 1);
}

#[rstest]
fn build_missing_from_manifest_fails_after_download(site: Site) {
    let mut source = site.source(BINARY);
    source.serve(
        site.config.manifest_remote_path(),
        manifest_text(&[("oracledb-v6.2.0-abi108-linux-x86_64-oracledb.node", BINARY)]),
    );
    let mut stderr = Vec::new();

    let err = run_install(&site.config, &source, &mut stderr).expect_err("not listed");

    assert!(matches!(
        err,
        InstallerError::Integrity { ref reason, .. } if reason == "Build not found in manifest"
    ));
}

#[rstest]
fn extractor_that_writes_nothing_fails_verification(site: Site) {
    let mut source = MockRemoteSource::new();
    let package_path = site.config.package_remote_path();
    source
        .expect_open()
        .withf(move |host, path| host == "github.com" && path == package_path)
        .times(1)
        .returning(|_, _| Ok(Box::new(std::io::empty())));
    let mut extractor = MockPackageExtractor::new();
    let binary = site.config.binary_path.clone();
    extractor
        .expect_extract()
        .withf(move |_, targets| targets.binary == binary && targets.license.is_some())
        .times(1)
        .returning(|_, _| {
            Ok(DecodeSummary {
                license_bytes: 0,
                binary_bytes: 0,
            })
        });
    let mut stderr = Vec::new();

    let err = run_install_with(&site.config, &source, &extractor, &mut stderr)
        .expect_err("nothing installed");

    assert!(matches!(
        err,
        InstallerError::Integrity { ref reason, .. } if reason == "Binary not present"
    ));
}

#[rstest]
fn package_download_failure_is_a_network_error(site: Site) {
    let mut source = site.source(BINARY);
    source.fail(site.config.package_remote_path(), 404);
    let mut stderr = Vec::new();

    let err = run_install(&site.config, &source, &mut stderr).expect_err("missing package");

    assert!(matches!(
        err,
        InstallerError::Network(FetchError::HttpStatus { status: 404, .. })
    ));
    assert!(!site.config.binary_path.exists());
}

#[rstest]
fn manifest_failure_stops_before_download(site: Site) {
    site.place_binary(BINARY);
    let mut source = site.source(BINARY);
    source.fail(site.config.manifest_remote_path(), 503);
    let mut stderr = Vec::new();

    let err = run_install(&site.config, &source, &mut stderr).expect_err("manifest down");

    assert!(matches!(
        err,
        InstallerError::Network(FetchError::HttpStatus { status: 503, .. })
    ));
    assert_eq!(source.request_count(&site.config.package_remote_path()), 0);
}

#[rstest]
fn corrupt_package_is_a_format_error(site: Site) {
    let mut source = site.source(BINARY);
    source.serve(site.config.package_remote_path(), b"not gzip at all".to_vec());
    let mut stderr = Vec::new();

    let err = run_install(&site.config, &source, &mut stderr).expect_err("corrupt");

    assert!(matches!(err, InstallerError::Format(_)));
    assert!(!site.config.binary_path.exists());
    assert!(!site.config.license_path.exists());
}

#[rstest]
fn extractor_errors_propagate_as_format_errors(site: Site) {
    let source = site.source(BINARY);
    let mut extractor = MockPackageExtractor::new();
    extractor.expect_extract().times(1).returning(|_, _| {
        Err(ExtractionError::Format(ArtefactError::TruncatedLicense {
            expected: 100,
            written: 5,
        }))
    });
    let mut stderr = Vec::new();

    let err = run_install_with(&site.config, &source, &extractor, &mut stderr)
        .expect_err("truncated");

    assert!(matches!(
        err,
        InstallerError::Format(ExtractionError::Format(ArtefactError::TruncatedLicense { .. }))
    ));
}

#[rstest]
fn unwritable_binary_directory_is_a_filesystem_error(site: Site) {
    let blocker: Utf8PathBuf = site.config.root.join("build");
    fs::write(&blocker, b"a file where a directory belongs").expect("write blocker");
    let source = site.source(BINARY);
    let mut stderr = Vec::new();

    let err = run_install(&site.config, &source, &mut stderr).expect_err("blocked");

    assert!(matches!(err, InstallerError::Filesystem { .. }));
}

#[test]
fn only_a_match_is_valid() {
    assert!(Verification::Checked(ManifestVerdict::Match).is_valid());
    assert!(!Verification::Checked(ManifestVerdict::DigestMismatch).is_valid());
    assert!(!Verification::Checked(ManifestVerdict::BuildMissing).is_valid());
    assert!(!Verification::BinaryMissing.is_valid());
}
