//! Verify-or-fetch install orchestrator.
//!
//! The flow checks the local binary against the published manifest first and
//! only downloads the package when that check fails. After extraction the
//! binary is verified once more; a second failure is an integrity error and
//! the install stops there.

use crate::artefact::extraction::{ContainerExtractor, ExtractTargets, PackageExtractor};
use crate::artefact::manifest::{self, ManifestVerdict};
use crate::artefact::sha256_digest::compute_sha256;
use crate::config::InstallerConfig;
use crate::error::{InstallerError, Result};
use crate::fetch::{RemoteSource, read_text};
use crate::output::write_progress;
use camino::Utf8Path;
use log::{debug, info, trace};
use std::fmt;
use std::fs;
use std::io::Write;

/// How an install run finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The local binary already matched the manifest; nothing was fetched.
    AlreadyInstalled,
    /// The package was downloaded, extracted, and verified.
    Installed,
}

/// Result of checking the local binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// No binary exists at the install destination.
    BinaryMissing,
    /// The binary was hashed and checked against the manifest.
    Checked(ManifestVerdict),
}

impl Verification {
    /// Whether the installed binary is the published one.
    #[must_use]
    pub fn is_valid(self) -> bool {
        self == Self::Checked(ManifestVerdict::Match)
    }
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BinaryMissing => f.write_str("Binary not present"),
            Self::Checked(verdict) => verdict.fmt(f),
        }
    }
}

/// Install the binary described by `config`, fetching through `source`.
///
/// # Errors
///
/// See [`run_install_with`].
pub fn run_install(
    config: &InstallerConfig,
    source: &dyn RemoteSource,
    stderr: &mut dyn Write,
) -> Result<InstallOutcome> {
    run_install_with(config, source, &ContainerExtractor, stderr)
}

/// Testable inner function with injected source and extractor.
///
/// # Errors
///
/// Returns [`InstallerError::Checksum`] if the local binary cannot be
/// hashed, [`InstallerError::Network`] if the manifest or package cannot be
/// fetched, [`InstallerError::Filesystem`] if the destination directories
/// cannot be created, [`InstallerError::Format`] if the package cannot be
/// decoded, and [`InstallerError::Integrity`] if the extracted binary does
/// not match the manifest.
pub fn run_install_with(
    config: &InstallerConfig,
    source: &dyn RemoteSource,
    extractor: &dyn PackageExtractor,
    stderr: &mut dyn Write,
) -> Result<InstallOutcome> {
    let product = config.identity.product();
    write_progress(stderr, product, "Beginning installation");

    if verify_installation(config, source, stderr)?.is_valid() {
        info!("{} already installed", config.binary_path);
        return Ok(InstallOutcome::AlreadyInstalled);
    }

    write_progress(stderr, product, "Continuing installation");
    install_package(config, source, extractor)?;
    write_progress(
        stderr,
        product,
        format_args!("Downloaded {}", config.package_file_name()),
    );

    let verification = verify_installation(config, source, stderr)?;
    if !verification.is_valid() {
        return Err(InstallerError::Integrity {
            key: config.manifest_key(),
            reason: verification.to_string(),
        });
    }
    info!("installed {}", config.binary_path);
    Ok(InstallOutcome::Installed)
}

/// Check the local binary against the published manifest.
///
/// The manifest is only fetched when a binary exists. The verdict is
/// written to `stderr` as a progress line.
///
/// # Errors
///
/// Returns [`InstallerError::Checksum`] if the binary cannot be hashed and
/// [`InstallerError::Network`] if the manifest cannot be fetched.
pub fn verify_installation(
    config: &InstallerConfig,
    source: &dyn RemoteSource,
    stderr: &mut dyn Write,
) -> Result<Verification> {
    let product = config.identity.product();
    write_progress(stderr, product, "Verifying installation");

    if !config.binary_path.is_file() {
        debug!("no binary at {}", config.binary_path);
        return Ok(Verification::BinaryMissing);
    }

    let digest = compute_sha256(&config.binary_path)?;
    let manifest_text = read_text(
        source,
        &config.release.host,
        &config.manifest_remote_path(),
    )?;
    let verdict = manifest::check(&config.manifest_key(), &digest, &manifest_text);
    write_progress(stderr, product, verdict);
    Ok(Verification::Checked(verdict))
}

/// Download the package and extract it into the configured layout.
fn install_package(
    config: &InstallerConfig,
    source: &dyn RemoteSource,
    extractor: &dyn PackageExtractor,
) -> Result<()> {
    create_parent(&config.binary_path)?;
    create_parent(&config.license_path)?;

    let remote_path = config.package_remote_path();
    trace!("fetching {}{remote_path}", config.release.host);
    let mut package = source.open(&config.release.host, &remote_path)?;

    let targets = ExtractTargets {
        binary: config.binary_path.clone(),
        license: Some(config.license_path.clone()),
    };
    let summary = extractor.extract(&mut package, &targets)?;
    debug!(
        "extracted {} license bytes and {} binary bytes",
        summary.license_bytes, summary.binary_bytes
    );
    Ok(())
}

fn create_parent(path: &Utf8Path) -> Result<()> {
    let Some(dir) = path.parent().filter(|dir| !dir.as_str().is_empty()) else {
        return Ok(());
    };
    fs::create_dir_all(dir).map_err(|err| InstallerError::filesystem(dir, &err))
}

#[cfg(test)]
#[path = "install_tests.rs"]
mod tests;
