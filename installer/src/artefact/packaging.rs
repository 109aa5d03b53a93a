//! Build-time packaging of an add-on binary.
//!
//! Validates the built binary, records its SHA-256 digest in the checksum
//! manifest, and writes `<build identity>.gz`: a container holding the
//! license text followed by the binary.

use super::container;
use super::error::ArtefactError;
use super::manifest::{self, MANIFEST_FILE_NAME};
use super::naming::BuildIdentity;
use super::packaging_error::PackagingError;
use super::sha256_digest::{Sha256Digest, compute_sha256};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use std::fs::{self, File};
use std::io::{self, Write};
use tempfile::NamedTempFile;

/// Inputs for [`create_package`].
#[derive(Debug, Clone, Copy)]
pub struct PackageRequest<'a> {
    /// Identity of the build being packaged.
    pub identity: &'a BuildIdentity,
    /// File name the binary must have (for example `oracledb.node`).
    pub binary_file_name: &'a str,
    /// Path to the built binary.
    pub binary_path: &'a Utf8Path,
    /// Path to the license text shipped with the binary.
    pub license_path: &'a Utf8Path,
    /// Directory receiving the package and the manifest.
    pub output_dir: &'a Utf8Path,
}

/// Output produced by [`create_package`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOutput {
    /// Path of the written package.
    pub package_path: Utf8PathBuf,
    /// Path of the updated manifest.
    pub manifest_path: Utf8PathBuf,
    /// Manifest key under which the digest was recorded.
    pub manifest_key: String,
    /// Digest of the packaged binary.
    pub digest: Sha256Digest,
}

/// Package a built binary for distribution.
///
/// Steps: validate the binary path, compute its digest, upsert the digest
/// into `<output_dir>/SHASUMS256.txt`, then encode license and binary into
/// `<output_dir>/<package file name>`. The package is written to a
/// temporary file in `output_dir` and renamed into place on success.
///
/// # Errors
///
/// Returns [`PackagingError::MissingBinary`] or [`PackagingError::NotAFile`]
/// for unusable binary paths, [`PackagingError::Format`] when the binary is
/// misnamed or the license is too large, and the checksum, manifest, or I/O
/// variants when the corresponding step fails.
pub fn create_package(request: &PackageRequest<'_>) -> Result<PackageOutput, PackagingError> {
    validate_binary_path(request.binary_path, request.binary_file_name)?;

    let digest = compute_sha256(request.binary_path)?;
    let package_path = request
        .output_dir
        .join(request.identity.package_file_name());
    let staged = stage_package(request, &package_path)?;

    // The manifest only changes once the package has been fully encoded.
    let manifest_key = request.identity.manifest_key(request.binary_file_name);
    let manifest_path = request.output_dir.join(MANIFEST_FILE_NAME);
    manifest::update_manifest(&manifest_path, &manifest_key, &digest)?;
    debug!("binary digest {digest} recorded as {manifest_key}");

    staged
        .persist(&package_path)
        .map_err(|err| PackagingError::Io {
            path: package_path.clone(),
            source: err.error,
        })?;
    info!("created package {package_path}");

    Ok(PackageOutput {
        package_path,
        manifest_path,
        manifest_key,
        digest,
    })
}

/// Check that `path` is an existing regular file named `expected_name`.
fn validate_binary_path(path: &Utf8Path, expected_name: &str) -> Result<(), PackagingError> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(PackagingError::MissingBinary {
                path: path.to_owned(),
            });
        }
        Err(source) => {
            return Err(PackagingError::Io {
                path: path.to_owned(),
                source,
            });
        }
    };
    if !metadata.is_file() {
        return Err(PackagingError::NotAFile {
            path: path.to_owned(),
        });
    }
    if path.file_name() != Some(expected_name) {
        return Err(ArtefactError::UnexpectedBinaryName {
            path: path.to_string(),
            expected: expected_name.to_owned(),
        }
        .into());
    }
    Ok(())
}

/// Encode the package into a temporary file in the output directory.
fn stage_package(
    request: &PackageRequest<'_>,
    package_path: &Utf8Path,
) -> Result<NamedTempFile, PackagingError> {
    let io_err = |path: &Utf8Path| {
        let path = path.to_owned();
        move |source| PackagingError::Io { path, source }
    };

    let license = File::open(request.license_path).map_err(io_err(request.license_path))?;
    let binary = File::open(request.binary_path).map_err(io_err(request.binary_path))?;
    let mut staged = NamedTempFile::new_in(request.output_dir).map_err(io_err(request.output_dir))?;

    let out = container::encode(license, binary, staged.as_file_mut())?;
    out.flush().map_err(io_err(package_path))?;
    Ok(staged)
}

#[cfg(test)]
#[path = "packaging_tests.rs"]
mod tests;
