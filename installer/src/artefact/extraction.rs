//! File-level extraction of add-on packages.
//!
//! Decodes a package stream into temporary files created next to each
//! destination and renames them into place only after the whole container
//! decoded cleanly. A failed extraction leaves no partial files behind.

use super::container::{self, DecodeSummary};
use super::error::ArtefactError;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, trace};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use tempfile::NamedTempFile;

/// Where the parts of a package are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractTargets {
    /// Destination of the binary.
    pub binary: Utf8PathBuf,
    /// Destination of the license, or `None` to discard it.
    pub license: Option<Utf8PathBuf>,
}

/// Errors arising from package extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// The package is not a valid container.
    #[error(transparent)]
    Format(#[from] ArtefactError),

    /// A package or destination file could not be accessed.
    #[error("extraction I/O error at {path}: {source}")]
    Io {
        /// File or directory involved.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// Trait for extracting package streams, enabling test mocking.
#[cfg_attr(test, mockall::automock)]
pub trait PackageExtractor {
    /// Decode `package` into `targets`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::Format`] for malformed containers and
    /// [`ExtractionError::Io`] when a destination cannot be written.
    fn extract(
        &self,
        package: &mut dyn Read,
        targets: &ExtractTargets,
    ) -> Result<DecodeSummary, ExtractionError>;
}

/// Extractor for gzip containers that writes through temporary files.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContainerExtractor;

impl PackageExtractor for ContainerExtractor {
    fn extract(
        &self,
        package: &mut dyn Read,
        targets: &ExtractTargets,
    ) -> Result<DecodeSummary, ExtractionError> {
        let mut binary_tmp = staging_file(&targets.binary)?;
        let mut license_tmp = targets.license.as_deref().map(staging_file).transpose()?;

        let summary = {
            let binary_sink = BufWriter::new(binary_tmp.as_file_mut());
            let license_sink: Box<dyn Write + '_> = match license_tmp.as_mut() {
                Some(tmp) => Box::new(BufWriter::new(tmp.as_file_mut())),
                None => Box::new(io::sink()),
            };
            container::decode(package, license_sink, binary_sink)?
        };

        mark_executable(binary_tmp.as_file()).map_err(|source| ExtractionError::Io {
            path: targets.binary.clone(),
            source,
        })?;
        persist(binary_tmp, &targets.binary)?;
        if let (Some(tmp), Some(path)) = (license_tmp, targets.license.as_deref()) {
            persist(tmp, path)?;
        }
        debug!(
            "extracted {} binary bytes to {}",
            summary.binary_bytes, targets.binary
        );
        Ok(summary)
    }
}

/// Extract the package file at `package_path` into `targets`.
///
/// # Errors
///
/// Returns [`ExtractionError::Io`] if the package cannot be opened and
/// otherwise the errors of [`ContainerExtractor`].
pub fn extract_package(
    package_path: &Utf8Path,
    targets: &ExtractTargets,
) -> Result<DecodeSummary, ExtractionError> {
    trace!("extracting {package_path}");
    let mut file = File::open(package_path).map_err(|source| ExtractionError::Io {
        path: package_path.to_owned(),
        source,
    })?;
    ContainerExtractor.extract(&mut file, targets)
}

/// Create a temporary file in the directory that will hold `destination`.
fn staging_file(destination: &Utf8Path) -> Result<NamedTempFile, ExtractionError> {
    let dir = match destination.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let wrap = |source| ExtractionError::Io {
        path: dir.to_owned(),
        source,
    };
    fs::create_dir_all(dir).map_err(wrap)?;
    NamedTempFile::new_in(dir).map_err(wrap)
}

fn persist(staged: NamedTempFile, destination: &Utf8Path) -> Result<(), ExtractionError> {
    staged
        .persist(destination)
        .map(drop)
        .map_err(|err| ExtractionError::Io {
            path: destination.to_owned(),
            source: err.error,
        })
}

#[cfg(unix)]
fn mark_executable(file: &File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn mark_executable(_file: &File) -> io::Result<()> {
    Ok(())
}
