//! Error types for add-on packaging operations.
//!
//! Covers validation of the built binary, digest and manifest failures, and
//! I/O errors raised while writing the package.

use super::error::ArtefactError;
use super::manifest::ManifestError;
use super::sha256_digest::ChecksumError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors arising from add-on packaging operations.
#[derive(Debug, Error)]
pub enum PackagingError {
    /// The binary to package does not exist.
    #[error("binary not found: {path}")]
    MissingBinary {
        /// The path that was checked.
        path: Utf8PathBuf,
    },

    /// The binary path exists but is not a regular file.
    #[error("binary path is not a regular file: {path}")]
    NotAFile {
        /// The rejected path.
        path: Utf8PathBuf,
    },

    /// The container could not be formed from the inputs.
    #[error(transparent)]
    Format(#[from] ArtefactError),

    /// The binary digest could not be computed.
    #[error(transparent)]
    Checksum(#[from] ChecksumError),

    /// The checksum manifest could not be updated.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Reading an input or writing the package failed.
    #[error("I/O error packaging {path}: {source}")]
    Io {
        /// File being read or written.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}
