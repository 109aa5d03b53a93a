//! Error types for the add-on installer.
//!
//! Module errors convert into [`InstallerError`], which groups failures into
//! the categories reported to users: filesystem, format, network, and
//! integrity problems, plus configuration and staging errors.

use crate::artefact::extraction::ExtractionError;
use crate::artefact::packaging_error::PackagingError;
use crate::artefact::sha256_digest::ChecksumError;
use crate::config::ConfigError;
use crate::fetch::FetchError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while packaging, extracting, or installing.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// The package descriptor could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A directory or file could not be created, moved, or inspected.
    #[error("filesystem error at {path}: {reason}")]
    Filesystem {
        /// Path involved in the failure.
        path: Utf8PathBuf,
        /// Description of the underlying I/O error.
        reason: String,
    },

    /// The local binary could not be hashed.
    #[error(transparent)]
    Checksum(#[from] ChecksumError),

    /// A remote file could not be fetched.
    #[error(transparent)]
    Network(#[from] FetchError),

    /// A package could not be decoded or written out.
    #[error(transparent)]
    Format(#[from] ExtractionError),

    /// A package could not be created.
    #[error(transparent)]
    Packaging(#[from] PackagingError),

    /// The installed binary does not match the published checksum.
    #[error("integrity check failed for {key}: {reason}")]
    Integrity {
        /// Manifest key that was checked.
        key: String,
        /// Which check failed.
        reason: String,
    },

    /// The staging directory holds no binary for this runtime and platform.
    #[error("no staged binary for ABI {abi} on {platform} in {dir}")]
    NoStagedBinary {
        /// Runtime ABI looked for.
        abi: String,
        /// Platform looked for, as `<os>-<arch>`.
        platform: String,
        /// Staging directory searched.
        dir: Utf8PathBuf,
    },

    /// Failed to write output.
    #[error("failed to write output")]
    WriteFailed {
        /// The underlying error that caused the write to fail.
        #[source]
        source: std::io::Error,
    },
}

impl InstallerError {
    /// Build a [`Self::Filesystem`] error from an I/O failure at `path`.
    pub fn filesystem(path: impl Into<Utf8PathBuf>, err: &std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}

/// Result type alias using [`InstallerError`].
pub type Result<T> = std::result::Result<T, InstallerError>;
