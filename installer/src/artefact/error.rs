//! Error types for container format, naming, and digest validation.
//!
//! Each variant provides a descriptive message identifying the invalid input
//! and the constraint that was violated.

use std::io;
use thiserror::Error;

/// Errors arising from malformed artefacts or artefact-related values.
#[derive(Debug, Error)]
pub enum ArtefactError {
    /// The license is too long for the fixed-width length header.
    #[error("license size {size} bytes cannot be represented in a {width}-digit header")]
    LicenseTooLarge {
        /// The rejected license length in bytes.
        size: u64,
        /// Width of the decimal header.
        width: usize,
    },

    /// The container header contains something other than ASCII digits.
    #[error("invalid container header {header:?}: expected ASCII decimal digits")]
    InvalidHeader {
        /// The header bytes, lossily decoded for display.
        header: String,
    },

    /// The decompressed stream ended before the header was complete.
    #[error("container truncated inside the length header after {seen} bytes")]
    TruncatedHeader {
        /// Number of header bytes seen before the stream ended.
        seen: usize,
    },

    /// The decompressed stream ended before the declared license length.
    #[error("container truncated: header declares {expected} license bytes, found {written}")]
    TruncatedLicense {
        /// License length declared by the header.
        expected: u64,
        /// License bytes actually present.
        written: u64,
    },

    /// The binary handed to the packager does not have the expected name.
    #[error("binary path {path} does not end with {expected}")]
    UnexpectedBinaryName {
        /// The rejected path.
        path: String,
        /// The file name the package descriptor requires.
        expected: String,
    },

    /// A SHA-256 digest is not a valid 64-character hex string.
    #[error("invalid SHA-256 digest: {reason}")]
    InvalidSha256Digest {
        /// Description of the validation failure.
        reason: String,
    },

    /// Reading, writing, or decompressing a container failed.
    #[error("container I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias using [`ArtefactError`].
pub type Result<T> = std::result::Result<T, ArtefactError>;
