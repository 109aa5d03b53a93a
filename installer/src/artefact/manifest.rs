//! The `SHASUMS256.txt` checksum manifest.
//!
//! The manifest is plain UTF-8 text, one line per build variant:
//!
//! ```text
//! <64 lowercase hex chars>  <manifest key>
//! ```
//!
//! Packaging upserts one line per build; installation checks the digest of
//! the local binary against the line for its key.

use super::sha256_digest::Sha256Digest;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, trace};
use std::fmt;
use std::fs;
use std::io::{self, Write};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Canonical file name of the checksum manifest.
pub const MANIFEST_FILE_NAME: &str = "SHASUMS256.txt";

/// Separator between the digest and the key on a manifest line.
const FIELD_SEPARATOR: &str = "  ";

/// Errors raised while reading or rewriting a manifest file.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The existing manifest could not be read.
    #[error("failed to read manifest {path}: {source}")]
    Read {
        /// Manifest path.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The updated manifest could not be written into place.
    #[error("failed to write manifest {path}: {source}")]
    Write {
        /// Manifest path.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// Outcome of checking a digest against manifest text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestVerdict {
    /// The manifest holds exactly this digest for the key.
    Match,
    /// No line in the manifest names the key.
    BuildMissing,
    /// The key is listed with a different digest.
    DigestMismatch,
}

impl fmt::Display for ManifestVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Match => "Binary SHA matches",
            Self::BuildMissing => "Build not found in manifest",
            Self::DigestMismatch => "Binary SHA does not match",
        })
    }
}

/// Format one manifest line (without terminator).
#[must_use]
pub fn manifest_line(key: &str, digest: &Sha256Digest) -> String {
    format!("{digest}{FIELD_SEPARATOR}{key}")
}

/// Key field of a manifest line, if it has one.
fn line_key(line: &str) -> Option<&str> {
    line.split_whitespace().nth(1)
}

/// Return whether `manifest_text` records `digest` for `key`.
///
/// This is a substring test for `<digest>  <key>`; nothing else about the
/// manifest is validated.
///
/// # Examples
///
/// ```
/// use addon_installer::artefact::manifest::verify;
/// use addon_installer::artefact::sha256_digest::Sha256Digest;
///
/// let digest = Sha256Digest::try_from("a".repeat(64)).unwrap();
/// let text = format!("{digest}  addon-v1.0.0-abi115-linux-x86_64-addon.node\n");
/// assert!(verify("addon-v1.0.0-abi115-linux-x86_64-addon.node", &digest, &text));
/// assert!(!verify("addon-v1.0.0-abi108-linux-x86_64-addon.node", &digest, &text));
/// ```
#[must_use]
pub fn verify(key: &str, digest: &Sha256Digest, manifest_text: &str) -> bool {
    manifest_text.contains(&manifest_line(key, digest))
}

/// Classify how `manifest_text` relates to `digest` for `key`.
///
/// `check(..) == ManifestVerdict::Match` exactly when [`verify`] is true.
#[must_use]
pub fn check(key: &str, digest: &Sha256Digest, manifest_text: &str) -> ManifestVerdict {
    if verify(key, digest, manifest_text) {
        ManifestVerdict::Match
    } else if manifest_text.lines().any(|line| line_key(line) == Some(key)) {
        ManifestVerdict::DigestMismatch
    } else {
        ManifestVerdict::BuildMissing
    }
}

/// Insert or replace the line for `key` in `manifest_text`.
///
/// The text is split on `'\n'`. A line whose key field equals `key` is
/// replaced in place; otherwise the new line is inserted before the final
/// line, which keeps a trailing newline a trailing newline.
///
/// # Examples
///
/// ```
/// use addon_installer::artefact::manifest::upsert_line;
/// use addon_installer::artefact::sha256_digest::Sha256Digest;
///
/// let digest = Sha256Digest::try_from("b".repeat(64)).unwrap();
/// let text = upsert_line("", "k", &digest);
/// assert_eq!(text, format!("{digest}  k\n"));
/// ```
#[must_use]
pub fn upsert_line(manifest_text: &str, key: &str, digest: &Sha256Digest) -> String {
    let replacement = manifest_line(key, digest);
    let mut lines: Vec<&str> = manifest_text.split('\n').collect();
    if let Some(existing) = lines.iter_mut().find(|line| line_key(line) == Some(key)) {
        trace!("replacing manifest entry for {key}");
        *existing = &replacement;
    } else {
        trace!("adding manifest entry for {key}");
        let before_last = lines.len().saturating_sub(1);
        lines.insert(before_last, &replacement);
    }
    lines.join("\n")
}

/// Record `digest` for `key` in the manifest file at `manifest_path`.
///
/// A missing manifest is treated as empty. The rewritten manifest is staged
/// in a temporary file in the same directory and renamed into place, so a
/// failure leaves the previous manifest untouched.
///
/// # Errors
///
/// Returns [`ManifestError::Read`] if an existing manifest cannot be read and
/// [`ManifestError::Write`] if the new content cannot be written.
pub fn update_manifest(
    manifest_path: &Utf8Path,
    key: &str,
    digest: &Sha256Digest,
) -> Result<(), ManifestError> {
    let current = match fs::read_to_string(manifest_path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
        Err(source) => {
            return Err(ManifestError::Read {
                path: manifest_path.to_owned(),
                source,
            });
        }
    };
    let updated = upsert_line(&current, key, digest);
    write_atomically(manifest_path, updated.as_bytes()).map_err(|source| ManifestError::Write {
        path: manifest_path.to_owned(),
        source,
    })?;
    debug!("recorded {digest} for {key} in {manifest_path}");
    Ok(())
}

fn write_atomically(path: &Utf8Path, contents: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(contents)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
