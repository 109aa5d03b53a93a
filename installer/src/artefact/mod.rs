//! Add-on artefacts: the container format, digests, manifest, and naming.
//!
//! # Sub-modules
//!
//! - [`container`] — Streaming encoder and decoder for the package format.
//! - [`error`] — Format errors for containers, names, and digests.
//! - [`extraction`] — Decoding packages into files on disk.
//! - [`manifest`] — The `SHASUMS256.txt` checksum manifest.
//! - [`naming`] — Build identity and derived names (`BuildIdentity`).
//! - [`packaging`] — Build-time package creation and manifest update.
//! - [`packaging_error`] — Error types for packaging operations.
//! - [`sha256_digest`] — SHA-256 digest newtype and file hashing.

pub mod container;
pub mod error;
pub mod extraction;
pub mod manifest;
pub mod naming;
pub mod packaging;
pub mod packaging_error;
pub mod sha256_digest;
