//! Verify-or-fetch installer for prebuilt native add-on binaries.
//!
//! An add-on release publishes one gzip package per platform and runtime ABI
//! plus a `SHASUMS256.txt` manifest. At build time the packaging tool wraps
//! the compiled binary and its license into a package and records the
//! binary's digest. At install time the installer checks any local binary
//! against the manifest and, if it is missing or stale, downloads the
//! package over HTTPS (optionally through an HTTP `CONNECT` proxy),
//! extracts it, and verifies it again.
//!
//! # Modules
//!
//! - [`artefact`] - Package container, manifest, naming, packaging, and extraction
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Package descriptor loading and resolution
//! - [`error`] - Top-level error type
//! - [`fetch`] - HTTPS downloads with proxy tunnelling and redirect handling
//! - [`install`] - Verify-or-fetch orchestration
//! - [`logging`] - Diagnostic logging bootstrap
//! - [`output`] - User-facing progress lines
//! - [`remediation`] - Failure guidance for unsupported platforms
//! - [`staging`] - Install from pre-staged builds

pub mod artefact;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod install;
pub mod logging;
pub mod output;
pub mod remediation;
pub mod staging;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
