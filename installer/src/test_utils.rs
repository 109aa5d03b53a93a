//! Shared test utilities for the installer crate.
//!
//! Available to unit tests and, through the `test-support` feature, to the
//! behaviour tests under `tests/`.

#![allow(clippy::expect_used, reason = "test fixtures fail loudly on setup errors")]

use crate::artefact::container;
use crate::artefact::naming::HostPlatform;
use crate::artefact::sha256_digest::{Sha256Digest, digest_reader};
use crate::config::{InstallerConfig, Layout, PackageDescriptor, ReleaseLocation};
use crate::fetch::{FetchError, RemoteSource};
use camino::{Utf8Path, Utf8PathBuf};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use tempfile::TempDir;

/// Release host used by [`sample_config`].
pub const SAMPLE_HOST: &str = "github.com";

/// Build a descriptor for `oracledb` 6.2.0 with ABI `abi`.
pub fn sample_descriptor(abi: &str) -> PackageDescriptor {
    PackageDescriptor {
        product: "oracledb".to_owned(),
        version: "6.2.0".to_owned(),
        abi: abi.to_owned(),
        binary: "oracledb.node".to_owned(),
        license: "LICENSE.txt".to_owned(),
        help_url: Some("https://example.test/INSTALL.html".to_owned()),
        supported_abis: vec!["108".to_owned(), "115".to_owned()],
        release: ReleaseLocation {
            host: SAMPLE_HOST.to_owned(),
            repository: "oracle/node-oracledb".to_owned(),
        },
        layout: Layout::default(),
    }
}

/// Resolve [`sample_descriptor`] against `root` on `linux-x86_64`.
///
/// # Panics
///
/// Panics if the sample descriptor fails validation.
pub fn sample_config(root: &Utf8Path) -> InstallerConfig {
    InstallerConfig::from_descriptor(
        &sample_descriptor("115"),
        root,
        HostPlatform::new("linux", "x86_64"),
    )
    .expect("sample descriptor is valid")
}

/// Create a temporary directory and return it with its UTF-8 path.
///
/// # Panics
///
/// Panics if the directory cannot be created or its path is not UTF-8.
pub fn utf8_temp_dir() -> (TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir");
    (dir, path)
}

/// Encode `license` and `binary` as a container package.
///
/// # Panics
///
/// Panics if encoding into memory fails.
pub fn package_bytes(license: &[u8], binary: &[u8]) -> Vec<u8> {
    container::encode(license, binary, Vec::new()).expect("encode package")
}

/// SHA-256 digest of `bytes`.
///
/// # Panics
///
/// Panics only if reading from memory fails.
pub fn digest_of(bytes: &[u8]) -> Sha256Digest {
    digest_reader(bytes).expect("hash in-memory bytes")
}

/// Build manifest text from `(key, content)` pairs.
pub fn manifest_text(entries: &[(&str, &[u8])]) -> String {
    entries
        .iter()
        .map(|(key, content)| format!("{}  {key}\n", digest_of(content)))
        .collect()
}

/// What a [`StubSource`] serves for one path.
#[derive(Debug, Clone)]
pub enum Served {
    /// Respond with these bytes.
    Bytes(Vec<u8>),
    /// Fail with this HTTP status.
    Status(u16),
}

/// In-memory [`RemoteSource`] keyed by path.
///
/// Unknown paths answer with status 404. Every request is recorded.
#[derive(Debug, Default)]
pub struct StubSource {
    files: HashMap<String, Served>,
    requests: RefCell<Vec<String>>,
}

impl StubSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `bytes` at `path`.
    pub fn serve(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), Served::Bytes(bytes.into()));
    }

    /// Fail requests for `path` with `status`.
    pub fn fail(&mut self, path: impl Into<String>, status: u16) {
        self.files.insert(path.into(), Served::Status(status));
    }

    /// Paths requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    /// Number of requests for `path`.
    pub fn request_count(&self, path: &str) -> usize {
        self.requests.borrow().iter().filter(|p| *p == path).count()
    }
}

impl RemoteSource for StubSource {
    fn open(&self, host: &str, path: &str) -> Result<Box<dyn Read>, FetchError> {
        self.requests.borrow_mut().push(path.to_owned());
        match self.files.get(path) {
            Some(Served::Bytes(bytes)) => Ok(Box::new(Cursor::new(bytes.clone()))),
            Some(Served::Status(status)) => Err(FetchError::HttpStatus {
                url: format!("https://{host}{path}"),
                status: *status,
            }),
            None => Err(FetchError::HttpStatus {
                url: format!("https://{host}{path}"),
                status: 404,
            }),
        }
    }
}
