//! Build identity and the names derived from it.
//!
//! One distributable variant of the add-on is identified by
//! `<product>-v<version>-abi<abi>-<platform>-<arch>`. The release tag,
//! manifest key, package file name, staged binary name, and remote download
//! paths are all derived from that identity.

use semver::Version;
use std::fmt;

/// File extension of a packaged add-on.
const PACKAGE_EXTENSION: &str = ".gz";

/// Operating system and CPU architecture of a build.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostPlatform {
    /// Operating system name (`linux`, `macos`, `windows`, ...).
    pub os: String,
    /// CPU architecture name (`x86_64`, `aarch64`, ...).
    pub arch: String,
}

impl HostPlatform {
    /// Describe the platform this process runs on.
    #[must_use]
    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Describe an explicit platform.
    #[must_use]
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

/// Deterministic identity of one distributable add-on variant.
///
/// # Examples
///
/// ```
/// use addon_installer::artefact::naming::{BuildIdentity, HostPlatform};
/// use semver::Version;
///
/// let identity = BuildIdentity::new(
///     "oracledb",
///     Version::new(6, 2, 0),
///     "115",
///     HostPlatform::new("linux", "x86_64"),
/// );
/// assert_eq!(identity.to_string(), "oracledb-v6.2.0-abi115-linux-x86_64");
/// assert_eq!(identity.release_tag(), "v6.2.0");
/// assert_eq!(identity.package_file_name(), "oracledb-v6.2.0-abi115-linux-x86_64.gz");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildIdentity {
    product: String,
    version: Version,
    abi: String,
    platform: HostPlatform,
}

impl BuildIdentity {
    /// Create an identity from its components.
    #[must_use]
    pub fn new(
        product: impl Into<String>,
        version: Version,
        abi: impl Into<String>,
        platform: HostPlatform,
    ) -> Self {
        Self {
            product: product.into(),
            version,
            abi: abi.into(),
            platform,
        }
    }

    /// Product name component.
    #[must_use]
    pub fn product(&self) -> &str {
        &self.product
    }

    /// Semantic version component.
    #[must_use]
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Runtime ABI component.
    #[must_use]
    pub fn abi(&self) -> &str {
        &self.abi
    }

    /// Platform component.
    #[must_use]
    pub fn platform(&self) -> &HostPlatform {
        &self.platform
    }

    /// Release tag under which the package is published: `v<version>`.
    #[must_use]
    pub fn release_tag(&self) -> String {
        format!("v{}", self.version)
    }

    /// Manifest key for a binary of this build: `<identity>-<binary>`.
    #[must_use]
    pub fn manifest_key(&self, binary_file_name: &str) -> String {
        format!("{self}-{binary_file_name}")
    }

    /// Package file name: `<identity>.gz`.
    #[must_use]
    pub fn package_file_name(&self) -> String {
        format!("{self}{PACKAGE_EXTENSION}")
    }

    /// Name of a staged binary: `<binary>-abi<abi>-<os>-<arch>.bin`.
    #[must_use]
    pub fn staged_binary_name(&self, binary_file_name: &str) -> String {
        format!("{}.bin", self.staged_stem(binary_file_name))
    }

    /// Name of the build information file staged next to a binary.
    #[must_use]
    pub fn staged_buildinfo_name(&self, binary_file_name: &str) -> String {
        format!("{}-buildinfo.txt", self.staged_stem(binary_file_name))
    }

    fn staged_stem(&self, binary_file_name: &str) -> String {
        format!("{binary_file_name}-abi{}-{}", self.abi, self.platform)
    }

    /// Remote path of a release file:
    /// `/<repository>/releases/download/<tag>/<file>`.
    #[must_use]
    pub fn release_path(&self, repository: &str, file_name: &str) -> String {
        format!(
            "/{}/releases/download/{}/{file_name}",
            repository.trim_matches('/'),
            self.release_tag()
        )
    }
}

impl fmt::Display for BuildIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-v{}-abi{}-{}",
            self.product, self.version, self.abi, self.platform
        )
    }
}
