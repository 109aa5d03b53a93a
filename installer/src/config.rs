//! Package descriptor loading and resolved installer configuration.
//!
//! The add-on ships an `addon.toml` descriptor next to its sources. It is
//! parsed once, validated, and resolved into an [`InstallerConfig`] that the
//! packaging, extraction, and install flows receive by reference.

use crate::artefact::manifest::MANIFEST_FILE_NAME;
use crate::artefact::naming::{BuildIdentity, HostPlatform};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use semver::Version;
use serde::Deserialize;
use std::fs;
use thiserror::Error;

/// Default descriptor file name.
pub const DESCRIPTOR_FILE_NAME: &str = "addon.toml";

/// Errors raised while loading or validating a descriptor.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The descriptor file could not be read.
    #[error("failed to read descriptor {path}: {source}")]
    Read {
        /// Descriptor path.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The descriptor is not valid TOML or has unexpected fields.
    #[error("invalid descriptor {path}: {reason}")]
    Parse {
        /// Descriptor path.
        path: Utf8PathBuf,
        /// Parser message.
        reason: String,
    },

    /// The version is not a semantic version.
    #[error("invalid version {version:?}: {reason}")]
    InvalidVersion {
        /// The rejected version text.
        version: String,
        /// Parser message.
        reason: String,
    },

    /// A field has an unusable value.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Where release files are published.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseLocation {
    /// Host serving release downloads (for example `github.com`).
    pub host: String,
    /// Repository path on that host (for example `oracle/node-oracledb`).
    pub repository: String,
}

/// Local directories, relative to the descriptor directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Layout {
    /// Directory that receives the binary.
    pub binary_dir: Utf8PathBuf,
    /// Directory that receives the license.
    pub license_dir: Utf8PathBuf,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            binary_dir: Utf8PathBuf::from("build/Release"),
            license_dir: Utf8PathBuf::from("."),
        }
    }
}

/// The `addon.toml` package descriptor as written by add-on authors.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageDescriptor {
    /// Product name; the first component of the build identity.
    pub product: String,
    /// Semantic version of the add-on.
    pub version: String,
    /// Runtime ABI number the binary is built against.
    pub abi: String,
    /// File name of the binary (for example `oracledb.node`).
    pub binary: String,
    /// File name of the license shipped in the package.
    pub license: String,
    /// Installation help page, linked from failure messages.
    #[serde(default)]
    pub help_url: Option<String>,
    /// ABIs for which prebuilt packages are published.
    #[serde(default)]
    pub supported_abis: Vec<String>,
    /// Release download location.
    pub release: ReleaseLocation,
    /// Local directory layout.
    #[serde(default)]
    pub layout: Layout,
}

impl PackageDescriptor {
    /// Parse descriptor text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] naming `origin` when the text is not a
    /// valid descriptor.
    pub fn parse(text: &str, origin: &Utf8Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|err| ConfigError::Parse {
            path: origin.to_owned(),
            reason: err.to_string(),
        })
    }
}

/// Resolved configuration shared by every installer operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerConfig {
    /// Identity of the build for this platform.
    pub identity: BuildIdentity,
    /// File name of the binary.
    pub binary_file_name: String,
    /// File name of the license.
    pub license_file_name: String,
    /// Release download location.
    pub release: ReleaseLocation,
    /// Installation help page, if any.
    pub help_url: Option<String>,
    /// ABIs with published packages; empty means unknown.
    pub supported_abis: Vec<String>,
    /// Directory containing the descriptor.
    pub root: Utf8PathBuf,
    /// Destination of the installed binary.
    pub binary_path: Utf8PathBuf,
    /// Destination of the installed license.
    pub license_path: Utf8PathBuf,
}

impl InstallerConfig {
    /// Load and resolve the descriptor at `path` for the current platform.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read and the
    /// parse or validation errors of [`Self::from_descriptor`].
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        let descriptor = PackageDescriptor::parse(&text, path)?;
        let root = match path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent.to_owned(),
            _ => Utf8PathBuf::from("."),
        };
        Self::from_descriptor(&descriptor, &root, HostPlatform::current())
    }

    /// Validate `descriptor` and resolve it against `root` and `platform`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidVersion`] for a non-semver version and
    /// [`ConfigError::InvalidField`] for empty names or file names that
    /// contain path separators.
    ///
    /// # Examples
    ///
    /// ```
    /// use addon_installer::config::{InstallerConfig, PackageDescriptor};
    /// use addon_installer::artefact::naming::HostPlatform;
    /// use camino::Utf8Path;
    ///
    /// let descriptor = PackageDescriptor::parse(
    ///     r#"
    ///     product = "oracledb"
    ///     version = "6.2.0"
    ///     abi = "115"
    ///     binary = "oracledb.node"
    ///     license = "LICENSE.txt"
    ///
    ///     [release]
    ///     host = "github.com"
    ///     repository = "oracle/node-oracledb"
    ///     "#,
    ///     Utf8Path::new("addon.toml"),
    /// )
    /// .unwrap();
    /// let config = InstallerConfig::from_descriptor(
    ///     &descriptor,
    ///     Utf8Path::new("/src/addon"),
    ///     HostPlatform::new("linux", "x86_64"),
    /// )
    /// .unwrap();
    /// assert_eq!(config.binary_path, "/src/addon/build/Release/oracledb.node");
    /// assert_eq!(config.package_file_name(), "oracledb-v6.2.0-abi115-linux-x86_64.gz");
    /// ```
    pub fn from_descriptor(
        descriptor: &PackageDescriptor,
        root: &Utf8Path,
        platform: HostPlatform,
    ) -> Result<Self, ConfigError> {
        require_name("product", &descriptor.product)?;
        require_name("abi", &descriptor.abi)?;
        require_file_name("binary", &descriptor.binary)?;
        require_file_name("license", &descriptor.license)?;
        require_name("release.host", &descriptor.release.host)?;
        require_name("release.repository", &descriptor.release.repository)?;
        let version =
            Version::parse(&descriptor.version).map_err(|err| ConfigError::InvalidVersion {
                version: descriptor.version.clone(),
                reason: err.to_string(),
            })?;

        let identity = BuildIdentity::new(
            descriptor.product.as_str(),
            version,
            descriptor.abi.as_str(),
            platform,
        );
        let binary_path = root
            .join(&descriptor.layout.binary_dir)
            .join(&descriptor.binary);
        let license_path = root
            .join(&descriptor.layout.license_dir)
            .join(&descriptor.license);
        debug!("resolved build identity {identity}");

        Ok(Self {
            identity,
            binary_file_name: descriptor.binary.clone(),
            license_file_name: descriptor.license.clone(),
            release: descriptor.release.clone(),
            help_url: descriptor.help_url.clone(),
            supported_abis: descriptor.supported_abis.clone(),
            root: root.to_owned(),
            binary_path,
            license_path,
        })
    }

    /// Manifest key of this build's binary.
    #[must_use]
    pub fn manifest_key(&self) -> String {
        self.identity.manifest_key(&self.binary_file_name)
    }

    /// File name of this build's package.
    #[must_use]
    pub fn package_file_name(&self) -> String {
        self.identity.package_file_name()
    }

    /// Remote path of this build's package.
    #[must_use]
    pub fn package_remote_path(&self) -> String {
        self.identity
            .release_path(&self.release.repository, &self.package_file_name())
    }

    /// Remote path of the checksum manifest for this release.
    #[must_use]
    pub fn manifest_remote_path(&self) -> String {
        self.identity
            .release_path(&self.release.repository, MANIFEST_FILE_NAME)
    }
}

fn require_name(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidField {
            field,
            reason: "must not be empty".to_owned(),
        });
    }
    Ok(())
}

fn require_file_name(field: &'static str, value: &str) -> Result<(), ConfigError> {
    require_name(field, value)?;
    if value.contains(['/', '\\']) || value == "." || value == ".." {
        return Err(ConfigError::InvalidField {
            field,
            reason: format!("{value:?} must be a plain file name"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    const DESCRIPTOR: &str = r#"
        product = "oracledb"
        version = "6.2.0"
        abi = "115"
        binary = "oracledb.node"
        license = "LICENSE.txt"
        help_url = "https://example.test/INSTALL.html"
        supported_abis = ["108", "115"]

        [release]
        host = "github.com"
        repository = "oracle/node-oracledb"

        [layout]
        binary_dir = "lib/native"
    "#;

    #[fixture]
    fn descriptor() -> PackageDescriptor {
        PackageDescriptor::parse(DESCRIPTOR, Utf8Path::new("addon.toml")).expect("valid descriptor")
    }

    fn resolve(descriptor: &PackageDescriptor) -> Result<InstallerConfig, ConfigError> {
        InstallerConfig::from_descriptor(
            descriptor,
            Utf8Path::new("/work/addon"),
            HostPlatform::new("linux", "x86_64"),
        )
    }

    #[rstest]
    fn resolves_paths_against_root(descriptor: PackageDescriptor) {
        let config = resolve(&descriptor).expect("resolves");
        assert_eq!(config.binary_path, "/work/addon/lib/native/oracledb.node");
        assert_eq!(config.license_path, "/work/addon/./LICENSE.txt");
    }

    #[rstest]
    fn derives_remote_paths(descriptor: PackageDescriptor) {
        let config = resolve(&descriptor).expect("resolves");
        assert_eq!(
            config.package_remote_path(),
            "/oracle/node-oracledb/releases/download/v6.2.0/oracledb-v6.2.0-abi115-linux-x86_64.gz"
        );
        assert_eq!(
            config.manifest_remote_path(),
            "/oracle/node-oracledb/releases/download/v6.2.0/SHASUMS256.txt"
        );
        assert_eq!(
            config.manifest_key(),
            "oracledb-v6.2.0-abi115-linux-x86_64-oracledb.node"
        );
    }

    #[test]
    fn layout_defaults_apply_when_omitted() {
        let text = DESCRIPTOR.replace("[layout]\n        binary_dir = \"lib/native\"", "");
        let descriptor =
            PackageDescriptor::parse(&text, Utf8Path::new("addon.toml")).expect("valid");
        assert_eq!(descriptor.layout, Layout::default());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let text = format!("{DESCRIPTOR}\nunexpected = true\n");
        let err = PackageDescriptor::parse(&text, Utf8Path::new("addon.toml"))
            .expect_err("unknown field");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[rstest]
    fn non_semver_version_is_rejected(mut descriptor: PackageDescriptor) {
        descriptor.version = "6.2".to_owned();
        let err = resolve(&descriptor).expect_err("not semver");
        assert!(matches!(err, ConfigError::InvalidVersion { .. }));
    }

    #[rstest]
    #[case::nested_binary("binary", "build/oracledb.node")]
    #[case::empty_product("product", "")]
    #[case::blank_abi("abi", "  ")]
    fn invalid_fields_are_rejected(
        mut descriptor: PackageDescriptor,
        #[case] field: &str,
        #[case] value: &str,
    ) {
        match field {
            "binary" => descriptor.binary = value.to_owned(),
            "product" => descriptor.product = value.to_owned(),
            _ => descriptor.abi = value.to_owned(),
        }
        let err = resolve(&descriptor).expect_err("invalid field");
        assert!(matches!(err, ConfigError::InvalidField { field: f, .. } if f == field));
    }

    #[test]
    fn load_uses_descriptor_directory_as_root() {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir");
        let path = root.join(DESCRIPTOR_FILE_NAME);
        fs::write(&path, DESCRIPTOR).expect("write descriptor");

        let config = InstallerConfig::load(&path).expect("loads");
        assert_eq!(config.root, root);
        assert_eq!(config.identity.platform(), &HostPlatform::current());
    }

    #[test]
    fn load_reports_missing_descriptor() {
        let err = InstallerConfig::load(Utf8Path::new("/nonexistent/addon.toml"))
            .expect_err("missing file");
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
