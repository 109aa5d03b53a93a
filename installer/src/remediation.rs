//! Failure guidance printed when an install cannot complete.
//!
//! Package managers show the installer's stderr verbatim, so a failure names
//! the likely cause (an unsupported platform, architecture or runtime ABI)
//! before the raw error and a pointer to the troubleshooting guide.

use crate::config::InstallerConfig;
use crate::error::InstallerError;

/// Exit code for a failed install.
pub const INSTALL_FAILURE_EXIT_CODE: i32 = 87;

/// Operating systems with published packages.
pub const SUPPORTED_OS: &[&str] = &["linux", "macos", "windows"];

/// Architectures with published packages.
pub const SUPPORTED_ARCH: &[&str] = &["x86_64"];

/// Anchor appended to the help URL.
const TROUBLESHOOTING_ANCHOR: &str = "#troubleshooting";

/// Build the lines explaining why `err` stopped the install of `config`.
///
/// Each returned line is meant to be written with an error prefix.
///
/// # Example
///
/// ```
/// use addon_installer::artefact::naming::HostPlatform;
/// use addon_installer::config::{InstallerConfig, PackageDescriptor};
/// use addon_installer::error::InstallerError;
/// use addon_installer::remediation::remediation_lines;
/// use camino::Utf8Path;
///
/// let descriptor = PackageDescriptor::parse(
///     r#"
///     product = "oracledb"
///     version = "6.2.0"
///     abi = "115"
///     binary = "oracledb.node"
///     license = "LICENSE.txt"
///     help_url = "https://example.test/INSTALL.html"
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
///     Utf8Path::new("."),
///     HostPlatform::new("freebsd", "x86_64"),
/// )
/// .unwrap();
/// let err = InstallerError::Integrity {
///     key: config.manifest_key(),
///     reason: "Build not found in manifest".to_owned(),
/// };
///
/// let lines = remediation_lines(&config, &err);
/// assert!(lines.iter().any(|line| line.contains("platform \"freebsd\"")));
/// assert_eq!(
///     lines.last().map(String::as_str),
///     Some("For help see https://example.test/INSTALL.html#troubleshooting")
/// );
/// ```
#[must_use]
pub fn remediation_lines(config: &InstallerConfig, err: &InstallerError) -> Vec<String> {
    let identity = &config.identity;
    let platform = identity.platform();
    let mut lines = vec![format!("Binary {} was not installed.", config.binary_path)];

    if !SUPPORTED_OS.contains(&platform.os.as_str()) {
        lines.push(format!(
            "Pre-built binary packages are not available for platform {:?}",
            platform.os
        ));
    } else if !SUPPORTED_ARCH.contains(&platform.arch.as_str()) {
        lines.push(format!(
            "Pre-built binary packages are not available for architecture {:?}",
            platform.arch
        ));
    } else if !config.supported_abis.is_empty()
        && !config.supported_abis.iter().any(|abi| abi == identity.abi())
    {
        lines.push(format!(
            "Pre-built binary packages are not available for this runtime (ABI {:?})",
            identity.abi()
        ));
    }

    lines.push(format!(
        "Failed to install binary package {}",
        config.package_file_name()
    ));
    lines.push(err.to_string());
    if let Some(help_url) = &config.help_url {
        lines.push(format!("For help see {help_url}{TROUBLESHOOTING_ANCHOR}"));
    }
    lines
}
