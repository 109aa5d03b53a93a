//! CLI argument definitions for the installer binaries.
//!
//! Each binary parses its own `Parser` struct from this module so the
//! entrypoints stay small and focused on orchestration. The packaging and
//! extraction tools take their input as a single `path=<value>` token, the
//! form build scripts already pass.

use crate::config::DESCRIPTOR_FILE_NAME;
use crate::fetch::{DEFAULT_MAX_REDIRECTS, FetchOptions};
use camino::Utf8PathBuf;
use clap::{Args, Parser};
use std::time::Duration;

/// Options shared by every binary.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct DescriptorArgs {
    /// Package descriptor describing the add-on.
    #[arg(long, value_name = "FILE", default_value = DESCRIPTOR_FILE_NAME)]
    pub descriptor: Utf8PathBuf,
}

/// Install the prebuilt binary for this platform.
#[derive(Parser, Debug, Clone)]
#[command(name = "addon-install")]
#[command(version, about)]
#[command(long_about = concat!(
    "Install the prebuilt binary for this platform.\n\n",
    "The installed binary is first checked against the release's SHASUMS256.txt. ",
    "When it is missing or does not match, the package for this platform and ",
    "runtime ABI is downloaded, extracted, and checked again.\n\n",
    "Downloads honour https_proxy, HTTPS_PROXY, http_proxy, HTTP_PROXY, all_proxy ",
    "and ALL_PROXY, and skip hosts listed in NO_PROXY.",
))]
#[command(after_help = concat!(
    "ENVIRONMENT:\n",
    "  ADDON_INSTALLER_LOG     Log filter directives (default: warn)\n",
    "  ADDON_TRACE_INSTALL     Set to TRUE to log every step\n\n",
    "EXAMPLES:\n",
    "  Verify or fetch the binary:\n",
    "    $ addon-install\n\n",
    "  Install from bundled builds:\n",
    "    $ addon-install --staging-dir package/Staging",
))]
pub struct InstallCli {
    /// Descriptor options.
    #[command(flatten)]
    pub descriptor: DescriptorArgs,

    /// Total time allowed for each download, in seconds.
    #[arg(long, value_name = "SECS", default_value_t = 60)]
    pub timeout_secs: u64,

    /// Redirects followed before a download is abandoned.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_REDIRECTS)]
    pub max_redirects: u32,

    /// Install from pre-staged builds in DIR instead of downloading.
    #[arg(long, value_name = "DIR")]
    pub staging_dir: Option<Utf8PathBuf>,
}

impl InstallCli {
    /// Download limits requested on the command line.
    #[must_use]
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: Duration::from_secs(self.timeout_secs),
            max_redirects: self.max_redirects,
        }
    }
}

/// Package a built binary with its license.
#[derive(Parser, Debug, Clone)]
#[command(name = "addon-package")]
#[command(version, about)]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  $ addon-package path=build/Release/oracledb.node",
))]
pub struct PackageCli {
    /// Descriptor options.
    #[command(flatten)]
    pub descriptor: DescriptorArgs,

    /// Directory receiving the package and SHASUMS256.txt.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub output_dir: Utf8PathBuf,

    /// Binary to package, given as `path=<binary>`.
    #[arg(value_name = "path=BINARY", value_parser = parse_path_token)]
    pub binary: Utf8PathBuf,
}

/// Extract a package into a directory.
#[derive(Parser, Debug, Clone)]
#[command(name = "addon-extract")]
#[command(version, about)]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  $ addon-extract path=oracledb-v6.2.0-abi115-linux-x86_64.gz",
))]
pub struct ExtractCli {
    /// Descriptor options.
    #[command(flatten)]
    pub descriptor: DescriptorArgs,

    /// Directory receiving the binary and license.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub dest_dir: Utf8PathBuf,

    /// Package to extract, given as `path=<package.gz>`.
    #[arg(value_name = "path=PACKAGE", value_parser = parse_path_token)]
    pub package: Utf8PathBuf,
}

/// Parse a `path=<value>` token.
///
/// # Errors
///
/// Returns a message when the token lacks the `path=` prefix or a value.
pub fn parse_path_token(token: &str) -> Result<Utf8PathBuf, String> {
    match token.split_once('=') {
        Some(("path", value)) if !value.is_empty() => Ok(Utf8PathBuf::from(value)),
        Some(("path", _)) => Err("path= needs a value".to_owned()),
        _ => Err(format!("expected path=<value>, got {token:?}")),
    }
}
