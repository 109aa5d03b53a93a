//! Install from a directory of pre-staged binaries.
//!
//! Some distributions ship every supported build in a staging directory
//! instead of downloading one. Each build is named
//! `<binary>-abi<abi>-<os>-<arch>.bin`, optionally with a matching
//! `-buildinfo.txt`. The build for this runtime is moved into place and the
//! rest of the staging directory is removed.

use crate::config::InstallerConfig;
use crate::error::{InstallerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use std::fs;

/// Files placed by a staged install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedInstall {
    /// The installed binary.
    pub binary_path: Utf8PathBuf,
    /// The installed build information file, if one was staged.
    pub buildinfo_path: Option<Utf8PathBuf>,
}

/// Move the staged build for `config` out of `staging_dir` and prune it.
///
/// Failures to move the build information file or to prune the staging
/// directory are logged and do not fail the install.
///
/// # Errors
///
/// Returns [`InstallerError::NoStagedBinary`] if no build for this runtime
/// and platform is staged, and [`InstallerError::Filesystem`] if the binary
/// cannot be moved into place.
pub fn install_from_staging(
    config: &InstallerConfig,
    staging_dir: &Utf8Path,
) -> Result<StagedInstall> {
    let identity = &config.identity;
    let staged_binary = staging_dir.join(identity.staged_binary_name(&config.binary_file_name));
    if !staged_binary.is_file() {
        return Err(InstallerError::NoStagedBinary {
            abi: identity.abi().to_owned(),
            platform: identity.platform().to_string(),
            dir: staging_dir.to_owned(),
        });
    }

    let binary_dir = parent_dir(&config.binary_path);
    fs::create_dir_all(binary_dir)
        .map_err(|err| InstallerError::filesystem(binary_dir, &err))?;
    move_file(&staged_binary, &config.binary_path)
        .and_then(|()| set_mode(&config.binary_path, 0o755))
        .map_err(|err| InstallerError::filesystem(&config.binary_path, &err))?;
    debug!("moved {staged_binary} to {}", config.binary_path);

    let buildinfo_name = identity.staged_buildinfo_name(&config.binary_file_name);
    let staged_info = staging_dir.join(&buildinfo_name);
    let info_dest = binary_dir.join(&buildinfo_name);
    let buildinfo_path = match move_file(&staged_info, &info_dest)
        .and_then(|()| set_mode(&info_dest, 0o644))
    {
        Ok(()) => Some(info_dest),
        Err(err) => {
            warn!("could not install {staged_info}: {err}");
            None
        }
    };

    if let Err(err) = fs::remove_dir_all(staging_dir) {
        warn!("could not prune {staging_dir}: {err}");
    }

    Ok(StagedInstall {
        binary_path: config.binary_path.clone(),
        buildinfo_path,
    })
}

fn parent_dir(path: &Utf8Path) -> &Utf8Path {
    match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    }
}

/// Rename `from` to `to`, copying when they live on different filesystems.
fn move_file(from: &Utf8Path, to: &Utf8Path) -> std::io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) if from.is_file() => {
            debug!("rename {from} -> {to} failed ({rename_err}); copying");
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(err) => Err(err),
    }
}

#[cfg(unix)]
fn set_mode(path: &Utf8Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Utf8Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}
