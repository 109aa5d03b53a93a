//! Add-on installer CLI entrypoint.
//!
//! Verifies the installed binary against the release manifest and fetches
//! the package for this platform when it is missing or stale. With
//! `--staging-dir` the binary is taken from pre-staged builds instead.

use addon_installer::cli::InstallCli;
use addon_installer::config::InstallerConfig;
use addon_installer::error::Result;
use addon_installer::fetch::SecureFetcher;
use addon_installer::install::{InstallOutcome, run_install};
use addon_installer::logging::init_logging;
use addon_installer::output::{completion_message, write_error, write_progress, write_stderr_line};
use addon_installer::remediation::{INSTALL_FAILURE_EXIT_CODE, remediation_lines};
use addon_installer::staging::install_from_staging;
use clap::Parser;
use std::io::Write;

fn main() {
    init_logging();
    let cli = InstallCli::parse();
    let mut stderr = std::io::stderr();
    let exit_code = run(&cli, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &InstallCli, stderr: &mut dyn Write) -> i32 {
    let config = match InstallerConfig::load(&cli.descriptor.descriptor) {
        Ok(config) => config,
        Err(err) => {
            write_stderr_line(stderr, format_args!("ERR! {err}"));
            return INSTALL_FAILURE_EXIT_CODE;
        }
    };
    let result = install(cli, &config, stderr);
    exit_code_for_run_result(&config, result, stderr)
}

fn install(
    cli: &InstallCli,
    config: &InstallerConfig,
    stderr: &mut dyn Write,
) -> Result<InstallOutcome> {
    if let Some(staging_dir) = &cli.staging_dir {
        let staged = install_from_staging(config, staging_dir)?;
        write_progress(
            stderr,
            config.identity.product(),
            format_args!("Installed {} from {staging_dir}", staged.binary_path),
        );
        return Ok(InstallOutcome::Installed);
    }
    let fetcher = SecureFetcher::new(cli.fetch_options());
    run_install(config, &fetcher, stderr)
}

fn exit_code_for_run_result(
    config: &InstallerConfig,
    result: Result<InstallOutcome>,
    stderr: &mut dyn Write,
) -> i32 {
    let identity = &config.identity;
    match result {
        Ok(outcome) => {
            let message = completion_message(
                identity.product(),
                &identity.version().to_string(),
                &identity.platform().to_string(),
                outcome,
            );
            write_stderr_line(stderr, message);
            0
        }
        Err(err) => {
            for line in remediation_lines(config, &err) {
                write_error(stderr, identity.product(), line);
            }
            INSTALL_FAILURE_EXIT_CODE
        }
    }
}
