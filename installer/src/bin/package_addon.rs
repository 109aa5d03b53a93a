//! Packaging binary for prebuilt add-on distribution.
//!
//! Thin CLI wrapper around [`addon_installer::artefact::packaging`] run by the
//! release build after compiling the add-on. It writes the package for this
//! platform and upserts the binary's digest into `SHASUMS256.txt`.

use addon_installer::artefact::packaging::{PackageOutput, PackageRequest, create_package};
use addon_installer::cli::PackageCli;
use addon_installer::config::InstallerConfig;
use addon_installer::error::Result;
use addon_installer::logging::init_logging;
use addon_installer::output::write_stderr_line;
use clap::Parser;
use std::io::Write;

fn main() {
    init_logging();
    let cli = PackageCli::parse();
    let mut stderr = std::io::stderr();
    match run(&cli) {
        Ok(output) => {
            println!("Created {}", output.package_path);
            println!("Updated {} ({})", output.manifest_path, output.manifest_key);
        }
        Err(err) => {
            report(&mut stderr, &err);
            std::process::exit(1);
        }
    }
}

fn run(cli: &PackageCli) -> Result<PackageOutput> {
    let config = InstallerConfig::load(&cli.descriptor.descriptor)?;
    let request = PackageRequest {
        identity: &config.identity,
        binary_file_name: &config.binary_file_name,
        binary_path: &cli.binary,
        license_path: &config.license_path,
        output_dir: &cli.output_dir,
    };
    Ok(create_package(&request)?)
}

fn report(stderr: &mut dyn Write, err: &dyn std::error::Error) {
    write_stderr_line(stderr, format_args!("error: {err}"));
    let mut source = err.source();
    while let Some(cause) = source {
        write_stderr_line(stderr, format_args!("  caused by: {cause}"));
        source = cause.source();
    }
}
