//! Extraction binary for prebuilt add-on packages.
//!
//! Unpacks a package into a directory: the binary under the descriptor's
//! binary file name and the license under its license file name.

use addon_installer::artefact::container::DecodeSummary;
use addon_installer::artefact::extraction::{ExtractTargets, extract_package};
use addon_installer::cli::ExtractCli;
use addon_installer::config::InstallerConfig;
use addon_installer::error::Result;
use addon_installer::logging::init_logging;
use addon_installer::output::write_stderr_line;
use clap::Parser;

fn main() {
    init_logging();
    let cli = ExtractCli::parse();
    match run(&cli) {
        Ok((targets, summary)) => {
            println!("Extracted {} ({} bytes)", targets.binary, summary.binary_bytes);
        }
        Err(err) => {
            write_stderr_line(&mut std::io::stderr(), format_args!("error: {err}"));
            std::process::exit(1);
        }
    }
}

fn run(cli: &ExtractCli) -> Result<(ExtractTargets, DecodeSummary)> {
    let config = InstallerConfig::load(&cli.descriptor.descriptor)?;
    let targets = ExtractTargets {
        binary: cli.dest_dir.join(&config.binary_file_name),
        license: Some(cli.dest_dir.join(&config.license_file_name)),
    };
    let summary = extract_package(&cli.package, &targets)?;
    Ok((targets, summary))
}
