//! User-facing progress output.
//!
//! Progress lines go to stderr prefixed with the product name so that they
//! stand out in a package manager's build log. Writes are best-effort: a
//! closed stderr never turns a successful install into a failure.

use crate::install::InstallOutcome;
use std::fmt::Display;
use std::io::Write;

/// Write `message` followed by a newline, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

/// Write a progress line prefixed with `product`.
///
/// # Example
///
/// ```
/// use addon_installer::output::write_progress;
///
/// let mut out = Vec::new();
/// write_progress(&mut out, "oracledb", "Beginning installation");
/// assert_eq!(out, b"oracledb Beginning installation\n");
/// ```
pub fn write_progress(stderr: &mut dyn Write, product: &str, message: impl Display) {
    write_stderr_line(stderr, format_args!("{product} {message}"));
}

/// Write an error line prefixed with `product` and an `ERR!` marker.
pub fn write_error(stderr: &mut dyn Write, product: &str, message: impl Display) {
    write_stderr_line(stderr, format_args!("{product} ERR! {message}"));
}

/// Format the closing banner for a finished install.
#[must_use]
pub fn completion_message(
    product: &str,
    version: &str,
    platform: &str,
    outcome: InstallOutcome,
) -> String {
    match outcome {
        InstallOutcome::AlreadyInstalled => {
            format!("{product} {version} was already installed ({platform})")
        }
        InstallOutcome::Installed => {
            format!("{product} {version} installation complete ({platform})")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn progress_lines_carry_product_prefix() {
        let mut out = Vec::new();
        write_progress(&mut out, "oracledb", "Verifying installation");
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "oracledb Verifying installation\n"
        );
    }

    #[test]
    fn error_lines_are_marked() {
        let mut out = Vec::new();
        write_error(&mut out, "oracledb", "Failed to install");
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "oracledb ERR! Failed to install\n"
        );
    }

    #[test]
    fn write_failures_are_ignored() {
        struct Closed;
        impl Write for Closed {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        write_stderr_line(&mut Closed, "dropped");
    }

    #[rstest]
    #[case::already(InstallOutcome::AlreadyInstalled, "was already installed")]
    #[case::fresh(InstallOutcome::Installed, "installation complete")]
    fn completion_message_reflects_outcome(
        #[case] outcome: InstallOutcome,
        #[case] expected: &str,
    ) {
        let message = completion_message("oracledb", "6.2.0", "linux-x86_64", outcome);
        assert!(message.starts_with("oracledb 6.2.0 "));
        assert!(message.contains(expected));
        assert!(message.ends_with("(linux-x86_64)"));
    }
}
