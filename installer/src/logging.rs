//! Diagnostic logging for the installer binaries.
//!
//! Library code logs through the `log` facade. The binaries install a
//! `tracing-subscriber` formatter on stderr, which also receives `log`
//! records, filtered by `ADDON_INSTALLER_LOG` (default `warn`). Setting
//! `ADDON_TRACE_INSTALL=TRUE` turns on every trace record instead.

use tracing_subscriber::EnvFilter;

/// Variable holding `EnvFilter` directives.
pub const LOG_ENV: &str = "ADDON_INSTALLER_LOG";

/// Variable that forces trace output when set to `TRUE`.
pub const TRACE_ENV: &str = "ADDON_TRACE_INSTALL";

const DEFAULT_DIRECTIVES: &str = "warn";

/// Pick the filter directives from the environment `lookup`.
///
/// # Example
///
/// ```
/// use addon_installer::logging::filter_directives;
///
/// let lookup = |name: &str| (name == "ADDON_INSTALLER_LOG").then(|| "debug".to_owned());
/// assert_eq!(filter_directives(lookup), "debug");
/// assert_eq!(filter_directives(|_: &str| None), "warn");
/// ```
pub fn filter_directives<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if lookup(TRACE_ENV).is_some_and(|value| value == "TRUE") {
        return "trace".to_owned();
    }
    lookup(LOG_ENV)
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DIRECTIVES.to_owned())
}

/// Install the stderr subscriber for this process.
///
/// Invalid directives fall back to the default filter. Calling this more
/// than once keeps the first subscriber.
pub fn init_logging() {
    let directives = filter_directives(|name| std::env::var(name).ok());
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|err| {
        eprintln!("ignoring {LOG_ENV}={directives:?}: {err}");
        EnvFilter::new(DEFAULT_DIRECTIVES)
    });

    // Fails only when a subscriber is already installed, which is fine.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}
