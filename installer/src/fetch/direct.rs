//! Direct HTTPS hops using `ureq`.
//!
//! The agent follows no redirects, ignores proxy environment variables,
//! and reports every HTTP status as a response, so that the hop loop in
//! [`SecureFetcher`](super::SecureFetcher) decides what happens next.

use super::{Deadline, FetchError, Hop, Target, classify_response};
use log::trace;
use ureq::http::header::LOCATION;

/// Build the agent used for direct hops.
pub(crate) fn agent() -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .max_redirects(0)
        .max_redirects_will_error(false)
        .http_status_as_error(false)
        .proxy(None)
        .https_only(true)
        .build();
    ureq::Agent::new_with_config(config)
}

/// Perform one GET against the origin.
///
/// # Errors
///
/// Returns [`FetchError::TimedOut`] when the deadline expires,
/// [`FetchError::Transport`] for other client failures, and the
/// classification errors for unexpected statuses.
pub fn get(agent: &ureq::Agent, target: &Target, deadline: &Deadline) -> Result<Hop, FetchError> {
    let url = target.url();
    let remaining = deadline.remaining(&url)?;
    trace!("GET {url} (direct, {}ms left)", remaining.as_millis());

    let response = agent
        .get(url.as_str())
        .config()
        .timeout_global(Some(remaining))
        .build()
        .call()
        .map_err(|err| map_ureq_error(&url, err))?;

    let status = response.status().as_u16();
    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    classify_response(&url, status, location, move || {
        Box::new(response.into_body().into_reader())
    })
}

fn map_ureq_error(url: &str, err: ureq::Error) -> FetchError {
    match err {
        ureq::Error::Timeout(_) => FetchError::TimedOut {
            url: url.to_owned(),
        },
        ureq::Error::Io(io) => FetchError::from_socket(io, url),
        other => FetchError::Transport {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn timeout_errors_map_to_timed_out() {
        let err = map_ureq_error("https://h/p", ureq::Error::Timeout(ureq::Timeout::Global));
        assert!(matches!(err, FetchError::TimedOut { .. }));
    }

    #[test]
    fn io_errors_keep_their_kind() {
        let err = map_ureq_error(
            "https://h/p",
            ureq::Error::Io(io::Error::new(io::ErrorKind::ConnectionRefused, "refused")),
        );
        assert!(matches!(err, FetchError::Io(ref e) if e.kind() == io::ErrorKind::ConnectionRefused));
    }

    #[test]
    fn other_errors_are_transport_failures() {
        let err = map_ureq_error("https://h/p", ureq::Error::HostNotFound);
        assert!(matches!(err, FetchError::Transport { .. }));
    }
}
