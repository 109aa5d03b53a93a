//! Network error types for remote fetches.

use std::io;
use thiserror::Error;

/// Errors raised while fetching a remote file.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The origin answered with a status other than 200 or a redirect.
    #[error("HTTPS request for {url} failed with code {status}")]
    HttpStatus {
        /// Requested URL.
        url: String,
        /// HTTP status code received.
        status: u16,
    },

    /// The proxy refused the `CONNECT` request.
    #[error("HTTP proxy request via {proxy} failed with code {status}")]
    ProxyStatus {
        /// Proxy endpoint as `host:port`.
        proxy: String,
        /// HTTP status code received.
        status: u16,
    },

    /// A redirect response carried no `Location` header.
    #[error("redirect from {url} has no Location header")]
    MissingLocation {
        /// URL or proxy that sent the redirect.
        url: String,
    },

    /// A `Location` header could not be interpreted.
    #[error("invalid redirect location {location:?}: {reason}")]
    InvalidLocation {
        /// The header value.
        location: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A redirect tried to leave HTTPS.
    #[error("refusing redirect to non-HTTPS location {location}")]
    InsecureRedirect {
        /// The rejected location.
        location: String,
    },

    /// The redirect budget was exhausted.
    #[error("too many redirects (limit {limit})")]
    TooManyRedirects {
        /// Maximum number of redirects allowed.
        limit: u32,
    },

    /// The fetch deadline expired.
    #[error("request for {url} timed out")]
    TimedOut {
        /// URL being fetched when time ran out.
        url: String,
    },

    /// The HTTP client reported a transport failure.
    #[error("request for {url} failed: {reason}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Client error description.
        reason: String,
    },

    /// TLS setup with the origin failed.
    #[error("TLS error talking to {host}: {reason}")]
    Tls {
        /// Origin host name.
        host: String,
        /// TLS error description.
        reason: String,
    },

    /// A socket read or write failed.
    #[error("network I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FetchError {
    /// Map an I/O failure on a socket, turning timeouts into [`Self::TimedOut`].
    pub(crate) fn from_socket(err: io::Error, url: &str) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::TimedOut {
                url: url.to_owned(),
            },
            _ => Self::Io(err),
        }
    }
}
