//! Proxy-aware HTTPS fetching of release files.
//!
//! [`SecureFetcher`] opens a remote file as a byte stream. Each hop either
//! goes straight to the origin with `ureq`, or through an HTTP proxy using a
//! `CONNECT` tunnel and `rustls`. Redirects from the origin and from the
//! proxy share one counter, and every call runs under one [`Deadline`].
//!
//! # Sub-modules
//!
//! - [`direct`] — Direct HTTPS hops using `ureq`.
//! - [`error`] — Network error types (`FetchError`).
//! - [`proxy`] — Proxy selection from the environment (`ProxyRoute`).
//! - [`tunnel`] — `CONNECT` handshakes and HTTP response heads.

pub mod direct;
pub mod error;
pub mod proxy;
mod tls;
pub mod tunnel;

pub use error::FetchError;

use log::{debug, info, trace};
use proxy::{ProxyEndpoint, ProxyRoute};
use std::io::Read;
use std::time::{Duration, Instant};
use url::Url;

/// Default time budget for one fetch, redirects included.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default number of redirects followed before giving up.
pub const DEFAULT_MAX_REDIRECTS: u32 = 5;

/// Port used for HTTPS origins unless a redirect names another.
pub const HTTPS_PORT: u16 = 443;

/// Tunable limits for a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Time budget for the whole fetch.
    pub timeout: Duration,
    /// Redirects (origin and proxy combined) allowed per fetch.
    pub max_redirects: u32,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

/// Time budget shared by every hop of one fetch.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    /// Start a budget of `budget` from now.
    #[must_use]
    pub fn after(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    /// Time left, or [`FetchError::TimedOut`] once the budget is spent.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::TimedOut`] naming `url` when no time is left.
    pub fn remaining(&self, url: &str) -> Result<Duration, FetchError> {
        self.budget
            .checked_sub(self.started.elapsed())
            .filter(|left| !left.is_zero())
            .ok_or_else(|| FetchError::TimedOut {
                url: url.to_owned(),
            })
    }
}

/// An HTTPS resource: host, port, and path with query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Origin host name.
    pub host: String,
    /// Origin TCP port.
    pub port: u16,
    /// Absolute path, including any query string.
    pub path: String,
}

impl Target {
    /// Target `path` on `host` at the default HTTPS port.
    #[must_use]
    pub fn https(host: &str, path: &str) -> Self {
        let path = if path.starts_with('/') {
            path.to_owned()
        } else {
            format!("/{path}")
        };
        Self {
            host: host.to_owned(),
            port: HTTPS_PORT,
            path,
        }
    }

    /// `host:port`, as used in `CONNECT` requests.
    #[must_use]
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Full URL of the target.
    #[must_use]
    pub fn url(&self) -> String {
        if self.port == HTTPS_PORT {
            format!("https://{}{}", self.host, self.path)
        } else {
            format!("https://{}{}", self.authority(), self.path)
        }
    }

    /// Resolve a `Location` header against this target.
    ///
    /// Relative locations keep the current host. The result must still be
    /// an `https` URL.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidLocation`] for unparsable locations and
    /// [`FetchError::InsecureRedirect`] for non-HTTPS ones.
    ///
    /// # Examples
    ///
    /// ```
    /// use addon_installer::fetch::Target;
    ///
    /// let start = Target::https("github.com", "/org/repo/releases/download/v1/a.gz");
    /// let next = start
    ///     .follow("https://objects.example.com/blob?sig=1")
    ///     .unwrap();
    /// assert_eq!(next.host, "objects.example.com");
    /// assert_eq!(next.path, "/blob?sig=1");
    /// assert!(start.follow("http://plain.example.com/").is_err());
    /// ```
    pub fn follow(&self, location: &str) -> Result<Self, FetchError> {
        let invalid = |reason: String| FetchError::InvalidLocation {
            location: location.to_owned(),
            reason,
        };
        let base = Url::parse(&self.url()).map_err(|err| invalid(err.to_string()))?;
        let next = base.join(location).map_err(|err| invalid(err.to_string()))?;
        if next.scheme() != "https" {
            return Err(FetchError::InsecureRedirect {
                location: location.to_owned(),
            });
        }
        let host = next
            .host_str()
            .ok_or_else(|| invalid("missing host".to_owned()))?;
        let path = match next.query() {
            Some(query) => format!("{}?{query}", next.path()),
            None => next.path().to_owned(),
        };
        Ok(Self {
            host: host.to_owned(),
            port: next.port_or_known_default().unwrap_or(HTTPS_PORT),
            path,
        })
    }
}

/// Result of one request hop.
pub enum Hop {
    /// The origin answered 200; this is the body.
    Body(Box<dyn Read>),
    /// The origin redirected to this `Location`.
    Redirect(String),
    /// The proxy redirected the `CONNECT` to this `Location`.
    ProxyRedirect(String),
}

impl std::fmt::Debug for Hop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Body(_) => f.write_str("Body(..)"),
            Self::Redirect(location) => f.debug_tuple("Redirect").field(location).finish(),
            Self::ProxyRedirect(location) => {
                f.debug_tuple("ProxyRedirect").field(location).finish()
            }
        }
    }
}

/// Performs single request hops, direct or through a proxy.
pub trait Transport {
    /// Send a GET for `target` straight to the origin.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] for transport failures and non-success,
    /// non-redirect statuses.
    fn direct(&self, target: &Target, deadline: &Deadline) -> Result<Hop, FetchError>;

    /// Send a GET for `target` through a `CONNECT` tunnel opened on `proxy`.
    ///
    /// # Errors
    ///
    /// As [`Transport::direct`], plus [`FetchError::ProxyStatus`] when the
    /// proxy refuses the tunnel.
    fn tunnel(
        &self,
        proxy: &ProxyEndpoint,
        target: &Target,
        deadline: &Deadline,
    ) -> Result<Hop, FetchError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn direct(&self, target: &Target, deadline: &Deadline) -> Result<Hop, FetchError> {
        (**self).direct(target, deadline)
    }

    fn tunnel(
        &self,
        proxy: &ProxyEndpoint,
        target: &Target,
        deadline: &Deadline,
    ) -> Result<Hop, FetchError> {
        (**self).tunnel(proxy, target, deadline)
    }
}

/// Classify an origin response: 200 yields the body, 3xx the location.
pub(crate) fn classify_response(
    url: &str,
    status: u16,
    location: Option<String>,
    body: impl FnOnce() -> Box<dyn Read>,
) -> Result<Hop, FetchError> {
    trace!("HTTP status {status} for {url}");
    match status {
        200 => Ok(Hop::Body(body())),
        300..=399 => location
            .map(Hop::Redirect)
            .ok_or_else(|| FetchError::MissingLocation {
                url: url.to_owned(),
            }),
        _ => Err(FetchError::HttpStatus {
            url: url.to_owned(),
            status,
        }),
    }
}

/// Opens remote files as byte streams.
#[cfg_attr(test, mockall::automock)]
pub trait RemoteSource {
    /// Open `path` on `host` over HTTPS.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] describing the first failure.
    fn open(&self, host: &str, path: &str) -> Result<Box<dyn Read>, FetchError>;
}

/// Read a whole remote text file.
///
/// # Errors
///
/// Returns the error of [`RemoteSource::open`] or [`FetchError::Io`] when
/// the body cannot be read as UTF-8.
pub fn read_text<S: RemoteSource + ?Sized>(
    source: &S,
    host: &str,
    path: &str,
) -> Result<String, FetchError> {
    let mut body = source.open(host, path)?;
    let mut text = String::new();
    body.read_to_string(&mut text)?;
    Ok(text)
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String>>;

/// The production [`RemoteSource`]: explicit redirect loop over a
/// [`Transport`], with proxy routes re-resolved for every origin host.
pub struct SecureFetcher<T = NetworkTransport> {
    transport: T,
    options: FetchOptions,
    lookup: EnvLookup,
}

impl SecureFetcher {
    /// Fetcher using the network and the process environment.
    #[must_use]
    pub fn new(options: FetchOptions) -> Self {
        Self::with_transport(NetworkTransport::new(), options, |name: &str| {
            std::env::var(name).ok()
        })
    }
}

impl<T: Transport> SecureFetcher<T> {
    /// Fetcher using a custom transport and environment lookup.
    pub fn with_transport<F>(transport: T, options: FetchOptions, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + 'static,
    {
        Self {
            transport,
            options,
            lookup: Box::new(lookup),
        }
    }

    fn route_for(&self, host: &str) -> ProxyRoute {
        proxy::resolve_with(host, |name| (self.lookup)(name))
    }

    fn count_redirect(&self, redirects: &mut u32) -> Result<(), FetchError> {
        if *redirects >= self.options.max_redirects {
            return Err(FetchError::TooManyRedirects {
                limit: self.options.max_redirects,
            });
        }
        *redirects += 1;
        Ok(())
    }
}

impl<T: Transport> RemoteSource for SecureFetcher<T> {
    fn open(&self, host: &str, path: &str) -> Result<Box<dyn Read>, FetchError> {
        let deadline = Deadline::after(self.options.timeout);
        let mut target = Target::https(host, path);
        let mut route = self.route_for(&target.host);
        let mut redirects = 0;
        info!("fetching {}", target.url());

        loop {
            deadline.remaining(&target.url())?;
            let hop = match &route {
                ProxyRoute::Direct => self.transport.direct(&target, &deadline)?,
                ProxyRoute::Via(endpoint) => self.transport.tunnel(endpoint, &target, &deadline)?,
            };
            match hop {
                Hop::Body(body) => {
                    debug!("receiving {} after {redirects} redirect(s)", target.url());
                    return Ok(body);
                }
                Hop::Redirect(location) => {
                    self.count_redirect(&mut redirects)?;
                    target = target.follow(&location)?;
                    route = self.route_for(&target.host);
                    debug!("redirected to {}", target.url());
                }
                Hop::ProxyRedirect(location) => {
                    self.count_redirect(&mut redirects)?;
                    let endpoint = ProxyEndpoint::parse(&location).map_err(|reason| {
                        FetchError::InvalidLocation {
                            location: location.clone(),
                            reason,
                        }
                    })?;
                    debug!("proxy redirected to {endpoint}");
                    route = ProxyRoute::Via(endpoint);
                }
            }
        }
    }
}

/// [`Transport`] over real sockets.
#[derive(Debug, Clone)]
pub struct NetworkTransport {
    agent: ureq::Agent,
}

impl NetworkTransport {
    /// Create a transport with redirects and proxy detection disabled in
    /// the HTTP client, since [`SecureFetcher`] handles both.
    #[must_use]
    pub fn new() -> Self {
        Self {
            agent: direct::agent(),
        }
    }
}

impl Default for NetworkTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for NetworkTransport {
    fn direct(&self, target: &Target, deadline: &Deadline) -> Result<Hop, FetchError> {
        direct::get(&self.agent, target, deadline)
    }

    fn tunnel(
        &self,
        proxy: &ProxyEndpoint,
        target: &Target,
        deadline: &Deadline,
    ) -> Result<Hop, FetchError> {
        match tunnel::connect(proxy, target, deadline)? {
            tunnel::ConnectOutcome::Established(stream) => tls::get(stream, target, deadline),
            tunnel::ConnectOutcome::Redirect(location) => Ok(Hop::ProxyRedirect(location)),
        }
    }
}

#[cfg(test)]
#[path = "fetch_tests.rs"]
mod tests;
