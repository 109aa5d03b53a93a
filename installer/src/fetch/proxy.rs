//! Proxy selection from the conventional proxy environment variables.
//!
//! The first non-empty of `https_proxy`, `HTTPS_PROXY`, `http_proxy`,
//! `HTTP_PROXY`, `all_proxy`, and `ALL_PROXY` names the proxy. The first
//! non-empty of `NO_PROXY`, `no_PROXY`, and `no_proxy` lists hosts that are
//! reached directly; `*` disables the proxy for every host.
//!
//! Routes are computed per destination host and never cached, so a redirect
//! to another host re-runs the exclusion rules.

use log::{debug, trace, warn};
use std::fmt;
use url::Url;

/// Proxy variables in priority order.
pub const PROXY_VARIABLES: [&str; 6] = [
    "https_proxy",
    "HTTPS_PROXY",
    "http_proxy",
    "HTTP_PROXY",
    "all_proxy",
    "ALL_PROXY",
];

/// Exclusion variables in priority order.
pub const NO_PROXY_VARIABLES: [&str; 3] = ["NO_PROXY", "no_PROXY", "no_proxy"];

/// Port used when a proxy value names none.
pub const DEFAULT_PROXY_PORT: u16 = 80;

/// An HTTP proxy able to open `CONNECT` tunnels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    /// Proxy host name or address.
    pub host: String,
    /// Proxy TCP port.
    pub port: u16,
}

impl ProxyEndpoint {
    /// Parse a proxy URL such as `proxy.corp`, `proxy.corp:3128`, or
    /// `https://user:pw@proxy.corp:8080`.
    ///
    /// The scheme is optional and ignored. Tunnels are always requested with
    /// a plain-HTTP `CONNECT`, so a missing port is [`DEFAULT_PROXY_PORT`]
    /// for every scheme.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the value is not a URL
    /// with a host.
    ///
    /// # Examples
    ///
    /// ```
    /// use addon_installer::fetch::proxy::ProxyEndpoint;
    ///
    /// let proxy = ProxyEndpoint::parse("proxy.corp:3128").unwrap();
    /// assert_eq!((proxy.host.as_str(), proxy.port), ("proxy.corp", 3128));
    ///
    /// let proxy = ProxyEndpoint::parse("https://proxy.corp").unwrap();
    /// assert_eq!(proxy.port, 80);
    /// ```
    pub fn parse(value: &str) -> Result<Self, String> {
        let authority = value
            .strip_prefix("https://")
            .or_else(|| value.strip_prefix("http://"))
            .unwrap_or(value);
        // Parsed as `http` so an explicit `:443` is kept and `:80` or no
        // port both read back as the default.
        let url = Url::parse(&format!("http://{authority}")).map_err(|err| err.to_string())?;
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| "missing host".to_owned())?;
        let port = url.port().unwrap_or(DEFAULT_PROXY_PORT);
        Ok(Self {
            host: host.trim_start_matches('[').trim_end_matches(']').to_owned(),
            port,
        })
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// How to reach a destination host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyRoute {
    /// Connect to the host directly.
    Direct,
    /// Tunnel through the given proxy.
    Via(ProxyEndpoint),
}

impl ProxyRoute {
    /// Return whether this route goes through a proxy.
    #[must_use]
    pub fn use_proxy(&self) -> bool {
        matches!(self, Self::Via(_))
    }
}

/// Resolve the route to `hostname` from the process environment.
#[must_use]
pub fn resolve(hostname: &str) -> ProxyRoute {
    resolve_with(hostname, |name| std::env::var(name).ok())
}

/// Resolve the route to `hostname` using `lookup` to read variables.
///
/// # Examples
///
/// ```
/// use addon_installer::fetch::proxy::{ProxyRoute, resolve_with};
///
/// let env = |name: &str| match name {
///     "HTTPS_PROXY" => Some("proxy.corp:8080".to_owned()),
///     "no_proxy" => Some("internal.corp, GitHub.com".to_owned()),
///     _ => None,
/// };
/// assert_eq!(resolve_with("github.com", env), ProxyRoute::Direct);
/// assert!(resolve_with("objects.example.com", env).use_proxy());
/// ```
pub fn resolve_with<F>(hostname: &str, lookup: F) -> ProxyRoute
where
    F: Fn(&str) -> Option<String>,
{
    trace!("resolving proxy for {hostname}");
    let Some(candidate) = first_non_empty(&PROXY_VARIABLES, &lookup) else {
        return ProxyRoute::Direct;
    };
    let endpoint = match ProxyEndpoint::parse(&candidate) {
        Ok(endpoint) => endpoint,
        Err(reason) => {
            warn!("ignoring unusable proxy setting {candidate:?}: {reason}");
            return ProxyRoute::Direct;
        }
    };
    if first_non_empty(&NO_PROXY_VARIABLES, &lookup)
        .is_some_and(|exclusions| is_excluded(hostname, &exclusions))
    {
        debug!("{hostname} excluded from proxying");
        return ProxyRoute::Direct;
    }
    debug!("routing {hostname} via proxy {endpoint}");
    ProxyRoute::Via(endpoint)
}

fn first_non_empty<F>(names: &[&str], lookup: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    names
        .iter()
        .filter_map(|name| lookup(name))
        .find(|value| !value.is_empty())
}

fn is_excluded(hostname: &str, exclusions: &str) -> bool {
    if exclusions.trim() == "*" {
        return true;
    }
    exclusions
        .split(',')
        .map(str::trim)
        .any(|entry| entry.eq_ignore_ascii_case(hostname))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    fn via(host: &str, port: u16) -> ProxyRoute {
        ProxyRoute::Via(ProxyEndpoint {
            host: host.to_owned(),
            port,
        })
    }

    #[test]
    fn no_proxy_variables_means_direct() {
        let route = resolve_with("github.com", env(&[]));
        assert_eq!(route, ProxyRoute::Direct);
        assert!(!route.use_proxy());
    }

    #[rstest]
    #[case::lowercase_https_wins(&[("https_proxy", "a:1"), ("HTTPS_PROXY", "b:2")], via("a", 1))]
    #[case::uppercase_https_over_http(&[("HTTPS_PROXY", "b:2"), ("http_proxy", "c:3")], via("b", 2))]
    #[case::http_over_all(&[("HTTP_PROXY", "d:4"), ("all_proxy", "e:5")], via("d", 4))]
    #[case::all_proxy_last(&[("ALL_PROXY", "f:6")], via("f", 6))]
    #[case::empty_value_skipped(&[("https_proxy", ""), ("http_proxy", "g:7")], via("g", 7))]
    fn proxy_variables_follow_priority(
        #[case] pairs: &[(&str, &str)],
        #[case] expected: ProxyRoute,
    ) {
        assert_eq!(resolve_with("github.com", env(pairs)), expected);
    }

    #[rstest]
    #[case::bare_host_defaults_to_80("proxy.corp", 80)]
    #[case::http_scheme_default("http://proxy.corp", 80)]
    #[case::https_scheme_still_defaults_to_80("https://proxy.corp", 80)]
    #[case::explicit_443_is_kept("https://proxy.corp:443", 443)]
    #[case::explicit_80_is_kept("proxy.corp:80", 80)]
    #[case::explicit_port("https://proxy.corp:3128", 3128)]
    #[case::credentials_ignored("http://user:pw@proxy.corp:8080", 8080)]
    fn proxy_url_forms(#[case] value: &str, #[case] port: u16) {
        let route = resolve_with("github.com", env(&[("https_proxy", value)]));
        assert_eq!(route, via("proxy.corp", port));
    }

    #[rstest]
    #[case::wildcard("*", "github.com", true)]
    #[case::case_insensitive_entry("example.org, GITHUB.com", "github.com", true)]
    #[case::case_insensitive_host("github.com", "GitHub.COM", true)]
    #[case::non_matching_host("example.org,internal", "github.com", false)]
    #[case::suffix_is_not_a_match("hub.com", "github.com", false)]
    fn no_proxy_exclusions(#[case] no_proxy: &str, #[case] host: &str, #[case] direct: bool) {
        let route = resolve_with(
            host,
            env(&[("HTTPS_PROXY", "proxy.corp:8080"), ("NO_PROXY", no_proxy)]),
        );
        assert_eq!(route == ProxyRoute::Direct, direct);
    }

    #[test]
    fn first_non_empty_no_proxy_variable_wins() {
        let route = resolve_with(
            "github.com",
            env(&[
                ("https_proxy", "proxy.corp:8080"),
                ("NO_PROXY", ""),
                ("no_PROXY", "example.org"),
                ("no_proxy", "github.com"),
            ]),
        );
        assert_eq!(route, via("proxy.corp", 8080));
    }

    #[test]
    fn unparsable_proxy_resolves_direct() {
        let route = resolve_with("github.com", env(&[("https_proxy", "http://[::1")]));
        assert_eq!(route, ProxyRoute::Direct);
    }

    #[test]
    fn resolve_reads_process_environment() {
        temp_env::with_vars(
            [
                ("https_proxy", Some("env-proxy.corp:9000")),
                ("HTTPS_PROXY", None),
                ("NO_PROXY", Some("internal.corp")),
                ("no_PROXY", None),
                ("no_proxy", None),
            ],
            || {
                assert_eq!(resolve("github.com"), via("env-proxy.corp", 9000));
                assert_eq!(resolve("internal.corp"), ProxyRoute::Direct);
            },
        );
    }
}
