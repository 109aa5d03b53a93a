//! `CONNECT` tunnels through HTTP proxies, and HTTP response heads.
//!
//! The handshake reads the proxy response one byte at a time up to the
//! blank line, so no byte belonging to the tunneled TLS stream is consumed.

use super::proxy::ProxyEndpoint;
use super::{Deadline, FetchError, Target};
use log::{debug, trace};
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

/// Largest response head accepted from a proxy or origin.
const MAX_HEAD_BYTES: usize = 16 * 1024;

/// Headers parsed per response head.
const MAX_HEADERS: usize = 64;

/// What the proxy did with a `CONNECT` request.
#[derive(Debug)]
pub enum ConnectOutcome {
    /// The tunnel is open; the stream now carries bytes to the origin.
    Established(TcpStream),
    /// The proxy redirected the request to this `Location`.
    Redirect(String),
}

/// Parsed status line and the headers the fetcher cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    /// HTTP status code.
    pub status: u16,
    /// `Location` header, if present.
    pub location: Option<String>,
    /// `Content-Length` header, if present and numeric.
    pub content_length: Option<u64>,
}

/// Open a `CONNECT` tunnel to `target` through `proxy`.
///
/// # Errors
///
/// Returns [`FetchError::ProxyStatus`] for statuses other than 2xx and 3xx,
/// [`FetchError::MissingLocation`] for a redirect without a location,
/// [`FetchError::TimedOut`] when the deadline expires, and
/// [`FetchError::Io`] for socket failures or malformed responses.
pub fn connect(
    proxy: &ProxyEndpoint,
    target: &Target,
    deadline: &Deadline,
) -> Result<ConnectOutcome, FetchError> {
    let url = target.url();
    let mut stream = open_socket(proxy, deadline, &url)?;
    let authority = target.authority();
    trace!("CONNECT {authority} via {proxy}");

    let request = format!("CONNECT {authority} HTTP/1.1\r\nHost: {authority}\r\n\r\n");
    stream
        .write_all(request.as_bytes())
        .and_then(|()| stream.flush())
        .map_err(|err| FetchError::from_socket(err, &url))?;

    let head = read_head(&mut stream).map_err(|err| FetchError::from_socket(err, &url))?;
    let head = parse_head(&head)?;
    match head.status {
        200..=299 => {
            debug!("tunnel to {authority} established via {proxy}");
            Ok(ConnectOutcome::Established(stream))
        }
        300..=399 => head
            .location
            .map(ConnectOutcome::Redirect)
            .ok_or_else(|| FetchError::MissingLocation {
                url: proxy.to_string(),
            }),
        status => Err(FetchError::ProxyStatus {
            proxy: proxy.to_string(),
            status,
        }),
    }
}

fn open_socket(
    proxy: &ProxyEndpoint,
    deadline: &Deadline,
    url: &str,
) -> Result<TcpStream, FetchError> {
    let addrs = (proxy.host.as_str(), proxy.port)
        .to_socket_addrs()
        .map_err(|err| FetchError::from_socket(err, url))?;
    let mut last_error = None;
    for addr in addrs {
        let remaining = deadline.remaining(url)?;
        match TcpStream::connect_timeout(&addr, remaining) {
            Ok(stream) => {
                let remaining = deadline.remaining(url)?;
                stream.set_read_timeout(Some(remaining))?;
                stream.set_write_timeout(Some(remaining))?;
                return Ok(stream);
            }
            Err(err) => {
                trace!("connecting to proxy address {addr} failed: {err}");
                last_error = Some(err);
            }
        }
    }
    let err = last_error.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("proxy host {} did not resolve", proxy.host),
        )
    });
    Err(FetchError::from_socket(err, url))
}

/// Read an HTTP response head, up to and including the blank line.
///
/// # Errors
///
/// Returns [`io::ErrorKind::UnexpectedEof`] if the peer closes first and
/// [`io::ErrorKind::InvalidData`] if the head exceeds the size limit.
pub fn read_head<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut head = Vec::with_capacity(256);
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        if head.len() >= MAX_HEAD_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "response head too large",
            ));
        }
        match reader.read(&mut byte) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed inside response head",
                ));
            }
            Ok(_) => head.push(byte[0]),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(head)
}

/// Parse a complete response head.
///
/// # Errors
///
/// Returns [`FetchError::Io`] with [`io::ErrorKind::InvalidData`] when the
/// head is not valid HTTP.
pub fn parse_head(head: &[u8]) -> Result<ResponseHead, FetchError> {
    let invalid = |reason: String| {
        FetchError::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("malformed HTTP response head: {reason}"),
        ))
    };
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut response = httparse::Response::new(&mut headers);
    match response.parse(head) {
        Ok(httparse::Status::Complete(_)) => {}
        Ok(httparse::Status::Partial) => return Err(invalid("incomplete".to_owned())),
        Err(err) => return Err(invalid(err.to_string())),
    }
    let status = response
        .code
        .ok_or_else(|| invalid("missing status".to_owned()))?;
    let header = |name: &str| {
        response
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .and_then(|h| std::str::from_utf8(h.value).ok())
            .map(str::trim)
    };
    Ok(ResponseHead {
        status,
        location: header("location").map(str::to_owned),
        content_length: header("content-length").and_then(|v| v.parse().ok()),
    })
}

#[cfg(test)]
#[path = "tunnel_tests.rs"]
mod tests;
