//! HTTPS requests over an established `CONNECT` tunnel.

use super::tunnel::{parse_head, read_head};
use super::{Deadline, FetchError, Hop, Target, classify_response};
use log::trace;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};
use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;

const USER_AGENT: &str = concat!("addon-installer/", env!("CARGO_PKG_VERSION"));

fn client_config(host: &str) -> Result<Arc<ClientConfig>, FetchError> {
    let roots = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    let config = ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|err| FetchError::Tls {
        host: host.to_owned(),
        reason: err.to_string(),
    })?
    .with_root_certificates(roots)
    .with_no_client_auth();
    Ok(Arc::new(config))
}

/// Send a GET for `target` over TLS on `stream` and classify the response.
pub(crate) fn get(
    stream: TcpStream,
    target: &Target,
    deadline: &Deadline,
) -> Result<Hop, FetchError> {
    let url = target.url();
    let remaining = deadline.remaining(&url)?;
    stream.set_read_timeout(Some(remaining))?;
    stream.set_write_timeout(Some(remaining))?;

    let server_name = ServerName::try_from(target.host.clone()).map_err(|err| FetchError::Tls {
        host: target.host.clone(),
        reason: err.to_string(),
    })?;
    let connection =
        ClientConnection::new(client_config(&target.host)?, server_name).map_err(|err| {
            FetchError::Tls {
                host: target.host.clone(),
                reason: err.to_string(),
            }
        })?;
    exchange(StreamOwned::new(connection, stream), target)
}

/// Run one HTTP/1.0 GET for `target` over an already secured `stream`.
///
/// HTTP/1.0 keeps the body delimited by `Content-Length` or by the server
/// closing the connection, so no chunked decoding is needed.
pub(crate) fn exchange<S>(mut stream: S, target: &Target) -> Result<Hop, FetchError>
where
    S: Read + Write + 'static,
{
    let url = target.url();
    trace!("GET {url} (tunneled)");
    stream
        .write_all(request_head(target).as_bytes())
        .and_then(|()| stream.flush())
        .map_err(|err| FetchError::from_socket(err, &url))?;

    let head = read_head(&mut stream).map_err(|err| FetchError::from_socket(err, &url))?;
    let head = parse_head(&head)?;
    classify_response(&url, head.status, head.location, move || {
        match head.content_length {
            Some(length) => Box::new(stream.take(length)) as Box<dyn Read>,
            None => Box::new(stream),
        }
    })
}

fn request_head(target: &Target) -> String {
    format!(
        "GET {} HTTP/1.0\r\nHost: {}\r\nUser-Agent: {USER_AGENT}\r\nAccept: */*\r\n\r\n",
        target.path, target.host
    )
}

#[cfg(test)]
#[path = "tls_tests.rs"]
mod tests;
