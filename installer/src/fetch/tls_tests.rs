//! Tests for the HTTP exchange run inside a tunnel.

use super::*;
use rstest::rstest;
use std::cell::RefCell;
use std::io::{self, Cursor};
use std::rc::Rc;

/// In-memory peer: replays `response` and records what the client sends.
struct ScriptedPeer {
    response: Cursor<Vec<u8>>,
    sent: Rc<RefCell<Vec<u8>>>,
}

impl ScriptedPeer {
    fn new(response: &[u8]) -> (Self, Rc<RefCell<Vec<u8>>>) {
        let sent = Rc::new(RefCell::new(Vec::new()));
        let peer = Self {
            response: Cursor::new(response.to_vec()),
            sent: Rc::clone(&sent),
        };
        (peer, sent)
    }
}

impl Read for ScriptedPeer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.response.read(buf)
    }
}

impl Write for ScriptedPeer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sent.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn target() -> Target {
    Target::https("github.com", "/oracle/node-oracledb/releases/download/v6.2.0/x.gz")
}

fn body_of(hop: Hop) -> Vec<u8> {
    let Hop::Body(mut body) = hop else {
        panic!("expected a body, got {hop:?}");
    };
    let mut bytes = Vec::new();
    body.read_to_end(&mut bytes).expect("read body");
    bytes
}

#[test]
fn request_is_an_http10_get_with_host_header() {
    let (peer, sent) = ScriptedPeer::new(b"HTTP/1.0 200 OK\r\n\r\n");

    exchange(peer, &target()).expect("exchange");

    let request = String::from_utf8(sent.borrow().clone()).expect("ascii request");
    assert!(request.starts_with(
        "GET /oracle/node-oracledb/releases/download/v6.2.0/x.gz HTTP/1.0\r\nHost: github.com\r\n"
    ));
    assert!(request.contains(&format!("User-Agent: {USER_AGENT}\r\n")));
    assert!(request.ends_with("\r\n\r\n"));
}

#[test]
fn content_length_limits_the_body() {
    let (peer, _) =
        ScriptedPeer::new(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello, trailing bytes");

    let hop = exchange(peer, &target()).expect("exchange");

    assert_eq!(body_of(hop), b"hello");
}

#[test]
fn body_without_length_runs_until_close() {
    let (peer, _) =
        ScriptedPeer::new(b"HTTP/1.0 200 OK\r\nServer: test\r\n\r\nall of the package");

    let hop = exchange(peer, &target()).expect("exchange");

    assert_eq!(body_of(hop), b"all of the package");
}

#[test]
fn redirect_yields_the_location() {
    let (peer, _) = ScriptedPeer::new(
        b"HTTP/1.1 302 Found\r\nLocation: https://objects.example.com/blob\r\n\r\n",
    );

    let hop = exchange(peer, &target()).expect("exchange");

    assert!(
        matches!(hop, Hop::Redirect(ref location) if location == "https://objects.example.com/blob"),
        "unexpected hop {hop:?}"
    );
}

#[test]
fn redirect_without_location_is_rejected() {
    let (peer, _) = ScriptedPeer::new(b"HTTP/1.1 301 Moved Permanently\r\n\r\n");

    let err = exchange(peer, &target()).expect_err("no location");

    assert!(matches!(err, FetchError::MissingLocation { .. }));
}

#[rstest]
#[case::not_found(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n".as_slice(), 404)]
#[case::server_error(b"HTTP/1.0 503 Service Unavailable\r\n\r\n".as_slice(), 503)]
fn other_statuses_are_http_errors(#[case] response: &[u8], #[case] expected: u16) {
    let (peer, _) = ScriptedPeer::new(response);

    let err = exchange(peer, &target()).expect_err("status error");

    assert!(
        matches!(
            err,
            FetchError::HttpStatus { ref url, status }
                if status == expected && *url == target().url()
        ),
        "unexpected error {err:?}"
    );
}

#[rstest]
#[case::closed_inside_head(b"HTTP/1.1 200 OK\r\nContent-Le".as_slice())]
#[case::not_http(b"SSH-2.0-OpenSSH\r\n\r\n".as_slice())]
fn broken_responses_are_io_errors(#[case] response: &[u8]) {
    let (peer, _) = ScriptedPeer::new(response);

    let err = exchange(peer, &target()).expect_err("broken response");

    assert!(matches!(err, FetchError::Io(_)), "unexpected error {err:?}");
}
