//! Container codec for the single-file add-on package.
//!
//! A package is one gzip stream whose decompressed payload is
//! `[header][license][binary]`: the header is the license length as ten
//! zero-padded ASCII decimal digits, followed by the raw license bytes and
//! then the raw binary bytes up to the end of the stream. There is no other
//! framing and no embedded checksum.
//!
//! Decoding routes decompressed chunks through [`ContainerRouter`], a small
//! state machine that makes no assumption about where chunk boundaries fall.

use super::error::{ArtefactError, Result};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use log::{debug, trace};
use std::io::{self, Read, Write};

/// Width of the decimal license-length header in bytes.
pub const LICENSE_HEADER_BYTES: usize = 10;

/// Largest license length the header can represent.
pub const MAX_LICENSE_BYTES: u64 = 9_999_999_999;

/// Size of the read buffer used when pulling decompressed bytes.
const CHUNK_SIZE: usize = 64 * 1024;

/// Byte counts produced by a successful decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeSummary {
    /// Number of license bytes routed to the license sink.
    pub license_bytes: u64,
    /// Number of binary bytes routed to the binary sink.
    pub binary_bytes: u64,
}

/// Format a license length as the fixed-width container header.
///
/// # Errors
///
/// Returns [`ArtefactError::LicenseTooLarge`] when `size` exceeds
/// [`MAX_LICENSE_BYTES`].
///
/// # Examples
///
/// ```
/// use addon_installer::artefact::container::format_header;
///
/// assert_eq!(format_header(18).expect("small size"), *b"0000000018");
/// assert!(format_header(10_000_000_000).is_err());
/// ```
pub fn format_header(size: u64) -> Result<[u8; LICENSE_HEADER_BYTES]> {
    if size > MAX_LICENSE_BYTES {
        return Err(ArtefactError::LicenseTooLarge {
            size,
            width: LICENSE_HEADER_BYTES,
        });
    }
    let text = format!("{size:0width$}", width = LICENSE_HEADER_BYTES);
    let mut header = [0u8; LICENSE_HEADER_BYTES];
    header.copy_from_slice(text.as_bytes());
    Ok(header)
}

/// Parse a complete header back into a license length.
fn parse_header(header: &[u8; LICENSE_HEADER_BYTES]) -> Result<u64> {
    if !header.iter().all(u8::is_ascii_digit) {
        return Err(ArtefactError::InvalidHeader {
            header: String::from_utf8_lossy(header).into_owned(),
        });
    }
    Ok(header
        .iter()
        .fold(0u64, |acc, digit| acc * 10 + u64::from(*digit - b'0')))
}

/// Encode a license and a binary into a gzip-compressed container.
///
/// The license is read fully to learn its length; the binary is streamed
/// straight into the compressor. Returns the inner writer once the gzip
/// trailer has been written.
///
/// # Errors
///
/// Returns [`ArtefactError::LicenseTooLarge`] if the license cannot be
/// described by the header, or [`ArtefactError::Io`] when reading an input
/// or writing the output fails.
///
/// # Examples
///
/// ```
/// use addon_installer::artefact::container::{decode, encode};
///
/// let package = encode(&b"MIT"[..], &b"\x7fELF"[..], Vec::new()).expect("encode");
/// let mut license = Vec::new();
/// let mut binary = Vec::new();
/// decode(package.as_slice(), &mut license, &mut binary).expect("decode");
/// assert_eq!(license, b"MIT");
/// assert_eq!(binary, b"\x7fELF");
/// ```
pub fn encode<L, B, W>(mut license: L, mut binary: B, out: W) -> Result<W>
where
    L: Read,
    B: Read,
    W: Write,
{
    let mut license_bytes = Vec::new();
    license.read_to_end(&mut license_bytes)?;
    let header = format_header(license_bytes.len() as u64)?;
    trace!("encoding container with {} license bytes", license_bytes.len());

    let mut encoder = GzEncoder::new(out, Compression::default());
    encoder.write_all(&header)?;
    encoder.write_all(&license_bytes)?;
    let binary_bytes = io::copy(&mut binary, &mut encoder)?;
    debug!("encoded container: license={} binary={binary_bytes}", license_bytes.len());
    Ok(encoder.finish()?)
}

/// Decode a gzip-compressed container into a license sink and a binary sink.
///
/// Pass [`io::sink()`] as `license` to discard the license. Both sinks are
/// flushed once after the stream has been fully routed and are dropped when
/// the call returns, whatever the outcome.
///
/// # Errors
///
/// Returns [`ArtefactError::Io`] on decompression or sink failures and the
/// format variants described on [`ContainerRouter::finish`] for malformed
/// containers.
pub fn decode<R, L, B>(compressed: R, license: L, binary: B) -> Result<DecodeSummary>
where
    R: Read,
    L: Write,
    B: Write,
{
    route_plaintext(GzDecoder::new(compressed), license, binary)
}

/// Route an already-decompressed container payload into the two sinks.
///
/// This is the second half of [`decode`], exposed so callers holding a
/// plaintext stream can reuse the routing rules.
///
/// # Errors
///
/// See [`decode`].
pub fn route_plaintext<R, L, B>(mut plaintext: R, license: L, binary: B) -> Result<DecodeSummary>
where
    R: Read,
    L: Write,
    B: Write,
{
    let mut router = ContainerRouter::new(license, binary);
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let read = match plaintext.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        router.route(&buffer[..read])?;
    }
    router.finish()
}

/// Routing state of a [`ContainerRouter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RouteState {
    /// Collecting the fixed-width header; `filled` bytes are buffered.
    AwaitingHeader {
        buffer: [u8; LICENSE_HEADER_BYTES],
        filled: usize,
    },
    /// Forwarding license bytes; `remaining` are still expected.
    WritingLicense { remaining: u64 },
    /// Forwarding everything else to the binary sink.
    WritingBinary,
}

/// Streaming demultiplexer for decompressed container bytes.
///
/// Chunks may be split anywhere, including inside the header. License bytes
/// are always fully routed before the first binary byte.
#[derive(Debug)]
pub struct ContainerRouter<L, B> {
    state: RouteState,
    license_sink: L,
    binary_sink: B,
    license_size: u64,
    license_written: u64,
    binary_written: u64,
}

impl<L: Write, B: Write> ContainerRouter<L, B> {
    /// Create a router that writes into the given sinks.
    #[must_use]
    pub fn new(license_sink: L, binary_sink: B) -> Self {
        Self {
            state: RouteState::AwaitingHeader {
                buffer: [0u8; LICENSE_HEADER_BYTES],
                filled: 0,
            },
            license_sink,
            binary_sink,
            license_size: 0,
            license_written: 0,
            binary_written: 0,
        }
    }

    /// Route one decompressed chunk.
    ///
    /// # Errors
    ///
    /// Returns [`ArtefactError::InvalidHeader`] once a complete header is
    /// not a decimal number, or [`ArtefactError::Io`] if a sink fails.
    pub fn route(&mut self, mut chunk: &[u8]) -> Result<()> {
        while !chunk.is_empty() {
            chunk = match self.state {
                RouteState::AwaitingHeader { buffer, filled } => {
                    self.fill_header(buffer, filled, chunk)?
                }
                RouteState::WritingLicense { remaining } => self.write_license(remaining, chunk)?,
                RouteState::WritingBinary => {
                    self.binary_sink.write_all(chunk)?;
                    self.binary_written += chunk.len() as u64;
                    &[]
                }
            };
        }
        Ok(())
    }

    /// Complete routing, check the terminal state, and flush both sinks.
    ///
    /// # Errors
    ///
    /// Returns [`ArtefactError::TruncatedHeader`] if the stream ended inside
    /// the header, [`ArtefactError::TruncatedLicense`] if it ended before the
    /// declared license length, or [`ArtefactError::Io`] if a flush fails.
    pub fn finish(mut self) -> Result<DecodeSummary> {
        match self.state {
            RouteState::AwaitingHeader { filled, .. } => {
                return Err(ArtefactError::TruncatedHeader { seen: filled });
            }
            RouteState::WritingLicense { .. } => {
                return Err(ArtefactError::TruncatedLicense {
                    expected: self.license_size,
                    written: self.license_written,
                });
            }
            RouteState::WritingBinary => {}
        }
        self.license_sink.flush()?;
        self.binary_sink.flush()?;
        debug!(
            "decoded container: license={} binary={}",
            self.license_written, self.binary_written
        );
        Ok(DecodeSummary {
            license_bytes: self.license_written,
            binary_bytes: self.binary_written,
        })
    }

    fn fill_header<'a>(
        &mut self,
        mut buffer: [u8; LICENSE_HEADER_BYTES],
        filled: usize,
        chunk: &'a [u8],
    ) -> Result<&'a [u8]> {
        let take = chunk.len().min(LICENSE_HEADER_BYTES - filled);
        let (head, rest) = chunk.split_at(take);
        if let Some(slot) = buffer.get_mut(filled..filled + take) {
            slot.copy_from_slice(head);
        }
        let filled = filled + take;
        if filled < LICENSE_HEADER_BYTES {
            self.state = RouteState::AwaitingHeader { buffer, filled };
            return Ok(rest);
        }

        self.license_size = parse_header(&buffer)?;
        trace!("container header declares {} license bytes", self.license_size);
        self.state = if self.license_size == 0 {
            RouteState::WritingBinary
        } else {
            RouteState::WritingLicense {
                remaining: self.license_size,
            }
        };
        Ok(rest)
    }

    fn write_license<'a>(&mut self, remaining: u64, chunk: &'a [u8]) -> Result<&'a [u8]> {
        let take = usize::try_from(remaining).map_or(chunk.len(), |r| r.min(chunk.len()));
        let (head, rest) = chunk.split_at(take);
        self.license_sink.write_all(head)?;
        self.license_written += take as u64;

        let remaining = remaining - take as u64;
        self.state = if remaining == 0 {
            RouteState::WritingBinary
        } else {
            RouteState::WritingLicense { remaining }
        };
        Ok(rest)
    }
}

#[cfg(test)]
#[path = "container_tests.rs"]
mod tests;
