//! NETCONF 1.1 chunked framing.
//!
//! Outgoing messages are wrapped as `\n#<len>\n<payload>` chunks and closed
//! with `\n##\n`. Incoming streams are decoded line by line against the
//! declared chunk lengths; a received count overrunning the declared length
//! is recorded as a diagnostic but never aborts the decode.

use std::io;
use std::sync::LazyLock;
use std::time::Duration;

use log::{debug, warn};
use regex::Regex;

use crate::error::{Result, TransportError};
use crate::transport::Transport;

use super::read_frame_line;

/// End-of-message line for the 1.1 wire format.
pub const EOM: &str = "##\n";

/// Trailer written after the last chunk of an outgoing message.
pub const TRAILER: &str = "\n##\n";

/// Chunk header: `#` followed by the decimal payload length.
static CHUNK_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#(\d+)\n?$").expect("chunk header pattern"));

/// Wrap one payload as a length-prefixed chunk.
///
/// Trailing whitespace is stripped first; the declared length counts the
/// stripped payload's bytes.
pub fn chunk(payload: &str) -> String {
    let payload = payload.trim_end();
    format!("\n#{}\n{}", payload.len(), payload)
}

/// Parse a chunk-header line, tolerating the trailing newline.
fn parse_chunk_header(line: &[u8]) -> Option<usize> {
    let line = std::str::from_utf8(line).ok()?;
    let captures = CHUNK_HEADER.captures(line)?;
    captures[1].parse().ok()
}

/// Outcome of a chunked receive.
#[derive(Debug, Default)]
pub struct ChunkedRead {
    /// Total bytes received, headers and terminator included.
    pub bytes: u64,

    /// Most recent chunking overrun, if any. Recorded, not raised: servers
    /// that split a chunk at line boundaries keep decoding best-effort.
    pub chunk_error: Option<String>,
}

/// Receive one chunked message, feeding payload lines to `on_payload`.
///
/// Chunk headers and the terminator are consumed and counted but never
/// reach the payload callback.
pub async fn recv_with<T, F>(
    transport: &mut T,
    timeout: Duration,
    mut on_payload: F,
) -> Result<ChunkedRead>
where
    T: Transport,
    F: FnMut(&[u8]) -> io::Result<()>,
{
    let mut read = ChunkedRead::default();
    // Bytes consumed within the current chunk vs. its declared length.
    let mut cnt = 0usize;
    let mut clen = 0usize;

    loop {
        let line = read_frame_line(transport, EOM.as_bytes(), timeout).await?;
        cnt += line.len();
        read.bytes += line.len() as u64;

        // At or past a chunk boundary: expect the terminator or a new header.
        if cnt >= clen {
            if line[..] == *EOM.as_bytes() {
                break;
            }
            if let Some(declared) = parse_chunk_header(&line) {
                debug!("chunk header, len({declared})");
                clen = declared;
                cnt = 0;
                continue;
            }
            if cnt > clen + 1 {
                let msg = format!(
                    "Received chunking error cnt({cnt}) > length({clen}) line: {}",
                    String::from_utf8_lossy(&line).trim_end()
                );
                warn!("{msg}");
                read.chunk_error = Some(msg);
            }
        }
        // Only lines inside a declared chunk are payload.
        if clen > 0 {
            on_payload(&line).map_err(TransportError::Io)?;
        }
    }
    Ok(read)
}

/// Receive one chunked message into a string body.
pub async fn recv<T: Transport>(
    transport: &mut T,
    timeout: Duration,
) -> Result<(String, ChunkedRead)> {
    let mut body = Vec::new();
    let read = recv_with(transport, timeout, |line| {
        body.extend_from_slice(line);
        Ok(())
    })
    .await?;
    Ok((String::from_utf8_lossy(&body).into_owned(), read))
}

/// Receive one chunked message into a sink, framing stripped.
pub async fn recv_to_sink<T, W>(
    transport: &mut T,
    timeout: Duration,
    sink: &mut W,
) -> Result<ChunkedRead>
where
    T: Transport,
    W: io::Write,
{
    recv_with(transport, timeout, |line| sink.write_all(line)).await
}
