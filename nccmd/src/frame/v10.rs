//! NETCONF 1.0 end-of-message framing.

use std::io;
use std::time::Duration;

use crate::error::{Result, TransportError};
use crate::transport::Transport;

use super::read_frame_line;

/// End-of-message marker for the 1.0 wire format.
pub const EOM: &str = "]]>]]>";

/// Encode a payload for the 1.0 wire format.
///
/// The payload goes out verbatim, followed by a newline and the marker.
/// No token substitution happens here - only 1.1 sends substitute tokens.
pub fn encode(payload: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + EOM.len() + 1);
    out.extend_from_slice(payload.as_bytes());
    out.extend_from_slice(b"\n");
    out.extend_from_slice(EOM.as_bytes());
    out
}

/// Receive one 1.0-framed message, feeding each body line to `on_line`.
///
/// Returns the byte count, which includes the terminator line.
pub async fn recv_with<T, F>(transport: &mut T, timeout: Duration, mut on_line: F) -> Result<u64>
where
    T: Transport,
    F: FnMut(&[u8]) -> io::Result<()>,
{
    let mut bytes = 0u64;
    loop {
        let line = read_frame_line(transport, EOM.as_bytes(), timeout).await?;
        bytes += line.len() as u64;
        if line[..] == *EOM.as_bytes() {
            break;
        }
        on_line(&line).map_err(TransportError::Io)?;
    }
    Ok(bytes)
}

/// Receive one 1.0-framed message into a string body.
pub async fn recv<T: Transport>(transport: &mut T, timeout: Duration) -> Result<(String, u64)> {
    let mut body = Vec::new();
    let bytes = recv_with(transport, timeout, |line| {
        body.extend_from_slice(line);
        Ok(())
    })
    .await?;
    Ok((String::from_utf8_lossy(&body).into_owned(), bytes))
}

/// Receive one 1.0-framed message into a sink, framing stripped.
pub async fn recv_to_sink<T, W>(transport: &mut T, timeout: Duration, sink: &mut W) -> Result<u64>
where
    T: Transport,
    W: io::Write,
{
    recv_with(transport, timeout, |line| sink.write_all(line)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::MockTransport;

    const TIMEOUT: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn round_trip_reproduces_payload() {
        let payload = "<hello xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\">\n<capabilities/>\n</hello>";
        let wire = encode(payload);
        assert!(wire.ends_with(b"\n]]>]]>"));

        let mut t = MockTransport::with_incoming(&wire);
        let (body, bytes) = recv(&mut t, TIMEOUT).await.unwrap();
        // The encoder's trailing newline stays with the body; the marker does not.
        assert_eq!(body, format!("{payload}\n"));
        assert_eq!(bytes, wire.len() as u64);
    }

    #[tokio::test]
    async fn byte_count_includes_terminator_line() {
        let mut t = MockTransport::with_incoming(b"ab\n]]>]]>");
        let (body, bytes) = recv(&mut t, TIMEOUT).await.unwrap();
        assert_eq!(body, "ab\n");
        assert_eq!(bytes, 9);
    }

    #[tokio::test]
    async fn sink_receives_body_without_marker() {
        let mut t = MockTransport::with_incoming(b"<x/>\n]]>]]>");
        let mut sink = Vec::new();
        let bytes = recv_to_sink(&mut t, TIMEOUT, &mut sink).await.unwrap();
        assert_eq!(sink, b"<x/>\n");
        assert_eq!(bytes, 11);
    }
}
