//! Line reader shared by both framing decoders.

use std::time::Duration;

use bytes::{BufMut, BytesMut};
use log::trace;

use crate::error::Result;
use crate::transport::Transport;

/// Accumulate bytes into a line, one at a time.
///
/// Stops when a newline byte has been appended, or when the buffer's whole
/// content equals `terminator`. The terminator check runs after every byte,
/// so a terminator is only ever recognized when it owns the buffer from its
/// first character - leading residue turns it into ordinary line content.
/// The returned line includes the trailing newline when one was read.
pub(crate) async fn read_frame_line<T: Transport>(
    transport: &mut T,
    terminator: &[u8],
    timeout: Duration,
) -> Result<BytesMut> {
    let mut line = BytesMut::new();
    loop {
        let byte = transport.read_byte(timeout).await?;
        line.put_u8(byte);
        if byte == b'\n' {
            break;
        }
        if line[..] == *terminator {
            break;
        }
    }
    trace!("line({:?})", String::from_utf8_lossy(&line));
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::MockTransport;

    const TIMEOUT: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn stops_at_newline() {
        let mut t = MockTransport::with_incoming(b"hello\nworld\n");
        let line = read_frame_line(&mut t, b"]]>]]>", TIMEOUT).await.unwrap();
        assert_eq!(&line[..], b"hello\n");
        let line = read_frame_line(&mut t, b"]]>]]>", TIMEOUT).await.unwrap();
        assert_eq!(&line[..], b"world\n");
    }

    #[tokio::test]
    async fn stops_at_exact_terminator() {
        let mut t = MockTransport::with_incoming(b"]]>]]>");
        let line = read_frame_line(&mut t, b"]]>]]>", TIMEOUT).await.unwrap();
        assert_eq!(&line[..], b"]]>]]>");
    }

    #[tokio::test]
    async fn terminator_with_leading_residue_is_not_a_terminator() {
        // The terminator must own the buffer from byte one; with residue in
        // front it reads on until the newline.
        let mut t = MockTransport::with_incoming(b"x]]>]]>\n");
        let line = read_frame_line(&mut t, b"]]>]]>", TIMEOUT).await.unwrap();
        assert_eq!(&line[..], b"x]]>]]>\n");
    }

    #[tokio::test(start_paused = true)]
    async fn silent_transport_times_out() {
        let mut t = MockTransport::silent();
        let err = read_frame_line(&mut t, b"]]>]]>", Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Transport(crate::error::TransportError::ReadTimeout(_))
        ));
    }
}
