//! NETCONF session management.
//!
//! A [`Session`] owns the connection parameters, the transport to the SSH
//! subprocess and the token-substitution table, and sequences the HELLO,
//! RPC, COMMIT and CLOSE-SESSION exchanges. Operation failures are captured
//! into the session's last-error text and surfaced as degraded [`Exchange`]
//! results; only URL and spawn failures during `connect()` are fatal.

mod exchange;
mod vars;
pub mod xml;

pub use exchange::{Exchange, ExchangeTotals, format_count, format_duration};
pub use vars::VarTable;
pub use xml::{XMLNS, find_text, find_text_in_file, status_of};

use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;

use log::{debug, error};

use crate::error::{Result, SessionError, TransportError};
use crate::frame::{v10, v11};
use crate::transport::{ConnectConfig, ConnectFailure, SshTransport, Transport};

/// Session lifecycle. There is no reconnection; a new session is
/// constructed per connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Disconnected,
    Connected,
    Terminated,
}

/// Capability advertisement sent by [`Session::hello`].
fn hello_document() -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<hello xmlns="{XMLNS}">
<capabilities><capability>urn:ietf:params:netconf:base:1.1</capability>
<capability>urn:ietf:params:xml:ns:yang:ietf-netconf-monitoring</capability>
<capability>urn:ietf:params:netconf:capability:candidate:1.0</capability>
<capability>urn:ietf:params:netconf:capability:rollback-on-error:1.0</capability>
<capability>urn:ietf:params:netconf:capability:validate:1.1</capability>
<capability>urn:ietf:params:netconf:capability:confirmed-commit:1.1</capability>
</capabilities>
</hello>"#
    )
}

/// Minimal RPC envelope for the built-in operations.
fn rpc_envelope(operation: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<rpc message-id="${{TIMESTAMP}}" xmlns="{XMLNS}">
<{operation}/>
</rpc>"#
    )
}

/// A NETCONF client session over one transport.
///
/// The handshake always uses 1.0 framing; every subsequent RPC always uses
/// 1.1 chunked framing. There is no capability negotiation.
///
/// Sessions are single-flow: a send is always immediately followed by its
/// paired receive, and no two operations run concurrently.
pub struct Session<T: Transport = SshTransport> {
    config: ConnectConfig,
    transport: Option<T>,
    state: SessionState,
    vars: VarTable,
    last_error: String,
}

impl<T: Transport> Session<T> {
    /// Build a session over an already-connected transport.
    ///
    /// The production path is [`Session::connect`]; this seam exists for
    /// custom transports and tests.
    pub fn over(config: ConnectConfig, transport: T) -> Self {
        Self {
            config,
            transport: Some(transport),
            state: SessionState::Connected,
            vars: VarTable::new(),
            last_error: String::new(),
        }
    }

    /// Set a substitution variable by bare name.
    pub fn set_variable(&mut self, name: &str, value: impl Into<String>) {
        self.vars.set(name, value);
    }

    /// Look up a substitution variable by bare name.
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.vars.get(name)
    }

    /// Most recent operation error text, empty when the last operation
    /// succeeded.
    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    /// Whether the session has a live transport.
    pub fn is_connected(&mut self) -> bool {
        self.state == SessionState::Connected
            && self.transport.as_mut().is_some_and(|t| t.is_running())
    }

    /// Stop the transport. Safe to call multiple times.
    pub fn terminate(&mut self) {
        if let Some(transport) = self.transport.as_mut() {
            transport.terminate();
        }
        self.state = SessionState::Terminated;
    }

    /// Perform the HELLO handshake with the built-in capability document.
    ///
    /// The returned exchange carries the peer's session-id in `status`,
    /// `"-"` when the response was absent or unparseable.
    pub async fn hello(&mut self) -> Exchange {
        self.last_error.clear();
        let mut ex = Exchange::default();
        if let Err(e) = self.hello_inner(&mut ex).await {
            self.capture(&e, "HELLO");
        }
        if ex.status.is_empty() {
            ex.status = "-".to_string();
        }
        ex
    }

    async fn hello_inner(&mut self, ex: &mut Exchange) -> Result<()> {
        let timeout = self.config.read_timeout;
        let transport = self.live_transport()?;

        let start = Instant::now();
        let wire = v10::encode(&hello_document());
        transport.write_all(&wire).await?;
        transport.flush().await?;
        ex.bytes_sent = wire.len() as u64;
        ex.send_elapsed = start.elapsed();

        let start = Instant::now();
        let (body, bytes) = v10::recv(transport, timeout).await?;
        ex.bytes_recv = bytes;
        ex.recv_elapsed = start.elapsed();
        ex.status = xml::find_text(&body, "session-id").unwrap_or_else(|| "-".to_string());
        ex.body = Some(body);
        Ok(())
    }

    /// Perform the HELLO handshake from a caller-provided document file,
    /// persisting the response when `response` is given.
    pub async fn hello_file(&mut self, request: &Path, response: Option<&Path>) -> Exchange {
        self.last_error.clear();
        let mut ex = Exchange::default();
        if let Err(e) = self.hello_file_inner(request, response, &mut ex).await {
            self.capture(&e, "HELLO");
        }
        ex.status = response
            .and_then(|p| xml::find_text_in_file(p, "session-id"))
            .unwrap_or_else(|| "-".to_string());
        ex
    }

    async fn hello_file_inner(
        &mut self,
        request: &Path,
        response: Option<&Path>,
        ex: &mut Exchange,
    ) -> Result<()> {
        let timeout = self.config.read_timeout;
        let content = std::fs::read_to_string(request).map_err(TransportError::Io)?;
        let transport = self.live_transport()?;

        let start = Instant::now();
        let wire = v10::encode(&content);
        transport.write_all(&wire).await?;
        transport.flush().await?;
        ex.bytes_sent = wire.len() as u64;
        ex.send_elapsed = start.elapsed();

        let start = Instant::now();
        ex.bytes_recv = match response {
            Some(path) => {
                let mut sink = std::fs::File::create(path).map_err(TransportError::Io)?;
                v10::recv_to_sink(transport, timeout, &mut sink).await?
            }
            None => v10::recv_to_sink(transport, timeout, &mut std::io::sink()).await?,
        };
        ex.recv_elapsed = start.elapsed();
        Ok(())
    }

    /// Send one RPC body via 1.1 chunked framing and receive the reply
    /// into memory.
    ///
    /// Tokens are substituted before chunking; `${TIMESTAMP}` is defaulted
    /// to the current Unix time if no caller value exists.
    pub async fn request(&mut self, content: &str) -> Exchange {
        self.last_error.clear();
        let mut ex = Exchange::default();
        if let Err(e) = self.request_inner(content, &mut ex).await {
            self.capture(&e, "RPC");
        }
        ex
    }

    async fn request_inner(&mut self, content: &str, ex: &mut Exchange) -> Result<()> {
        let timeout = self.config.read_timeout;
        self.vars.ensure_timestamp();
        let frame = v11::chunk(&self.vars.substitute(content));
        let transport = self.live_transport()?;

        let start = Instant::now();
        transport.write_all(frame.as_bytes()).await?;
        ex.bytes_sent += frame.len() as u64;
        transport.write_all(v11::TRAILER.as_bytes()).await?;
        transport.flush().await?;
        ex.bytes_sent += v11::TRAILER.len() as u64;
        ex.send_elapsed = start.elapsed();

        let start = Instant::now();
        let (body, read) = v11::recv(transport, timeout).await?;
        ex.bytes_recv = read.bytes;
        ex.recv_elapsed = start.elapsed();
        ex.body = Some(body);
        if let Some(diagnostic) = read.chunk_error {
            self.last_error = diagnostic;
        }
        Ok(())
    }

    /// Send an RPC from a request file, streaming the reply to `response`
    /// (or discarding it when `None`).
    ///
    /// File lines are substituted and chunked one at a time; blank lines
    /// are skipped entirely - neither sent nor counted.
    pub async fn request_file(&mut self, request: &Path, response: Option<&Path>) -> Exchange {
        self.last_error.clear();
        let mut ex = Exchange::default();
        if let Err(e) = self.request_file_inner(request, response, &mut ex).await {
            self.capture(&e, "FILE");
        }
        ex
    }

    async fn request_file_inner(
        &mut self,
        request: &Path,
        response: Option<&Path>,
        ex: &mut Exchange,
    ) -> Result<()> {
        let timeout = self.config.read_timeout;
        self.vars.ensure_timestamp();
        let file = std::fs::File::open(request).map_err(TransportError::Io)?;

        if self.state == SessionState::Terminated {
            return Err(SessionError::Terminated.into());
        }
        let transport = self
            .transport
            .as_mut()
            .ok_or(SessionError::NotConnected)?;

        let start = Instant::now();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(TransportError::Io)?;
            if line.trim().is_empty() {
                continue;
            }
            let frame = v11::chunk(&self.vars.substitute(&line));
            transport.write_all(frame.as_bytes()).await?;
            ex.bytes_sent += frame.len() as u64;
        }
        transport.write_all(v11::TRAILER.as_bytes()).await?;
        transport.flush().await?;
        ex.bytes_sent += v11::TRAILER.len() as u64;
        ex.send_elapsed = start.elapsed();

        let start = Instant::now();
        let read = match response {
            Some(path) => {
                let mut sink = std::fs::File::create(path).map_err(TransportError::Io)?;
                v11::recv_to_sink(transport, timeout, &mut sink).await?
            }
            None => v11::recv_to_sink(transport, timeout, &mut std::io::sink()).await?,
        };
        ex.bytes_recv = read.bytes;
        ex.recv_elapsed = start.elapsed();
        if let Some(diagnostic) = read.chunk_error {
            self.last_error = diagnostic;
        }
        Ok(())
    }

    /// Commit staged candidate-datastore changes.
    pub async fn commit(&mut self) -> Exchange {
        self.rpc_operation("commit").await
    }

    /// Ask the server to close this session.
    pub async fn close_session(&mut self) -> Exchange {
        self.rpc_operation("close-session").await
    }

    async fn rpc_operation(&mut self, operation: &str) -> Exchange {
        debug!("rpc operation <{operation}/>");
        let mut ex = self.request(&rpc_envelope(operation)).await;
        ex.status = xml::status_of(ex.body.as_deref());
        ex
    }

    fn live_transport(&mut self) -> std::result::Result<&mut T, SessionError> {
        if self.state == SessionState::Terminated {
            return Err(SessionError::Terminated);
        }
        self.transport.as_mut().ok_or(SessionError::NotConnected)
    }

    fn capture(&mut self, err: &crate::Error, operation: &str) {
        error!("{operation} failed - {err}");
        self.last_error = err.to_string();
    }
}

impl Session<SshTransport> {
    /// Create a disconnected session from explicit connection parameters.
    pub fn new(config: ConnectConfig) -> Self {
        Self {
            config,
            transport: None,
            state: SessionState::Disconnected,
            vars: VarTable::new(),
            last_error: String::new(),
        }
    }

    /// Create a disconnected session from a `user:pass@host[:port]` URL.
    pub fn from_url(url: &str) -> Result<Self> {
        Ok(Self::new(ConnectConfig::parse_url(url)?))
    }

    /// Spawn the SSH subprocess and wait out the connect phase.
    ///
    /// Spawn failures are fatal and returned as `Err`. A classified
    /// connection failure comes back as `Ok(Some(..))` - the session keeps
    /// the dead transport and the caller decides whether to continue.
    pub async fn connect(&mut self) -> Result<Option<ConnectFailure>> {
        if self.transport.is_some() {
            return Err(SessionError::AlreadyConnected.into());
        }
        let mut transport = SshTransport::connect(&self.config)?;
        let outcome = transport.classify_connection().await?;
        self.transport = Some(transport);
        self.state = SessionState::Connected;
        if let Some(failure) = &outcome {
            self.last_error = failure.to_string();
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::MockTransport;

    fn config() -> ConnectConfig {
        ConnectConfig::new("root", "toor", "localhost", 830)
    }

    fn v10_reply(body: &str) -> Vec<u8> {
        let mut wire = body.as_bytes().to_vec();
        wire.extend_from_slice(b"\n]]>]]>");
        wire
    }

    fn v11_reply(body: &str) -> Vec<u8> {
        format!("#{}\n{}\n##\n", body.len() + 1, body).into_bytes()
    }

    const HELLO_REPLY: &str = r#"<hello xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
<capabilities><capability>urn:ietf:params:netconf:base:1.1</capability></capabilities>
<session-id>3832</session-id>
</hello>"#;

    const OK_REPLY: &str = r#"<rpc-reply xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"><ok/></rpc-reply>"#;

    #[tokio::test]
    async fn hello_extracts_session_id() {
        let transport = MockTransport::with_incoming(&v10_reply(HELLO_REPLY));
        let mut session = Session::over(config(), transport);

        let ex = session.hello().await;
        assert_eq!(ex.status, "3832");
        assert!(session.last_error().is_empty());
        assert!(ex.body.unwrap().contains("session-id"));

        let written = session.transport.as_ref().unwrap().written.clone();
        let sent = String::from_utf8(written).unwrap();
        // The handshake itself always uses 1.0 framing.
        assert!(sent.ends_with("\n]]>]]>"));
        assert!(sent.contains("urn:ietf:params:netconf:capability:confirmed-commit:1.1"));
        // No token substitution on 1.0 sends.
        assert!(!sent.contains('#'));
    }

    #[tokio::test]
    async fn hello_without_session_id_reports_dash() {
        let transport = MockTransport::with_incoming(&v10_reply("<hello/>"));
        let mut session = Session::over(config(), transport);
        let ex = session.hello().await;
        assert_eq!(ex.status, "-");
    }

    #[tokio::test]
    async fn commit_substitutes_timestamp_and_reads_status() {
        let transport = MockTransport::with_incoming(&v11_reply(OK_REPLY));
        let mut session = Session::over(config(), transport);
        session.set_variable("TIMESTAMP", "1700000000");

        let ex = session.commit().await;
        assert_eq!(ex.status, "OK");

        let written = session.transport.as_ref().unwrap().written.clone();
        let sent = String::from_utf8(written).unwrap();
        assert!(sent.contains("message-id=\"1700000000\""));
        assert!(!sent.contains("${TIMESTAMP}"));
        assert!(sent.contains("<commit/>"));
        // RPCs always use chunked framing.
        assert!(sent.starts_with("\n#"));
        assert!(sent.ends_with("\n##\n"));
    }

    #[tokio::test]
    async fn close_session_sends_close_rpc() {
        let transport = MockTransport::with_incoming(&v11_reply(OK_REPLY));
        let mut session = Session::over(config(), transport);

        let ex = session.close_session().await;
        assert_eq!(ex.status, "OK");
        let written = session.transport.as_ref().unwrap().written.clone();
        assert!(String::from_utf8(written).unwrap().contains("<close-session/>"));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_peer_degrades_with_timeout_error() {
        let mut cfg = config();
        cfg.read_timeout = std::time::Duration::from_secs(60);
        let mut session = Session::over(cfg, MockTransport::silent());

        let ex = session.request("<rpc/>").await;
        assert!(ex.body.is_none());
        assert!(session.last_error().contains("timed out"));
        // Send-phase metrics survive the receive failure.
        assert!(ex.bytes_sent > 0);
    }

    #[tokio::test]
    async fn dead_transport_degrades_with_disconnect_error() {
        let mut transport = MockTransport::with_incoming(b"");
        transport.running = false;
        let mut session = Session::over(config(), transport);

        let ex = session.request("<rpc/>").await;
        assert!(ex.body.is_none());
        assert!(session.last_error().contains("disconnected"));
    }

    #[tokio::test]
    async fn terminated_session_refuses_operations() {
        let transport = MockTransport::with_incoming(&v11_reply(OK_REPLY));
        let mut session = Session::over(config(), transport);
        session.terminate();
        session.terminate();

        let ex = session.commit().await;
        assert!(ex.body.is_none());
        assert!(session.last_error().contains("terminated"));
    }

    #[tokio::test]
    async fn request_reports_chunk_diagnostic() {
        // Declared length 3, but an 11-byte line arrives.
        let transport = MockTransport::with_incoming(b"#3\n0123456789\n##\n");
        let mut session = Session::over(config(), transport);

        let ex = session.request("<rpc/>").await;
        assert!(ex.body.is_some());
        assert!(session.last_error().contains("chunking error"));
    }
}
