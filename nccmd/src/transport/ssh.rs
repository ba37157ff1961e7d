//! Transport over an external SSH client process.
//!
//! All SSH protocol work is delegated to the system `ssh` binary, driven
//! through `sshpass` for non-interactive password login. The child is asked
//! for the device's NETCONF subsystem channel (`ssh -s netconf`), so the
//! pipes carry raw NETCONF framing and nothing else.

use std::io::Write as _;
use std::process::Stdio;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use log::{debug, trace};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};

use super::Transport;
use super::config::ConnectConfig;
use crate::error::{Result, TransportError};

/// Password helper binary, resolved via PATH (the working directory is
/// prepended so a locally dropped copy wins).
const HELPER: &str = "sshpass";

/// Subsystem requested from the SSH server.
const SUBSYSTEM: &str = "netconf";

/// How a failed connection attempt was classified from the child's stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectFailure {
    /// "refused" seen on stderr - nothing listening at host:port.
    InvalidHostPort(String),
    /// "denied" seen on stderr - authentication rejected.
    InvalidPassword(String),
    /// "disconnect" seen on stderr - server dropped the user.
    InvalidUsername(String),
}

impl std::fmt::Display for ConnectFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidHostPort(line) => write!(f, "Invalid host:port - {line}"),
            Self::InvalidPassword(line) => write!(f, "Invalid password - {line}"),
            Self::InvalidUsername(line) => write!(f, "Invalid username - {line}"),
        }
    }
}

/// Classify one stderr line from the SSH client, first keyword wins.
fn classify_stderr_line(line: &str) -> Option<ConnectFailure> {
    if line.contains("refused") {
        return Some(ConnectFailure::InvalidHostPort(line.to_string()));
    }
    if line.contains("denied") {
        return Some(ConnectFailure::InvalidPassword(line.to_string()));
    }
    if line.contains("disconnect") {
        return Some(ConnectFailure::InvalidUsername(line.to_string()));
    }
    None
}

/// Transport over a supervised `sshpass`/`ssh` child process.
pub struct SshTransport {
    child: Child,
    stdin: ChildStdin,
    stdout: ChildStdout,
    /// Taken once by connection classification.
    stderr: Option<ChildStderr>,
    /// Bytes received from the child but not yet handed out.
    buf: BytesMut,
    connect_timeout: Duration,
}

impl SshTransport {
    /// Spawn the SSH subprocess directed at the device's NETCONF subsystem.
    ///
    /// Host-key checking is disabled and public-key auth is turned off so the
    /// helper-supplied password is always used. Distinguishes a missing
    /// helper binary from other spawn failures.
    pub fn connect(config: &ConnectConfig) -> Result<Self> {
        let mut cmd = Command::new(HELPER);
        cmd.arg("-p")
            .arg(config.password_plain())
            .arg("ssh")
            .arg("-o")
            .arg("PubkeyAuthentication=no")
            .arg("-o")
            .arg("StrictHostKeyChecking=no")
            .arg("-o")
            .arg("UserKnownHostsFile=/dev/null")
            .arg("-o")
            .arg(format!("ConnectTimeout={}", config.connect_timeout.as_secs()))
            .arg("-p")
            .arg(config.port.to_string())
            .arg(config.login())
            .arg("-s")
            .arg(SUBSYSTEM);

        if let Ok(path) = std::env::var("PATH") {
            cmd.env("PATH", format!(".:{path}"));
        }

        debug!("spawning {HELPER} ssh for {}:{}", config.host, config.port);
        Self::spawn(cmd, config.connect_timeout)
    }

    fn spawn(mut cmd: Command, connect_timeout: Duration) -> Result<Self> {
        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TransportError::HelperMissing { program: HELPER.to_string() }
                } else {
                    TransportError::SpawnFailed { program: HELPER.to_string(), source: e }
                }
            })?;

        let stdin = child.stdin.take().expect("child stdin was piped");
        let stdout = child.stdout.take().expect("child stdout was piped");
        let stderr = child.stderr.take();

        Ok(Self {
            child,
            stdin,
            stdout,
            stderr,
            buf: BytesMut::with_capacity(4096),
            connect_timeout,
        })
    }

    /// Wait out the SSH negotiation and classify the outcome.
    ///
    /// Polls process liveness once per second for the connect window, writing
    /// one progress marker per tick. A child still running at the end of the
    /// window is considered connected. A dead child has its stderr drained
    /// and matched against the known failure texts; `None` with a dead child
    /// means the failure could not be classified.
    pub async fn classify_connection(&mut self) -> Result<Option<ConnectFailure>> {
        for _ in 0..self.connect_timeout.as_secs().max(1) {
            tokio::time::sleep(Duration::from_secs(1)).await;
            if !self.is_running() {
                break;
            }
            print!(".");
            std::io::stdout().flush().ok();
        }
        if self.is_running() {
            return Ok(None);
        }

        let Some(stderr) = self.stderr.take() else {
            return Ok(None);
        };
        let mut lines = BufReader::new(stderr).lines();
        while let Some(line) = lines.next_line().await.map_err(TransportError::Io)? {
            debug!("ssh stderr line({line})");
            if let Some(failure) = classify_stderr_line(&line) {
                return Ok(Some(failure));
            }
        }
        Ok(None)
    }

    fn exit_code(&mut self) -> Option<i32> {
        match self.child.try_wait() {
            Ok(Some(status)) => status.code(),
            _ => None,
        }
    }
}

impl Transport for SshTransport {
    async fn read_byte(&mut self, timeout: Duration) -> Result<u8> {
        loop {
            if !self.is_running() {
                let code = self.exit_code();
                return Err(TransportError::Disconnected { code }.into());
            }
            if !self.buf.is_empty() {
                return Ok(self.buf.get_u8());
            }
            let n = tokio::time::timeout(timeout, self.stdout.read_buf(&mut self.buf))
                .await
                .map_err(|_| TransportError::ReadTimeout(timeout))?
                .map_err(TransportError::Io)?;
            if n == 0 {
                // EOF: the child closed its end of the pipe
                let code = self.exit_code();
                return Err(TransportError::Disconnected { code }.into());
            }
            trace!("read {n} bytes from ssh stdout");
        }
    }

    async fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.stdin.write_all(buf).await.map_err(TransportError::Io)?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.stdin.flush().await.map_err(TransportError::Io)?;
        Ok(())
    }

    fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    fn terminate(&mut self) {
        if self.is_running() {
            debug!("terminating ssh child");
            self.child.start_kill().ok();
        }
    }
}
