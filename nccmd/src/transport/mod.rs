//! SSH subprocess transport layer.
//!
//! This module owns the external SSH client process and its pipes,
//! exposing timeout-bounded byte reads and immediate-flush writes.

pub mod config;
mod ssh;

pub use config::ConnectConfig;
pub use ssh::{ConnectFailure, SshTransport};

use std::future::Future;
use std::time::Duration;

use crate::error::Result;

/// Trait for the byte-stream transport under the framing codecs.
///
/// The production implementation is [`SshTransport`]; the framing codecs and
/// the session are written against this seam so they can run over an
/// in-memory transport in tests.
pub trait Transport: Send {
    /// Read one byte, failing with a disconnect error if the peer process is
    /// gone and a timeout error if no byte arrives within `timeout`.
    ///
    /// The timeout window restarts on every successfully received byte.
    fn read_byte(&mut self, timeout: Duration) -> impl Future<Output = Result<u8>> + Send;

    /// Write all bytes to the peer.
    fn write_all(&mut self, buf: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Flush buffered output so end-of-message markers reach the peer promptly.
    fn flush(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Whether the peer process is still running.
    fn is_running(&mut self) -> bool;

    /// Stop the peer process. No-op if it is already stopped.
    fn terminate(&mut self);
}
