//! Error types for nccmd.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Main error type for nccmd operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH subprocess transport errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Session-level errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Script runner errors
    #[error("Script error: {0}")]
    Script(#[from] ScriptError),
}

/// Transport layer errors (SSH child process, pipes).
#[derive(Error, Debug)]
pub enum TransportError {
    /// The password helper binary was not found on the search path
    #[error("Helper program '{program}' not found - install sshpass or add it to PATH")]
    HelperMissing { program: String },

    /// The SSH subprocess could not be started
    #[error("Failed to spawn '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The SSH subprocess exited while an operation was in progress
    #[error("NETCONF server disconnected - ssh exit code {code:?}")]
    Disconnected { code: Option<i32> },

    /// No byte arrived within the read timeout window
    #[error("Read timed out - no data for {0:?}")]
    ReadTimeout(Duration),

    /// Pipe I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Session layer errors (connection state, URL format).
#[derive(Error, Debug)]
pub enum SessionError {
    /// Connection URL did not match `user:pass@host[:port]`
    #[error("Invalid url '{url}' - required format is user:pass@host[:port]")]
    InvalidUrl { url: String },

    /// Operation attempted without a live transport
    #[error("Session not connected - call connect() first")]
    NotConnected,

    /// connect() called on a session that already has a transport
    #[error("Session already connected")]
    AlreadyConnected,

    /// Operation attempted after terminate()
    #[error("Session terminated")]
    Terminated,
}

/// Script runner errors (step sequencing).
#[derive(Error, Debug)]
pub enum ScriptError {
    /// A step that needs a session ran before any Connect step
    #[error("Step requires a connection - no Connect step has run")]
    NoSession,

    /// The Connect step failed and the script cannot continue
    #[error("Connect failed - {0}")]
    ConnectFailed(String),
}

/// Result type alias using nccmd's Error.
pub type Result<T> = std::result::Result<T, Error>;
