//! # nccmd
//!
//! Async NETCONF client over an external SSH subprocess.
//!
//! nccmd drives `sshpass` + `ssh -s netconf` as a supervised child process
//! and speaks both NETCONF framings on its pipes: end-of-message (1.0,
//! `]]>]]>`) for the HELLO handshake and chunked (1.1, `#len` headers) for
//! every RPC after it. Request templates support `${TOKEN}` substitution,
//! every exchange reports byte and timing metrics, and a small script
//! runner sequences whole request/response conversations including loops.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nccmd::Session;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), nccmd::Error> {
//!     let mut session = Session::from_url("admin:secret@192.168.1.1:830")?;
//!     if let Some(failure) = session.connect().await? {
//!         eprintln!("connect failed: {failure}");
//!         return Ok(());
//!     }
//!
//!     let hello = session.hello().await;
//!     println!("session-id {}", hello.status);
//!
//!     let reply = session.request("<rpc message-id=\"${TIMESTAMP}\" \
//!         xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\"><get-config>\
//!         <source><running/></source></get-config></rpc>").await;
//!     println!("{}", reply.body.unwrap_or_default());
//!
//!     session.close_session().await;
//!     session.terminate();
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod frame;
pub mod script;
pub mod session;
pub mod transport;

// Re-export main types for convenience
pub use error::{Error, Result, ScriptError, SessionError, TransportError};
pub use script::{ScriptRunner, Step};
pub use session::{Exchange, ExchangeTotals, Session, VarTable};
pub use transport::{ConnectConfig, ConnectFailure, SshTransport, Transport};
