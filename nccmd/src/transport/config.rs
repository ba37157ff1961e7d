//! Connection configuration and URL parsing.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::error::{Result, SessionError};

/// Default NETCONF-over-SSH port (RFC 6242).
pub const DEFAULT_PORT: u16 = 830;

/// Default window for the SSH connect phase.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(7);

/// Default per-read timeout, reset on every received byte.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection parameters for the SSH subprocess transport.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// NETCONF SSH port (default: 830).
    pub port: u16,

    /// Username for authentication.
    pub user: String,

    /// Password, handed to the helper program at spawn time only.
    pub password: SecretString,

    /// Bound on the SSH connect phase.
    pub connect_timeout: Duration,

    /// Bound on each read; the window restarts on every received byte.
    pub read_timeout: Duration,
}

impl ConnectConfig {
    /// Build a config from explicit fields with default timeouts.
    pub fn new(user: impl Into<String>, password: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: SecretString::from(password.into()),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Parse a `user:pass@host[:port]` connection URL.
    ///
    /// The credential part is split on the first `:` and the host part on the
    /// last `@`, so passwords may themselves contain `:` and `@`. An omitted
    /// port defaults to 830.
    pub fn parse_url(url: &str) -> Result<Self> {
        let invalid = || SessionError::InvalidUrl { url: url.to_string() };

        if !url.contains('@') || !url.contains(':') {
            return Err(invalid().into());
        }
        let (credentials, hostport) = url.rsplit_once('@').ok_or_else(invalid)?;
        let (user, password) = credentials.split_once(':').ok_or_else(invalid)?;

        let (host, port) = match hostport.rsplit_once(':') {
            Some((host, port)) => {
                let port: u16 = port.parse().map_err(|_| invalid())?;
                (host, port)
            }
            None => (hostport, DEFAULT_PORT),
        };
        if user.is_empty() || host.is_empty() {
            return Err(invalid().into());
        }

        log::debug!("url parsed - user({user}) host({host}) port({port})");
        Ok(Self::new(user, password, host, port))
    }

    /// The `user@host` argument handed to the SSH client.
    pub fn login(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Expose the password for the spawn boundary.
    pub(crate) fn password_plain(&self) -> &str {
        self.password.expose_secret()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_url() {
        let cfg = ConnectConfig::parse_url("root:toor@localhost:8830").unwrap();
        assert_eq!(cfg.user, "root");
        assert_eq!(cfg.password_plain(), "toor");
        assert_eq!(cfg.host, "localhost");
        assert_eq!(cfg.port, 8830);
    }

    #[test]
    fn omitted_port_defaults_to_830() {
        let cfg = ConnectConfig::parse_url("admin:secret@10.0.0.1").unwrap();
        assert_eq!(cfg.host, "10.0.0.1");
        assert_eq!(cfg.port, 830);
    }

    #[test]
    fn password_may_contain_separators() {
        let cfg = ConnectConfig::parse_url("admin:p:ss@w0rd@device:830").unwrap();
        assert_eq!(cfg.user, "admin");
        assert_eq!(cfg.password_plain(), "p:ss@w0rd");
        assert_eq!(cfg.host, "device");
    }

    #[test]
    fn rejects_url_without_at() {
        assert!(ConnectConfig::parse_url("root:toor:localhost").is_err());
    }

    #[test]
    fn rejects_url_without_colon() {
        assert!(ConnectConfig::parse_url("root@localhost").is_err());
    }

    #[test]
    fn rejects_bad_port() {
        assert!(ConnectConfig::parse_url("root:toor@localhost:clearly-not-a-port").is_err());
    }
}
