//! Server configuration types
//!
//! Defines the main configuration structures for the SOCKS5 server.

use super::TcpConfig;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Default listen address
fn default_listen_addr() -> String {
    "127.0.0.1:1080".to_string()
}

/// Default connect timeout in seconds
fn default_connect_timeout() -> u64 {
    10
}

/// Root configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// SOCKS5 server configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Address the listener binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// IP advertised in success replies instead of the outbound socket's IP
    #[serde(default)]
    pub bind_ip: Option<IpAddr>,

    /// Reject clients that do not offer the no-auth method
    #[serde(default)]
    pub require_no_auth: bool,

    /// Negotiation and request timeout in seconds (0 disables)
    #[serde(default)]
    pub handshake_timeout: u64,

    /// Outbound connect timeout in seconds (0 disables)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Socket options for accepted and dialed connections
    #[serde(default)]
    pub tcp: TcpConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            bind_ip: None,
            require_no_auth: false,
            handshake_timeout: 0,
            connect_timeout: default_connect_timeout(),
            tcp: TcpConfig::default(),
        }
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl ServerConfig {
    /// Handshake timeout, if enabled
    pub fn handshake_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.handshake_timeout)
    }

    /// Connect timeout, if enabled
    pub fn connect_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.connect_timeout)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.listen_addr
            .parse::<SocketAddr>()
            .map(|_| ())
            .map_err(|e| format!("Invalid listen_addr {:?}: {}", self.listen_addr, e))
    }
}
