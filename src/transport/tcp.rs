//! Plain TCP dialer

use super::{Connected, Dialer, SocketOpts};
use crate::config::ServerConfig;
use crate::socks::AddrSpec;
use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;

/// Dials destinations over TCP, resolving names with the system resolver
#[derive(Debug, Clone)]
pub struct TcpDialer {
    /// Socket options to apply to connections
    socket_opts: SocketOpts,
    /// Limit for resolution plus connection establishment
    connect_timeout: Option<Duration>,
}

impl TcpDialer {
    /// Create a TCP dialer with default options
    pub fn with_defaults() -> Self {
        TcpDialer {
            socket_opts: SocketOpts::default(),
            connect_timeout: Some(Duration::from_secs(10)),
        }
    }

    /// Create a TCP dialer from server configuration
    pub fn from_config(config: &ServerConfig) -> Self {
        TcpDialer {
            socket_opts: SocketOpts::from_tcp_config(&config.tcp),
            connect_timeout: config.connect_timeout(),
        }
    }

    /// Set socket options
    pub fn with_socket_opts(mut self, opts: SocketOpts) -> Self {
        self.socket_opts = opts;
        self
    }

    /// Set connection timeout (`None` waits indefinitely)
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    async fn resolve(target: &AddrSpec) -> io::Result<Vec<SocketAddr>> {
        if let Some(addr) = target.socket_addr() {
            return Ok(vec![addr]);
        }

        let AddrSpec::Domain(name, port) = target else {
            return Ok(Vec::new());
        };

        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((name.as_str(), *port))
            .await
            .map_err(|e| {
                io::Error::new(
                    io::ErrorKind::HostUnreachable,
                    format!("Failed to resolve {}: {}", name, e),
                )
            })?
            .collect();

        if addrs.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::HostUnreachable,
                format!("No addresses found for {}", name),
            ));
        }

        Ok(addrs)
    }

    async fn connect_any(&self, target: &AddrSpec) -> io::Result<TcpStream> {
        let mut last_err = None;

        for addr in Self::resolve(target).await? {
            match TcpStream::connect(addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    tracing::debug!("Connect to {} ({}) failed: {}", target, addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::HostUnreachable, format!("No route to {}", target))
        }))
    }
}

impl Default for TcpDialer {
    fn default() -> Self {
        TcpDialer::with_defaults()
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    type Stream = TcpStream;

    async fn dial(&self, target: &AddrSpec) -> io::Result<Connected<TcpStream>> {
        let stream = match self.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, self.connect_any(target))
                .await
                .map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("Connection timeout to {}", target),
                    )
                })??,
            None => self.connect_any(target).await?,
        };

        if let Err(e) = self.socket_opts.apply(&stream) {
            tracing::warn!("Failed to apply socket options: {}", e);
        }

        let local_addr = stream.local_addr()?;
        tracing::debug!("TCP connection established to {} from {}", target, local_addr);

        Ok(Connected { stream, local_addr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tokio::net::TcpListener;

    #[test]
    fn test_tcp_dialer_with_defaults() {
        let dialer = TcpDialer::with_defaults();
        assert!(dialer.socket_opts.nodelay);
        assert_eq!(dialer.connect_timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_tcp_dialer_from_config() {
        let config = ServerConfig {
            connect_timeout: 0,
            ..Default::default()
        };
        let dialer = TcpDialer::from_config(&config);
        assert!(dialer.connect_timeout.is_none());
    }

    #[tokio::test]
    async fn test_dial_ipv4_literal() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let dialer = TcpDialer::with_defaults();
        let connected = dialer.dial(&AddrSpec::from(addr)).await.unwrap();

        let (_accepted, peer) = listener.accept().await.unwrap();
        assert_eq!(connected.local_addr, peer);
        assert_eq!(connected.stream.peer_addr().unwrap(), addr);
    }

    #[tokio::test]
    async fn test_dial_domain() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let dialer = TcpDialer::with_defaults();
        let target = AddrSpec::Domain("localhost".to_string(), port);
        // localhost may resolve to ::1 first; every address is tried in order
        let connected = dialer.dial(&target).await.unwrap();
        assert_eq!(connected.stream.peer_addr().unwrap().port(), port);
    }

    #[tokio::test]
    async fn test_dial_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dialer = TcpDialer::with_defaults();
        let err = dialer.dial(&AddrSpec::from(addr)).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);
    }

    #[tokio::test]
    async fn test_dial_unresolvable_domain() {
        let dialer = TcpDialer::with_defaults();
        let target = AddrSpec::Domain("this-domain-does-not-exist-12345.invalid".to_string(), 80);
        let err = dialer.dial(&target).await.unwrap_err();
        assert!(matches!(
            err.kind(),
            io::ErrorKind::HostUnreachable | io::ErrorKind::TimedOut
        ));
    }

    #[tokio::test]
    async fn test_dial_unspecified_port_zero_fails() {
        let dialer = TcpDialer::with_defaults().with_connect_timeout(Some(Duration::from_secs(1)));
        let target = AddrSpec::Ipv4(Ipv4Addr::LOCALHOST, 0);
        assert!(dialer.dial(&target).await.is_err());
    }
}
