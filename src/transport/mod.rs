//! Outbound transport for the CONNECT command
//!
//! The [`Dialer`] trait is the seam between the command executor and the
//! network. [`TcpDialer`] is the production implementation; tests plug in
//! their own dialers.

mod tcp;

pub use tcp::TcpDialer;

use crate::config::TcpConfig;
use crate::socks::AddrSpec;
use async_trait::async_trait;
use std::fmt::Debug;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Socket options for TCP connections
#[derive(Debug, Clone)]
pub struct SocketOpts {
    /// Enable TCP_NODELAY
    pub nodelay: bool,
    /// TCP keepalive timeout
    pub keepalive_secs: Option<u64>,
    /// TCP keepalive interval
    pub keepalive_interval: Option<u64>,
}

impl Default for SocketOpts {
    fn default() -> Self {
        SocketOpts::from_tcp_config(&TcpConfig::default())
    }
}

impl SocketOpts {
    /// Create socket options from TCP config
    ///
    /// A zero keepalive time disables keepalive.
    pub fn from_tcp_config(config: &TcpConfig) -> Self {
        let keepalive = config.keepalive_secs > 0;
        SocketOpts {
            nodelay: config.nodelay,
            keepalive_secs: keepalive.then_some(config.keepalive_secs),
            keepalive_interval: keepalive.then_some(config.keepalive_interval),
        }
    }

    /// Apply socket options to a TCP stream
    pub fn apply(&self, stream: &TcpStream) -> io::Result<()> {
        stream.set_nodelay(self.nodelay)?;

        if let (Some(timeout), Some(interval)) = (self.keepalive_secs, self.keepalive_interval) {
            let socket = socket2::SockRef::from(stream);
            let keepalive = socket2::TcpKeepalive::new()
                .with_time(Duration::from_secs(timeout))
                .with_interval(Duration::from_secs(interval));
            socket.set_tcp_keepalive(&keepalive)?;
        }

        Ok(())
    }
}

/// An established outbound connection
#[derive(Debug)]
pub struct Connected<S> {
    /// The upstream stream
    pub stream: S,
    /// Local address of the outbound socket, reported in the success reply
    pub local_addr: SocketAddr,
}

/// Opens outbound connections to request destinations
#[async_trait]
pub trait Dialer: Debug + Send + Sync + 'static {
    /// The stream type produced by this dialer
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + Debug + 'static;

    /// Connect to the destination
    ///
    /// The error kind drives the reply code sent to the client, see
    /// [`DialErrorKind::classify`](crate::error::DialErrorKind::classify).
    async fn dial(&self, target: &AddrSpec) -> io::Result<Connected<Self::Stream>>;
}
