//! SOCKS5 server
//!
//! Owns the immutable configuration shared by all sessions and runs the
//! accept loop. Every accepted connection is served by its own task.

use crate::config::ServerConfig;
use crate::socks::{serve_conn, RelayStats, SessionError, SessionOptions};
use crate::transport::{Dialer, SocketOpts, TcpDialer};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Pause after a failed accept, so a persistent error (e.g. EMFILE) does
/// not spin the loop
const ACCEPT_ERROR_DELAY: Duration = Duration::from_millis(50);

/// SOCKS5 server
pub struct Server<D: Dialer = TcpDialer> {
    /// Server configuration
    config: ServerConfig,
    /// Outbound dialer shared by all sessions
    dialer: Arc<D>,
    /// Session settings derived from the configuration
    options: Arc<SessionOptions>,
    /// Options applied to accepted sockets
    socket_opts: SocketOpts,
}

impl Server<TcpDialer> {
    /// Create a server that dials destinations over plain TCP
    pub fn new(config: ServerConfig) -> Self {
        let dialer = TcpDialer::from_config(&config);
        Server::with_dialer(config, dialer)
    }
}

impl<D: Dialer> Server<D> {
    /// Create a server with a custom dialer
    pub fn with_dialer(config: ServerConfig, dialer: D) -> Self {
        Server {
            options: Arc::new(SessionOptions::from_config(&config)),
            socket_opts: SocketOpts::from_tcp_config(&config.tcp),
            dialer: Arc::new(dialer),
            config,
        }
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the configured listen address and serve until shutdown
    pub async fn listen_and_serve(&self, shutdown_rx: broadcast::Receiver<bool>) -> Result<()> {
        let listener = TcpListener::bind(&self.config.listen_addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.config.listen_addr))?;

        info!("SOCKS5 server listening on {}", listener.local_addr()?);

        self.serve(listener, shutdown_rx).await
    }

    /// Accept connections from `listener` until a shutdown signal arrives
    ///
    /// Accept errors are logged and the loop keeps going. Sessions already
    /// running are not interrupted by shutdown.
    pub async fn serve(
        &self,
        listener: TcpListener,
        mut shutdown_rx: broadcast::Receiver<bool>,
    ) -> Result<()> {
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => self.spawn_session(stream, peer),
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        tokio::time::sleep(ACCEPT_ERROR_DELAY).await;
                    }
                },
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping listener");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Serve a single connection on the current task
    pub async fn serve_conn<S>(
        &self,
        stream: S,
        peer: Option<SocketAddr>,
    ) -> Result<RelayStats, SessionError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        serve_conn(stream, peer, self.dialer.as_ref(), &self.options).await
    }

    fn spawn_session(&self, stream: TcpStream, peer: SocketAddr) {
        debug!("Accepted connection from {}", peer);

        if let Err(e) = self.socket_opts.apply(&stream) {
            warn!("Failed to apply socket options for {}: {}", peer, e);
        }

        let dialer = self.dialer.clone();
        let options = self.options.clone();
        tokio::spawn(async move {
            // The outcome is logged inside the session span
            let _ = serve_conn(stream, Some(peer), dialer.as_ref(), &options).await;
        });
    }
}
