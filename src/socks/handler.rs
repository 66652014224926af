//! SOCKS5 session handler
//!
//! Drives one client connection through negotiation, request decoding,
//! command execution and relaying. Every failure ends the session; nothing
//! is retried.

use super::command::execute;
use super::handshake::{negotiate, MethodPolicy};
use super::relay::RelayStats;
use super::request::read_request;
use super::types::{Reply, Request};
use super::codec::write_reply;
use crate::config::ServerConfig;
use crate::error::Socks5Error;
use crate::transport::Dialer;
use std::fmt;
use std::future::Future;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{info, info_span, warn, Instrument};

/// Step of the session at which a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStage {
    /// Reading the greeting and selecting a method
    Handshaking,
    /// Reading the request
    AwaitingRequest,
    /// Running the command (dial and reply)
    Executing,
    /// Forwarding bytes
    Relaying,
}

impl fmt::Display for SessionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStage::Handshaking => write!(f, "handshake"),
            SessionStage::AwaitingRequest => write!(f, "request"),
            SessionStage::Executing => write!(f, "execute"),
            SessionStage::Relaying => write!(f, "relay"),
        }
    }
}

/// A failed session, tagged with the stage it failed in
#[derive(Error, Debug)]
#[error("SOCKS5 {stage} failed: {source}")]
pub struct SessionError {
    /// Stage the session was in
    pub stage: SessionStage,
    /// What went wrong
    pub source: Socks5Error,
}

impl SessionError {
    /// Tag an error with a stage
    pub fn new(stage: SessionStage, source: Socks5Error) -> Self {
        SessionError { stage, source }
    }
}

/// Per-session settings shared by every connection of a server
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Method selection policy
    pub policy: MethodPolicy,
    /// Limit for negotiation plus request decoding
    pub handshake_timeout: Option<Duration>,
    /// IP advertised in success replies
    pub bind_ip: Option<IpAddr>,
}

impl SessionOptions {
    /// Derive session options from server configuration
    pub fn from_config(config: &ServerConfig) -> Self {
        SessionOptions {
            policy: MethodPolicy::from_strict(config.require_no_auth),
            handshake_timeout: config.handshake_timeout(),
            bind_ip: config.bind_ip,
        }
    }
}

/// Serve one SOCKS5 connection
///
/// The stream is consumed and closed when this returns, on success and on
/// every error path. The session runs inside a `session` span carrying the
/// peer address; its outcome is logged before returning.
pub async fn serve_conn<S, D>(
    stream: S,
    peer: Option<SocketAddr>,
    dialer: &D,
    options: &SessionOptions,
) -> Result<RelayStats, SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    D: Dialer + ?Sized,
{
    let peer_label = peer.map_or_else(|| "unknown".to_string(), |p| p.to_string());
    let span = info_span!("session", peer = %peer_label);

    async move {
        let result = run_session(stream, peer, dialer, options).await;
        match &result {
            Ok(stats) => info!(
                "Session closed, {} bytes up, {} bytes down",
                stats.client_to_upstream, stats.upstream_to_client
            ),
            Err(e) => warn!(stage = %e.stage, "Session failed: {}", e.source),
        }
        result
    }
    .instrument(span)
    .await
}

async fn run_session<S, D>(
    mut stream: S,
    peer: Option<SocketAddr>,
    dialer: &D,
    options: &SessionOptions,
) -> Result<RelayStats, SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    D: Dialer + ?Sized,
{
    let mut stage = SessionStage::Handshaking;

    let accepted = within(options.handshake_timeout, async {
        negotiate(&mut stream, options.policy).await?;
        stage = SessionStage::AwaitingRequest;
        read_request(&mut stream, peer).await
    })
    .await;

    let request: Request = match accepted {
        Ok(request) => request,
        Err(err) => {
            // Only unsupported commands and address types are answered
            if let Some(code) = err.reply_code() {
                if let Err(e) = write_reply(&mut stream, &Reply::failure(code)).await {
                    tracing::debug!("Failed to send {:?} reply: {}", code, e);
                }
            }
            return Err(SessionError::new(stage, err));
        }
    };

    info!("SOCKS5 {} request to {}", request.command, request.destination);

    execute(stream, &request, dialer, options.bind_ip).await
}

async fn within<F, T>(limit: Option<Duration>, fut: F) -> Result<T, Socks5Error>
where
    F: Future<Output = Result<T, Socks5Error>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
            Socks5Error::Io(io::Error::new(
                io::ErrorKind::TimedOut,
                "handshake timed out",
            ))
        })?,
        None => fut.await,
    }
}
