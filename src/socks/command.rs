//! SOCKS5 command executor
//!
//! Every request that reaches the executor gets exactly one reply from
//! here. Relaying only starts after a success reply has been flushed.

use super::codec::write_reply;
use super::handler::{SessionError, SessionStage};
use super::relay::{relay, RelayStats};
use super::types::{Command, Reply, Request};
use crate::error::{ReplyCode, Socks5Error};
use crate::transport::Dialer;
use std::net::IpAddr;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

/// Execute a decoded request on the client stream
///
/// CONNECT dials the destination, replies, and relays until either side
/// closes. BIND and UDP ASSOCIATE are answered with "command not supported".
/// `bind_ip` replaces the IP of the outbound socket in the success reply.
pub async fn execute<S, D>(
    mut client: S,
    request: &Request,
    dialer: &D,
    bind_ip: Option<IpAddr>,
) -> Result<RelayStats, SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    D: Dialer + ?Sized,
{
    match request.command {
        Command::Connect => {
            let upstream = connect(&mut client, request, dialer, bind_ip)
                .await
                .map_err(|e| SessionError::new(SessionStage::Executing, e))?;

            relay(client, upstream)
                .await
                .map_err(|e| SessionError::new(SessionStage::Relaying, e.into()))
        }
        Command::Bind | Command::UdpAssociate => {
            warn!("{} command not supported", request.command);
            send_failure(&mut client, ReplyCode::CommandNotSupported).await;
            Err(SessionError::new(
                SessionStage::Executing,
                Socks5Error::UnsupportedCommand(request.command.to_byte()),
            ))
        }
    }
}

/// Dial the destination of a CONNECT request and send the reply
///
/// On success the upstream stream is handed back to the caller, which owns
/// it from then on. On failure a classified reply has been sent.
pub async fn connect<S, D>(
    client: &mut S,
    request: &Request,
    dialer: &D,
    bind_ip: Option<IpAddr>,
) -> Result<D::Stream, Socks5Error>
where
    S: AsyncWrite + Unpin,
    D: Dialer + ?Sized,
{
    debug!("Connecting to target: {}", request.destination);

    let connected = match dialer.dial(&request.destination).await {
        Ok(connected) => connected,
        Err(e) => {
            let err = Socks5Error::dial(request.destination.to_string(), e);
            send_failure(client, err.reply_code().unwrap_or(ReplyCode::GeneralFailure)).await;
            return Err(err);
        }
    };

    let mut bound = connected.local_addr;
    if let Some(ip) = bind_ip {
        bound.set_ip(ip);
    }

    write_reply(client, &Reply::success(bound)).await?;

    info!(
        "SOCKS5 tunnel established to {} via {}",
        request.destination, connected.local_addr
    );

    Ok(connected.stream)
}

/// Send a failure reply, logging rather than propagating write errors
///
/// The caller is about to close the connection with a more specific error.
async fn send_failure<S>(client: &mut S, code: ReplyCode)
where
    S: AsyncWrite + Unpin,
{
    if let Err(e) = write_reply(client, &Reply::failure(code)).await {
        debug!("Failed to send {:?} reply: {}", code, e);
    }
}
