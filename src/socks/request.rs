//! SOCKS5 request interpreter
//!
//! Decodes the request that follows a successful negotiation.

use super::codec::{read_addr_spec, read_request_header};
use super::types::Request;
use crate::error::Socks5Error;
use std::net::SocketAddr;
use tokio::io::AsyncRead;

/// Read a request from the stream
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// Unknown commands and address types fail before the address body is read.
/// The caller decides whether the failure is answered (see
/// [`Socks5Error::reply_code`]).
pub async fn read_request<S>(
    stream: &mut S,
    remote_addr: Option<SocketAddr>,
) -> Result<Request, Socks5Error>
where
    S: AsyncRead + Unpin,
{
    let (command, addr_type) = read_request_header(stream).await?;
    let destination = read_addr_spec(stream, addr_type).await?;

    tracing::debug!("Parsed SOCKS5 request: {} to {}", command, destination);

    Ok(Request {
        command,
        destination,
        remote_addr,
    })
}
