//! SOCKS5 wire codec
//!
//! Decoders read exactly the number of bytes the framing calls for and
//! nothing more. Encoders build complete frames in a buffer so each message
//! goes out in a single write.
//!
//! ```text
//! Greeting:  VER | NMETHODS | METHODS...
//! Request:   VER | CMD | RSV | ATYP | DST.ADDR | DST.PORT
//! Reply:     VER | REP | RSV | ATYP | BND.ADDR | BND.PORT
//! ```

use super::consts::*;
use super::types::{AddrSpec, AddrType, Command, Reply};
use crate::error::Socks5Error;
use bytes::{BufMut, BytesMut};
use std::net::{Ipv4Addr, Ipv6Addr};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

type Result<T> = std::result::Result<T, Socks5Error>;

async fn read_bytes<R, const N: usize>(reader: &mut R, what: &str) -> Result<[u8; N]>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; N];
    reader
        .read_exact(&mut buf)
        .await
        .map_err(|e| Socks5Error::from_read(e, what))?;
    Ok(buf)
}

fn check_version(version: u8) -> Result<()> {
    if version != SOCKS5_VERSION {
        return Err(Socks5Error::ProtocolVersionMismatch(version));
    }
    Ok(())
}

/// Read the client greeting and return the offered method ids
///
/// Exactly `NMETHODS` method bytes are consumed; their values are not
/// interpreted here.
pub async fn read_greeting<R>(reader: &mut R) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let [version] = read_bytes::<_, 1>(reader, "greeting version").await?;
    check_version(version)?;

    let [num_methods] = read_bytes::<_, 1>(reader, "method count").await?;
    let mut methods = vec![0u8; num_methods as usize];
    reader
        .read_exact(&mut methods)
        .await
        .map_err(|e| Socks5Error::from_read(e, "method list"))?;

    Ok(methods)
}

/// Read the fixed request header `VER CMD RSV ATYP`
///
/// The version is checked first, then the command, then the address type.
pub async fn read_request_header<R>(reader: &mut R) -> Result<(Command, AddrType)>
where
    R: AsyncRead + Unpin,
{
    let [version, cmd, _reserved, atyp] = read_bytes::<_, 4>(reader, "request header").await?;
    check_version(version)?;

    let command = Command::from_byte(cmd).ok_or(Socks5Error::UnsupportedCommand(cmd))?;
    let addr_type = AddrType::from_byte(atyp).ok_or(Socks5Error::UnrecognizedAddrType(atyp))?;

    Ok((command, addr_type))
}

/// Read an address body of the given type followed by its port
pub async fn read_addr_spec<R>(reader: &mut R, addr_type: AddrType) -> Result<AddrSpec>
where
    R: AsyncRead + Unpin,
{
    let addr = match addr_type {
        AddrType::Ipv4 => {
            let octets = read_bytes::<_, 4>(reader, "IPv4 address").await?;
            let port = read_port(reader).await?;
            AddrSpec::Ipv4(Ipv4Addr::from(octets), port)
        }
        AddrType::Ipv6 => {
            let octets = read_bytes::<_, 16>(reader, "IPv6 address").await?;
            let port = read_port(reader).await?;
            AddrSpec::Ipv6(Ipv6Addr::from(octets), port)
        }
        AddrType::Domain => {
            let [len] = read_bytes::<_, 1>(reader, "domain length").await?;
            let mut name = vec![0u8; len as usize];
            reader
                .read_exact(&mut name)
                .await
                .map_err(|e| Socks5Error::from_read(e, "domain name"))?;
            let port = read_port(reader).await?;
            let name = String::from_utf8(name)
                .map_err(|_| Socks5Error::MalformedFrame("domain name is not UTF-8".to_string()))?;
            AddrSpec::Domain(name, port)
        }
    };

    Ok(addr)
}

/// Read an `ATYP ADDR PORT` sequence
pub async fn read_address<R>(reader: &mut R) -> Result<AddrSpec>
where
    R: AsyncRead + Unpin,
{
    let [atyp] = read_bytes::<_, 1>(reader, "address type").await?;
    let addr_type = AddrType::from_byte(atyp).ok_or(Socks5Error::UnrecognizedAddrType(atyp))?;
    read_addr_spec(reader, addr_type).await
}

async fn read_port<R>(reader: &mut R) -> Result<u16>
where
    R: AsyncRead + Unpin,
{
    let port = read_bytes::<_, 2>(reader, "port").await?;
    Ok(u16::from_be_bytes(port))
}

impl AddrSpec {
    /// Append `ATYP ADDR PORT` to `buf`
    pub fn encode(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_u8(self.addr_type().to_byte());
        match self {
            AddrSpec::Ipv4(ip, _) => buf.put_slice(&ip.octets()),
            AddrSpec::Ipv6(ip, _) => buf.put_slice(&ip.octets()),
            AddrSpec::Domain(name, _) => {
                if name.len() > MAX_DOMAIN_LEN {
                    return Err(Socks5Error::MalformedFrame(format!(
                        "domain name too long: {} bytes",
                        name.len()
                    )));
                }
                buf.put_u8(name.len() as u8);
                buf.put_slice(name.as_bytes());
            }
        }
        buf.put_u16(self.port());
        Ok(())
    }

    /// Encode into a fresh buffer
    pub fn to_bytes(&self) -> Result<BytesMut> {
        let mut buf = BytesMut::with_capacity(4 + MAX_DOMAIN_LEN);
        self.encode(&mut buf)?;
        Ok(buf)
    }
}

/// Encode a reply frame
pub fn encode_reply(reply: &Reply) -> Result<BytesMut> {
    let mut buf = BytesMut::with_capacity(22);
    buf.put_u8(SOCKS5_VERSION);
    buf.put_u8(reply.code.into());
    buf.put_u8(SOCKS5_RESERVED);
    reply.bind.encode(&mut buf)?;
    Ok(buf)
}

/// Encode and send a reply, flushing the stream
pub async fn write_reply<W>(writer: &mut W, reply: &Reply) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_reply(reply)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Send the method selection message `VER METHOD`
pub async fn write_method_selection<W>(writer: &mut W, method: u8) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&[SOCKS5_VERSION, method]).await?;
    writer.flush().await?;
    Ok(())
}
