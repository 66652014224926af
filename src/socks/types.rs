//! SOCKS5 type definitions
//!
//! Defines the core types used in SOCKS5 protocol handling.

use super::consts::*;
use crate::error::ReplyCode;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// SOCKS5 command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// TCP CONNECT - establish a TCP connection to target
    Connect,
    /// TCP BIND - wait for incoming connection (not served)
    Bind,
    /// UDP ASSOCIATE - establish UDP relay (not served)
    UdpAssociate,
}

impl Command {
    /// Parse a command byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS5_CMD_TCP_CONNECT => Some(Command::Connect),
            SOCKS5_CMD_TCP_BIND => Some(Command::Bind),
            SOCKS5_CMD_UDP_ASSOCIATE => Some(Command::UdpAssociate),
            _ => None,
        }
    }

    /// Convert to the wire byte
    pub fn to_byte(self) -> u8 {
        match self {
            Command::Connect => SOCKS5_CMD_TCP_CONNECT,
            Command::Bind => SOCKS5_CMD_TCP_BIND,
            Command::UdpAssociate => SOCKS5_CMD_UDP_ASSOCIATE,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Connect => write!(f, "CONNECT"),
            Command::Bind => write!(f, "BIND"),
            Command::UdpAssociate => write!(f, "UDP ASSOCIATE"),
        }
    }
}

/// Address type tag (ATYP)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrType {
    /// 4-byte IPv4 address
    Ipv4,
    /// Length-prefixed domain name
    Domain,
    /// 16-byte IPv6 address
    Ipv6,
}

impl AddrType {
    /// Parse an address type byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS5_ADDR_TYPE_IPV4 => Some(AddrType::Ipv4),
            SOCKS5_ADDR_TYPE_DOMAIN => Some(AddrType::Domain),
            SOCKS5_ADDR_TYPE_IPV6 => Some(AddrType::Ipv6),
            _ => None,
        }
    }

    /// Convert to the wire byte
    pub fn to_byte(self) -> u8 {
        match self {
            AddrType::Ipv4 => SOCKS5_ADDR_TYPE_IPV4,
            AddrType::Domain => SOCKS5_ADDR_TYPE_DOMAIN,
            AddrType::Ipv6 => SOCKS5_ADDR_TYPE_IPV6,
        }
    }
}

/// Destination or bound address in a SOCKS5 message
///
/// Domain names are kept as received; they are resolved only when dialing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AddrSpec {
    /// IPv4 address with port
    Ipv4(Ipv4Addr, u16),
    /// Domain name with port
    Domain(String, u16),
    /// IPv6 address with port
    Ipv6(Ipv6Addr, u16),
}

impl AddrSpec {
    /// The zero address `0.0.0.0:0` used in failure replies
    pub fn unspecified() -> Self {
        AddrSpec::Ipv4(Ipv4Addr::UNSPECIFIED, 0)
    }

    /// Get the port number
    pub fn port(&self) -> u16 {
        match self {
            AddrSpec::Ipv4(_, port) | AddrSpec::Domain(_, port) | AddrSpec::Ipv6(_, port) => *port,
        }
    }

    /// Get the address type tag
    pub fn addr_type(&self) -> AddrType {
        match self {
            AddrSpec::Ipv4(..) => AddrType::Ipv4,
            AddrSpec::Domain(..) => AddrType::Domain,
            AddrSpec::Ipv6(..) => AddrType::Ipv6,
        }
    }

    /// The socket address for IP literals, `None` for domain names
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        match self {
            AddrSpec::Ipv4(ip, port) => Some(SocketAddr::new(IpAddr::V4(*ip), *port)),
            AddrSpec::Ipv6(ip, port) => Some(SocketAddr::new(IpAddr::V6(*ip), *port)),
            AddrSpec::Domain(..) => None,
        }
    }
}

impl fmt::Display for AddrSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddrSpec::Ipv4(ip, port) => write!(f, "{}:{}", ip, port),
            AddrSpec::Ipv6(ip, port) => write!(f, "[{}]:{}", ip, port),
            AddrSpec::Domain(domain, port) => write!(f, "{}:{}", domain, port),
        }
    }
}

impl From<SocketAddr> for AddrSpec {
    fn from(addr: SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(addr) => AddrSpec::Ipv4(*addr.ip(), addr.port()),
            SocketAddr::V6(addr) => AddrSpec::Ipv6(*addr.ip(), addr.port()),
        }
    }
}

impl Default for AddrSpec {
    fn default() -> Self {
        AddrSpec::unspecified()
    }
}

/// A decoded client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Requested command
    pub command: Command,
    /// Destination the command targets
    pub destination: AddrSpec,
    /// Address of the client that sent the request, for logging
    pub remote_addr: Option<SocketAddr>,
}

/// A reply to a client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Outcome of the request
    pub code: ReplyCode,
    /// Bound address reported to the client
    pub bind: AddrSpec,
}

impl Reply {
    /// Success reply carrying the relay's local address
    pub fn success(bind: SocketAddr) -> Self {
        Reply {
            code: ReplyCode::Succeeded,
            bind: bind.into(),
        }
    }

    /// Failure reply with the zero address
    pub fn failure(code: ReplyCode) -> Self {
        Reply {
            code,
            bind: AddrSpec::unspecified(),
        }
    }
}
