//! Error types for mysocks5
//!
//! This module defines the SOCKS5 error taxonomy and the mapping from
//! failures to protocol reply codes.

use std::io;
use thiserror::Error;

/// Classification of a failed outbound dial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialErrorKind {
    /// The destination host could not be reached (or resolved)
    HostUnreachable,
    /// The network of the destination could not be reached
    NetworkUnreachable,
    /// The destination actively refused the connection
    ConnectionRefused,
    /// Any other dial failure
    General,
}

impl DialErrorKind {
    /// Classify an IO error returned by a dial attempt
    pub fn classify(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => DialErrorKind::ConnectionRefused,
            io::ErrorKind::NetworkUnreachable => DialErrorKind::NetworkUnreachable,
            io::ErrorKind::HostUnreachable
            | io::ErrorKind::TimedOut
            | io::ErrorKind::AddrNotAvailable => DialErrorKind::HostUnreachable,
            _ => DialErrorKind::General,
        }
    }

    /// The reply code sent to the client for this kind of failure
    pub fn reply_code(self) -> ReplyCode {
        match self {
            DialErrorKind::HostUnreachable => ReplyCode::HostUnreachable,
            DialErrorKind::NetworkUnreachable => ReplyCode::NetworkUnreachable,
            DialErrorKind::ConnectionRefused => ReplyCode::ConnectionRefused,
            DialErrorKind::General => ReplyCode::GeneralFailure,
        }
    }
}

/// SOCKS5 session errors
#[derive(Error, Debug)]
pub enum Socks5Error {
    /// The client spoke a protocol version other than SOCKS5
    #[error("Unsupported SOCKS version: {0}")]
    ProtocolVersionMismatch(u8),

    /// The strict method policy found no acceptable method in the greeting
    #[error("No acceptable authentication method in {0:?}")]
    NoAcceptableMethod(Vec<u8>),

    /// Request carried an address type outside IPv4/domain/IPv6
    #[error("Unrecognized address type: {0}")]
    UnrecognizedAddrType(u8),

    /// Request carried a command that is not served
    #[error("Unsupported command: {0}")]
    UnsupportedCommand(u8),

    /// Truncated or structurally invalid frame
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Underlying transport failure
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Outbound connection to the destination failed
    #[error("Failed to connect to {target} ({kind:?}): {source}")]
    Dial {
        /// Destination as requested by the client
        target: String,
        /// Classified failure
        kind: DialErrorKind,
        /// Error reported by the dialer
        #[source]
        source: io::Error,
    },
}

impl Socks5Error {
    /// Map a read error to the codec taxonomy
    ///
    /// A short read becomes [`Socks5Error::MalformedFrame`]; everything else
    /// stays an IO failure.
    pub fn from_read(err: io::Error, what: &str) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Socks5Error::MalformedFrame(format!("truncated {}", what))
        } else {
            Socks5Error::Io(err)
        }
    }

    /// Build a dial error, classifying the IO error
    pub fn dial(target: impl Into<String>, source: io::Error) -> Self {
        Socks5Error::Dial {
            target: target.into(),
            kind: DialErrorKind::classify(&source),
            source,
        }
    }

    /// Reply code owed to the client for this failure, if any
    ///
    /// Frame-level, version and transport failures return `None`: the
    /// connection is closed without a reply.
    pub fn reply_code(&self) -> Option<ReplyCode> {
        match self {
            Socks5Error::UnrecognizedAddrType(_) => Some(ReplyCode::AddressTypeNotSupported),
            Socks5Error::UnsupportedCommand(_) => Some(ReplyCode::CommandNotSupported),
            Socks5Error::Dial { kind, .. } => Some(kind.reply_code()),
            _ => None,
        }
    }
}

/// Reply codes for SOCKS5 protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReplyCode {
    /// Command succeeded
    Succeeded = 0x00,
    /// General SOCKS server failure
    GeneralFailure = 0x01,
    /// Connection not allowed by ruleset
    ConnectionNotAllowed = 0x02,
    /// Network unreachable
    NetworkUnreachable = 0x03,
    /// Host unreachable
    HostUnreachable = 0x04,
    /// Connection refused
    ConnectionRefused = 0x05,
    /// TTL expired
    TtlExpired = 0x06,
    /// Command not supported
    CommandNotSupported = 0x07,
    /// Address type not supported
    AddressTypeNotSupported = 0x08,
}

impl From<ReplyCode> for u8 {
    fn from(code: ReplyCode) -> Self {
        code as u8
    }
}

impl TryFrom<u8> for ReplyCode {
    type Error = Socks5Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(ReplyCode::Succeeded),
            0x01 => Ok(ReplyCode::GeneralFailure),
            0x02 => Ok(ReplyCode::ConnectionNotAllowed),
            0x03 => Ok(ReplyCode::NetworkUnreachable),
            0x04 => Ok(ReplyCode::HostUnreachable),
            0x05 => Ok(ReplyCode::ConnectionRefused),
            0x06 => Ok(ReplyCode::TtlExpired),
            0x07 => Ok(ReplyCode::CommandNotSupported),
            0x08 => Ok(ReplyCode::AddressTypeNotSupported),
            _ => Err(Socks5Error::MalformedFrame(format!(
                "unknown reply code: {}",
                value
            ))),
        }
    }
}

impl From<&io::Error> for ReplyCode {
    fn from(err: &io::Error) -> Self {
        DialErrorKind::classify(err).reply_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_code_from_u8_valid() {
        for value in 0x00..=0x08u8 {
            let code = ReplyCode::try_from(value).unwrap();
            assert_eq!(u8::from(code), value);
        }
    }

    #[test]
    fn test_reply_code_from_u8_invalid() {
        assert!(ReplyCode::try_from(0x09).is_err());
        assert!(ReplyCode::try_from(0xFF).is_err());
    }

    #[test]
    fn test_dial_error_kind_classify() {
        let cases = [
            (io::ErrorKind::ConnectionRefused, DialErrorKind::ConnectionRefused),
            (io::ErrorKind::NetworkUnreachable, DialErrorKind::NetworkUnreachable),
            (io::ErrorKind::HostUnreachable, DialErrorKind::HostUnreachable),
            (io::ErrorKind::TimedOut, DialErrorKind::HostUnreachable),
            (io::ErrorKind::AddrNotAvailable, DialErrorKind::HostUnreachable),
            (io::ErrorKind::PermissionDenied, DialErrorKind::General),
            (io::ErrorKind::Other, DialErrorKind::General),
        ];

        for (kind, expected) in cases {
            let err = io::Error::new(kind, "test error");
            assert_eq!(DialErrorKind::classify(&err), expected, "{:?}", kind);
        }
    }

    #[test]
    fn test_reply_code_from_io_error() {
        let err = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        assert_eq!(ReplyCode::from(&err), ReplyCode::ConnectionRefused);

        let err = io::Error::new(io::ErrorKind::Other, "other");
        assert_eq!(ReplyCode::from(&err), ReplyCode::GeneralFailure);
    }

    #[test]
    fn test_error_reply_codes() {
        assert_eq!(
            Socks5Error::UnrecognizedAddrType(0x09).reply_code(),
            Some(ReplyCode::AddressTypeNotSupported)
        );
        assert_eq!(
            Socks5Error::UnsupportedCommand(0x02).reply_code(),
            Some(ReplyCode::CommandNotSupported)
        );
        let dial = Socks5Error::dial(
            "127.0.0.1:9",
            io::Error::from(io::ErrorKind::ConnectionRefused),
        );
        assert_eq!(dial.reply_code(), Some(ReplyCode::ConnectionRefused));

        assert_eq!(Socks5Error::ProtocolVersionMismatch(4).reply_code(), None);
        assert_eq!(
            Socks5Error::MalformedFrame("x".to_string()).reply_code(),
            None
        );
        assert_eq!(
            Socks5Error::Io(io::Error::from(io::ErrorKind::BrokenPipe)).reply_code(),
            None
        );
    }

    #[test]
    fn test_from_read_maps_short_read() {
        let err = Socks5Error::from_read(io::Error::from(io::ErrorKind::UnexpectedEof), "port");
        assert!(matches!(err, Socks5Error::MalformedFrame(ref m) if m == "truncated port"));

        let err = Socks5Error::from_read(io::Error::from(io::ErrorKind::ConnectionReset), "port");
        assert!(matches!(err, Socks5Error::Io(_)));
    }

    #[test]
    fn test_socks5_error_display() {
        assert_eq!(
            Socks5Error::ProtocolVersionMismatch(4).to_string(),
            "Unsupported SOCKS version: 4"
        );
        assert_eq!(
            Socks5Error::UnsupportedCommand(0xFF).to_string(),
            "Unsupported command: 255"
        );
        assert_eq!(
            Socks5Error::UnrecognizedAddrType(0x99).to_string(),
            "Unrecognized address type: 153"
        );
        assert_eq!(
            Socks5Error::NoAcceptableMethod(vec![2]).to_string(),
            "No acceptable authentication method in [2]"
        );
    }
}
