//! # mysocks5 - Minimal SOCKS5 Proxy Server
//!
//! mysocks5 accepts SOCKS5 clients, negotiates "no authentication required",
//! decodes the relay request and, for CONNECT, dials the destination and
//! relays bytes in both directions until either side closes.
//!
//! ## Features
//!
//! - **No-auth negotiation**: Accepts clients whatever methods they offer,
//!   with an optional strict mode
//! - **CONNECT relaying**: IPv4, IPv6 and domain destinations
//! - **Classified replies**: Dial failures map to unreachable/refused codes;
//!   BIND and UDP ASSOCIATE are answered with "command not supported"
//! - **Stream agnostic sessions**: [`socks::serve_conn`] runs on any
//!   `AsyncRead + AsyncWrite` stream
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mysocks5::config::load_config;
//! use mysocks5::Server;
//! use tokio::sync::broadcast;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config("config.toml")?;
//!     let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
//!
//!     Server::new(config.server).listen_and_serve(shutdown_rx).await
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! SOCKS5 Client -> Server (accept) -> session task -> Dialer -> Target
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod server;
pub mod socks;
pub mod transport;

// Re-export commonly used items
pub use config::{load_config, Config, ServerConfig};
pub use error::{DialErrorKind, ReplyCode, Socks5Error};
pub use server::Server;
pub use socks::{serve_conn, SessionError, SessionOptions};
pub use transport::{Dialer, TcpDialer};

/// Version of the mysocks5 library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "mysocks5");
    }
}
