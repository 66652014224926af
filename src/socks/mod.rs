//! SOCKS5 protocol core
//!
//! Negotiation, request decoding, reply encoding, CONNECT execution and the
//! bidirectional relay. [`serve_conn`] runs a whole session on any
//! `AsyncRead + AsyncWrite` stream; the listener lives in [`crate::server`].

mod codec;
mod command;
pub mod consts;
mod handler;
mod handshake;
mod relay;
mod request;
mod types;

pub use codec::{encode_reply, read_address, write_method_selection, write_reply};
pub use command::{connect, execute};
pub use consts::*;
pub use handler::{serve_conn, SessionError, SessionOptions, SessionStage};
pub use handshake::{negotiate, MethodPolicy};
pub use relay::{relay, RelayStats};
pub use request::read_request;
pub use types::{AddrSpec, AddrType, Command, Reply, Request};
