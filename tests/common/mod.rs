//! Test utilities for mysocks5
//!
//! This module provides common test utilities used across integration tests.

#![allow(dead_code)]

use mysocks5::{Server, ServerConfig};
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Create a test TCP listener on an available port
pub async fn create_test_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// An address on which nothing is listening
pub async fn closed_port_addr() -> SocketAddr {
    let (listener, addr) = create_test_listener().await;
    drop(listener);
    addr
}

/// Start an echo server that serves connections until the test ends
pub async fn start_echo_server() -> SocketAddr {
    let (listener, addr) = create_test_listener().await;
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut reader, mut writer) = socket.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
            });
        }
    });
    addr
}

/// A running proxy and the handle to stop it
pub struct TestProxy {
    /// Address the proxy accepts on
    pub addr: SocketAddr,
    shutdown_tx: broadcast::Sender<bool>,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl TestProxy {
    /// Start a proxy with the given configuration on an available port
    pub async fn start(config: ServerConfig) -> Self {
        let (listener, addr) = create_test_listener().await;
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let server = Server::new(config);
        let handle = tokio::spawn(async move { server.serve(listener, shutdown_rx).await });
        TestProxy {
            addr,
            shutdown_tx,
            handle,
        }
    }

    /// Start a proxy with the default configuration
    pub async fn start_default() -> Self {
        Self::start(ServerConfig::default()).await
    }

    /// Stop the accept loop and wait for it to finish
    pub async fn stop(self) {
        self.shutdown_tx.send(true).unwrap();
        self.handle.await.unwrap().unwrap();
    }
}

/// Greeting offering only the no-auth method
pub fn greeting() -> Vec<u8> {
    vec![0x05, 0x01, 0x00]
}

/// Request bytes with an IPv4 destination
pub fn ipv4_request(cmd: u8, addr: SocketAddr) -> Vec<u8> {
    let SocketAddr::V4(v4) = addr else {
        panic!("expected an IPv4 address, got {}", addr);
    };
    let mut request = vec![0x05, cmd, 0x00, 0x01];
    request.extend_from_slice(&v4.ip().octets());
    request.extend_from_slice(&v4.port().to_be_bytes());
    request
}

/// Request bytes with a domain destination
pub fn domain_request(cmd: u8, domain: &str, port: u16) -> Vec<u8> {
    let mut request = vec![0x05, cmd, 0x00, 0x03, domain.len() as u8];
    request.extend_from_slice(domain.as_bytes());
    request.extend_from_slice(&port.to_be_bytes());
    request
}

/// Connect to the proxy and complete the no-auth negotiation
pub async fn negotiated_client(proxy: SocketAddr) -> TcpStream {
    let mut client = TcpStream::connect(proxy).await.unwrap();
    client.write_all(&greeting()).await.unwrap();
    let mut selection = [0u8; 2];
    client.read_exact(&mut selection).await.unwrap();
    assert_eq!(selection, [0x05, 0x00]);
    client
}

/// Read a reply with an IPv4 bound address
pub async fn read_ipv4_reply(client: &mut TcpStream) -> [u8; 10] {
    let mut reply = [0u8; 10];
    client.read_exact(&mut reply).await.unwrap();
    reply
}
