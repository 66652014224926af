//! Bidirectional relay between the client and the upstream connection
//!
//! Each direction runs in its own task. The first direction to finish, by
//! EOF or by error, raises a shared close flag; the other direction stops
//! at its next suspension point. Both directions shut down their write side
//! on the way out, and the streams are dropped (closed) once both tasks end.

use super::consts::RELAY_BUFFER_SIZE;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::debug;

/// Bytes forwarded in each direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Bytes copied from the client to the upstream
    pub client_to_upstream: u64,
    /// Bytes copied from the upstream to the client
    pub upstream_to_client: u64,
}

/// Relay bytes between `client` and `upstream` until either side closes
///
/// Returns after both directions have finished and both streams have been
/// released.
pub async fn relay<C, U>(client: C, upstream: U) -> io::Result<RelayStats>
where
    C: AsyncRead + AsyncWrite + Send + 'static,
    U: AsyncRead + AsyncWrite + Send + 'static,
{
    let (client_read, client_write) = tokio::io::split(client);
    let (upstream_read, upstream_write) = tokio::io::split(upstream);

    let (close_tx, close_rx) = watch::channel(false);
    let close_tx = Arc::new(close_tx);

    let outbound = tokio::spawn(pump(
        "client->upstream",
        client_read,
        upstream_write,
        close_tx.clone(),
        close_rx.clone(),
    ));
    let inbound = tokio::spawn(pump(
        "upstream->client",
        upstream_read,
        client_write,
        close_tx,
        close_rx,
    ));

    let (outbound, inbound) = tokio::join!(outbound, inbound);

    Ok(RelayStats {
        client_to_upstream: outbound.map_err(io::Error::other)?,
        upstream_to_client: inbound.map_err(io::Error::other)?,
    })
}

async fn pump<R, W>(
    direction: &'static str,
    mut reader: R,
    mut writer: W,
    close_tx: Arc<watch::Sender<bool>>,
    mut close_rx: watch::Receiver<bool>,
) -> u64
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut copied = 0u64;

    tokio::select! {
        result = copy(&mut reader, &mut writer, &mut copied) => match result {
            Ok(()) => debug!("{} reached EOF after {} bytes", direction, copied),
            Err(e) => debug!("{} failed after {} bytes: {}", direction, copied, e),
        },
        _ = close_rx.wait_for(|closed| *closed) => {
            debug!("{} stopped by peer direction after {} bytes", direction, copied);
        }
    }

    close_tx.send_replace(true);
    if let Err(e) = writer.shutdown().await {
        debug!("{} shutdown failed: {}", direction, e);
    }

    copied
}

async fn copy<R, W>(reader: &mut R, writer: &mut W, copied: &mut u64) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; RELAY_BUFFER_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        writer.write_all(&buf[..n]).await?;
        *copied += n as u64;
    }
}
