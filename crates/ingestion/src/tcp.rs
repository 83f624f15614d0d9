//! TCP inbound - sequential accept, optional TLS

use std::net::SocketAddr;
use std::time::Duration;

use contracts::StreamSink;
use tls_material::TlsAcceptor;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{IngestionError, Result};
use crate::metrics::IngestionMetrics;

pub(crate) async fn bind(address: &str) -> Result<TcpListener> {
    let addr = crate::resolve(address).await?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| IngestionError::Bind {
            address: address.to_string(),
            source,
        })?;
    info!(%addr, "TCP inbound listening");
    Ok(listener)
}

/// Accept connections one at a time and pump each into `sink`
///
/// Single-shot mode returns after the first connection that completes a
/// handshake ends. Persistent mode keeps accepting and only logs read errors.
/// A TLS client gets `handshake_timeout` to finish its handshake.
pub(crate) async fn serve<S: StreamSink>(
    listener: &TcpListener,
    acceptor: Option<&TlsAcceptor>,
    handshake_timeout: Duration,
    persistent: bool,
    sink: &mut S,
    buf: &mut [u8],
    metrics: &IngestionMetrics,
) -> Result<()> {
    let local = listener
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_default();
    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .map_err(|source| IngestionError::Accept {
                address: local.clone(),
                source,
            })?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!(%peer, error = %e, "set_nodelay failed");
        }

        let outcome = match acceptor {
            None => pump(stream, peer, sink, buf, metrics).await,
            Some(acceptor) => match timeout(handshake_timeout, acceptor.accept(stream)).await {
                Ok(Ok(tls)) => pump(tls, peer, sink, buf, metrics).await,
                Ok(Err(e)) => {
                    metrics.record_handshake_failure();
                    warn!(%peer, error = %e, "TLS handshake failed");
                    continue;
                }
                Err(_) => {
                    metrics.record_handshake_failure();
                    warn!(%peer, ?handshake_timeout, "TLS handshake timed out");
                    continue;
                }
            },
        };

        match outcome {
            Ok(bytes) => info!(%peer, bytes, "Inbound connection closed"),
            Err(IngestionError::Read { peer, source }) if persistent => {
                metrics.record_read_error();
                warn!(%peer, error = %source, "Inbound connection failed, accepting again");
            }
            Err(e) => return Err(e),
        }

        if !persistent {
            return Ok(());
        }
    }
}

async fn pump<R, S>(
    mut reader: R,
    peer: SocketAddr,
    sink: &mut S,
    buf: &mut [u8],
    metrics: &IngestionMetrics,
) -> Result<u64>
where
    R: AsyncRead + Unpin,
    S: StreamSink,
{
    metrics.record_connection();
    info!(%peer, "Inbound connection accepted");
    let mut total = 0u64;
    loop {
        let n = reader
            .read(buf)
            .await
            .map_err(|source| IngestionError::Read {
                peer: peer.to_string(),
                source,
            })?;
        if n == 0 {
            return Ok(total);
        }
        total += n as u64;
        sink.write(&buf[..n]).await?;
        metrics.record_read(n);
        observability::record_inbound_read("tcp", n);
    }
}
