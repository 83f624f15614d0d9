//! InboundListener - the single source stream of the relay

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use contracts::{InboundConfig, Protocol, StreamSink};
use tls_material::{TlsAcceptor, TlsMaterial};
use tokio::net::{TcpListener, UdpSocket};
use tracing::{debug, info, instrument, warn};

use crate::error::{IngestionError, Result};
use crate::metrics::IngestionMetrics;
use crate::{tcp, udp};

enum Endpoint {
    Udp(UdpSocket),
    Tcp {
        listener: TcpListener,
        acceptor: Option<TlsAcceptor>,
        handshake_timeout: Duration,
        persistent: bool,
    },
}

/// Bound inbound endpoint, ready to feed a [`StreamSink`]
pub struct InboundListener {
    endpoint: Endpoint,
    read_buffer_size: usize,
    metrics: Arc<IngestionMetrics>,
}

impl InboundListener {
    /// Bind according to `config`, loading TLS material from its paths
    pub async fn bind(config: &InboundConfig) -> Result<Self> {
        let material = config
            .tls
            .as_ref()
            .map(TlsMaterial::load)
            .transpose()
            .map_err(|e| IngestionError::Tls(e.to_string()))?;
        Self::bind_with_tls(config, material).await
    }

    /// Bind according to `config` with already loaded TLS material
    #[instrument(
        name = "inbound_bind",
        skip(config, tls),
        fields(protocol = %config.protocol, address = %config.address)
    )]
    pub async fn bind_with_tls(config: &InboundConfig, tls: Option<TlsMaterial>) -> Result<Self> {
        let endpoint = match config.protocol {
            Protocol::Udp => {
                if tls.is_some() {
                    return Err(IngestionError::Tls("tls requires protocol = \"tcp\"".into()));
                }
                Endpoint::Udp(udp::bind(&config.address, config.interface.as_deref()).await?)
            }
            Protocol::Tcp => {
                let acceptor = tls
                    .map(|m| m.acceptor())
                    .transpose()
                    .map_err(|e| IngestionError::Tls(e.to_string()))?;
                Endpoint::Tcp {
                    listener: tcp::bind(&config.address).await?,
                    acceptor,
                    handshake_timeout: Duration::from_millis(config.handshake_timeout_ms),
                    persistent: config.persistent,
                }
            }
        };

        Ok(Self {
            endpoint,
            read_buffer_size: config.read_buffer_size.max(1),
            metrics: Arc::new(IngestionMetrics::new()),
        })
    }

    /// Locally bound address (useful when binding port 0)
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        match &self.endpoint {
            Endpoint::Udp(socket) => socket.local_addr(),
            Endpoint::Tcp { listener, .. } => listener.local_addr(),
        }
    }

    /// Shared metrics
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Transport label for logs
    pub fn transport(&self) -> &'static str {
        match &self.endpoint {
            Endpoint::Udp(_) => "udp",
            Endpoint::Tcp { acceptor: None, .. } => "tcp",
            Endpoint::Tcp { acceptor: Some(_), .. } => "tls",
        }
    }

    /// Feed every inbound read to `sink`, in arrival order
    ///
    /// UDP never ends on its own; callers stop it by dropping the future.
    /// TCP returns when the (single-shot) connection ends or on error. The
    /// sink is closed whenever this returns.
    #[instrument(name = "inbound_run", skip_all, fields(transport = self.transport()))]
    pub async fn run<S: StreamSink>(self, sink: &mut S) -> Result<()> {
        let mut buf = vec![0u8; self.read_buffer_size];
        let result = match &self.endpoint {
            Endpoint::Udp(socket) => receive_datagrams(socket, sink, &mut buf, &self.metrics).await,
            Endpoint::Tcp {
                listener,
                acceptor,
                handshake_timeout,
                persistent,
            } => {
                tcp::serve(
                    listener,
                    acceptor.as_ref(),
                    *handshake_timeout,
                    *persistent,
                    sink,
                    &mut buf,
                    &self.metrics,
                )
                .await
            }
        };

        if let Err(e) = sink.close().await {
            debug!(sink = sink.name(), error = %e, "Sink close failed");
        }
        let snapshot = self.metrics.snapshot();
        info!(
            reads = snapshot.reads,
            bytes = snapshot.bytes,
            connections = snapshot.connections,
            "Inbound stream ended"
        );
        result
    }
}

async fn receive_datagrams<S: StreamSink>(
    socket: &UdpSocket,
    sink: &mut S,
    buf: &mut [u8],
    metrics: &IngestionMetrics,
) -> Result<()> {
    loop {
        match socket.recv_from(buf).await {
            Ok((n, _peer)) => {
                sink.write(&buf[..n]).await?;
                metrics.record_read(n);
                observability::record_inbound_read("udp", n);
            }
            Err(e) => {
                metrics.record_read_error();
                warn!(error = %e, "Datagram receive failed");
            }
        }
    }
}
