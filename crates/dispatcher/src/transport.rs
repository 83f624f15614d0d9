//! Outbound transports - UDP datagrams, TCP streams, TLS over TCP

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use contracts::Protocol;
use tls_material::client::TlsStream;
use tokio::io::AsyncWriteExt;
use tokio::net::{lookup_host, TcpStream, UdpSocket};
use tracing::debug;

use crate::Route;

/// Connected outbound endpoint for one route
pub enum Outbound {
    Udp(UdpSocket),
    Tcp(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl Outbound {
    /// Open the route's destination
    ///
    /// UDP binds an ephemeral local socket and connects it. TCP connects
    /// with Nagle disabled and, when configured, completes a TLS handshake.
    pub async fn dial(route: &Route) -> io::Result<Self> {
        let target = resolve(route.address()).await?;

        match route.protocol() {
            Protocol::Udp => {
                let local: SocketAddr = if target.is_ipv4() {
                    (Ipv4Addr::UNSPECIFIED, 0).into()
                } else {
                    (Ipv6Addr::UNSPECIFIED, 0).into()
                };
                let socket = UdpSocket::bind(local).await?;
                socket.connect(target).await?;
                debug!(route = %route.name(), %target, "UDP socket connected");
                Ok(Self::Udp(socket))
            }
            Protocol::Tcp => {
                let stream = TcpStream::connect(target).await?;
                stream.set_nodelay(true)?;
                match route.tls() {
                    None => {
                        debug!(route = %route.name(), %target, "TCP connected");
                        Ok(Self::Tcp(stream))
                    }
                    Some(tls) => {
                        let stream = tls
                            .connector
                            .connect(tls.server_name.clone(), stream)
                            .await?;
                        debug!(route = %route.name(), %target, "TLS handshake complete");
                        Ok(Self::Tls(Box::new(stream)))
                    }
                }
            }
        }
    }

    /// Transmit one chunk in full
    pub async fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        match self {
            Self::Udp(socket) => socket.send(bytes).await.map(|_| ()),
            Self::Tcp(stream) => stream.write_all(bytes).await,
            Self::Tls(stream) => stream.write_all(bytes).await,
        }
    }

    /// Datagram transports treat send errors as transient
    pub fn is_datagram(&self) -> bool {
        matches!(self, Self::Udp(_))
    }

    /// Flush and close the write side
    pub async fn shutdown(&mut self) -> io::Result<()> {
        match self {
            Self::Udp(_) => Ok(()),
            Self::Tcp(stream) => stream.shutdown().await,
            Self::Tls(stream) => stream.shutdown().await,
        }
    }
}

async fn resolve(address: &str) -> io::Result<SocketAddr> {
    lookup_host(address).await?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("'{address}' resolved to no addresses"),
        )
    })
}
