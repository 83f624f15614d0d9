//! UDP inbound - unicast bind or multicast group join

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use socket2::{Domain, InterfaceIndexOrAddress, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::error::{IngestionError, Result};

/// Bind the inbound datagram socket
///
/// A multicast group address is joined on `interface`; an unknown or
/// missing interface falls back to the system default.
pub(crate) async fn bind(address: &str, interface: Option<&str>) -> Result<UdpSocket> {
    let addr = crate::resolve(address).await?;
    if addr.ip().is_multicast() {
        return join_multicast(addr, interface);
    }
    if interface.is_some() {
        debug!(%addr, "Interface ignored for unicast address");
    }
    let socket = UdpSocket::bind(addr)
        .await
        .map_err(|source| IngestionError::Bind {
            address: address.to_string(),
            source,
        })?;
    info!(%addr, "UDP inbound bound");
    Ok(socket)
}

fn join_multicast(group: SocketAddr, interface: Option<&str>) -> Result<UdpSocket> {
    let index = match interface {
        Some(name) => {
            let index = interface_index(name);
            if index == 0 {
                warn!(interface = name, "Unknown interface, joining on system default");
            }
            index
        }
        None => 0,
    };

    let bind_err = |source| IngestionError::Bind {
        address: group.to_string(),
        source,
    };
    let socket = Socket::new(Domain::for_address(group), Type::DGRAM, Some(Protocol::UDP))
        .map_err(bind_err)?;
    socket.set_reuse_address(true).map_err(bind_err)?;
    let local: SocketAddr = match group {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, group.port()).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, group.port()).into(),
    };
    socket.bind(&local.into()).map_err(bind_err)?;

    let joined = match group.ip() {
        IpAddr::V4(ip) if index == 0 => socket.join_multicast_v4(&ip, &Ipv4Addr::UNSPECIFIED),
        IpAddr::V4(ip) => socket.join_multicast_v4_n(&ip, &InterfaceIndexOrAddress::Index(index)),
        IpAddr::V6(ip) => socket.join_multicast_v6(&ip, index),
    };
    joined.map_err(|source| IngestionError::Multicast {
        group: group.to_string(),
        source,
    })?;

    socket.set_nonblocking(true).map_err(bind_err)?;
    let socket = UdpSocket::from_std(socket.into()).map_err(bind_err)?;
    info!(%group, interface_index = index, "Joined multicast group");
    Ok(socket)
}

/// OS index of a network interface, 0 when unknown
pub fn interface_index(name: &str) -> u32 {
    #[cfg(unix)]
    {
        let Ok(name) = std::ffi::CString::new(name) else {
            return 0;
        };
        // SAFETY: `name` is a valid NUL-terminated string for the duration of the call
        unsafe { libc::if_nametoindex(name.as_ptr()) }
    }
    #[cfg(not(unix))]
    {
        let _ = name;
        0
    }
}
