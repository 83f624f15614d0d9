//! # Ingestion
//!
//! Inbound stream module.
//!
//! Responsibilities:
//! - Bind the single inbound endpoint (UDP unicast/multicast, TCP, TCP+TLS)
//! - Hand every datagram or stream read to a `StreamSink`, in arrival order
//! - Close the sink when the inbound stream ends
//!
//! ## Usage Example
//!
//! ```ignore
//! use contracts::{InboundConfig, Protocol};
//! use ingestion::InboundListener;
//!
//! let config = InboundConfig::new(Protocol::Udp, "0.0.0.0:31000");
//! let listener = InboundListener::bind(&config).await?;
//! let mut fanout = dispatcher.fanout();
//! listener.run(&mut fanout).await?;
//! ```

mod error;
mod listener;
mod metrics;
mod tcp;
mod udp;

use std::net::SocketAddr;

pub use error::{IngestionError, Result};
pub use listener::InboundListener;
pub use metrics::{IngestionMetrics, MetricsSnapshot};
pub use udp::interface_index;

async fn resolve(address: &str) -> Result<SocketAddr> {
    let resolve_err = || IngestionError::Resolve {
        address: address.to_string(),
    };
    tokio::net::lookup_host(address)
        .await
        .map_err(|_| resolve_err())?
        .next()
        .ok_or_else(resolve_err)
}
