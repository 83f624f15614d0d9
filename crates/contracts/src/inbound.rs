//! Inbound descriptor - the single source stream

use serde::{Deserialize, Serialize};

use crate::{Protocol, TlsConfig};

/// Default size of the per-read buffer (fits any UDP datagram)
pub const DEFAULT_READ_BUFFER: usize = 1 << 16;

/// Default limit for an inbound TLS handshake
pub const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 10_000;

/// Where the relay receives its input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundConfig {
    /// Inbound transport
    pub protocol: Protocol,

    /// Local `host:port` to bind (a multicast group for udp multicast)
    pub address: String,

    /// Network interface used to join a multicast group (udp only)
    #[serde(default)]
    pub interface: Option<String>,

    /// TLS server settings (tcp only)
    #[serde(default)]
    pub tls: Option<TlsConfig>,

    /// Re-enter the accept loop after each connection ends (tcp only)
    #[serde(default)]
    pub persistent: bool,

    /// Bytes read per datagram / stream read
    #[serde(default = "default_read_buffer")]
    pub read_buffer_size: usize,

    /// Connections that do not finish the TLS handshake in time are dropped
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_ms: u64,
}

fn default_read_buffer() -> usize {
    DEFAULT_READ_BUFFER
}

fn default_handshake_timeout() -> u64 {
    DEFAULT_HANDSHAKE_TIMEOUT_MS
}

impl InboundConfig {
    /// Create an inbound descriptor with defaults
    pub fn new(protocol: Protocol, address: impl Into<String>) -> Self {
        Self {
            protocol,
            address: address.into(),
            interface: None,
            tls: None,
            persistent: false,
            read_buffer_size: DEFAULT_READ_BUFFER,
            handshake_timeout_ms: DEFAULT_HANDSHAKE_TIMEOUT_MS,
        }
    }

    /// Join multicast groups on this interface
    pub fn with_interface(mut self, name: impl Into<String>) -> Self {
        self.interface = Some(name.into());
        self
    }

    /// Attach TLS settings
    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Keep accepting after each connection ends
    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }
}
