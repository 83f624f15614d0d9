//! Route descriptors - one configured destination each

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::TlsConfig;

/// Default descriptor queue depth per route
pub const DEFAULT_QUEUE_CAPACITY: usize = 1 << 15;

/// Default ring storage per delayed route (32 MiB)
pub const DEFAULT_BUFFER_CAPACITY: usize = 32 << 20;

/// Transport protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Udp,
    Tcp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Udp => f.write_str("udp"),
            Self::Tcp => f.write_str("tcp"),
        }
    }
}

/// One outbound destination
///
/// Immutable for the lifetime of the process once validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Route name (used for logging/metrics)
    pub name: String,

    /// Outbound transport
    pub protocol: Protocol,

    /// Destination `host:port`
    pub address: String,

    /// Transmission delay in milliseconds (0 = pass-through)
    #[serde(default)]
    pub delay_ms: u64,

    /// Fixed pacing between replayed chunks in milliseconds (0 = replay recorded gaps)
    #[serde(default)]
    pub interval_ms: u64,

    /// Replay the original inter-arrival gaps instead of a fixed delay
    #[serde(default)]
    pub replay: bool,

    /// Ring storage size in bytes (delayed routes only)
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// Maximum number of undrained chunks
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// TLS client settings (tcp only)
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

fn default_buffer_capacity() -> usize {
    DEFAULT_BUFFER_CAPACITY
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl RouteConfig {
    /// Create a pass-through route with default capacities
    pub fn new(name: impl Into<String>, protocol: Protocol, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            protocol,
            address: address.into(),
            delay_ms: 0,
            interval_ms: 0,
            replay: false,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            tls: None,
        }
    }

    /// Set the transmission delay
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_ms = delay.as_millis() as u64;
        self
    }

    /// Enable interval replay
    pub fn with_replay(mut self, interval: Option<Duration>) -> Self {
        self.replay = true;
        self.interval_ms = interval.map_or(0, |i| i.as_millis() as u64);
        self
    }

    /// Set ring storage and queue sizes
    pub fn with_capacity(mut self, buffer_capacity: usize, queue_capacity: usize) -> Self {
        self.buffer_capacity = buffer_capacity;
        self.queue_capacity = queue_capacity;
        self
    }

    /// Attach TLS settings
    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Configured delay
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Configured replay interval, if any
    pub fn interval(&self) -> Option<Duration> {
        (self.interval_ms > 0).then(|| Duration::from_millis(self.interval_ms))
    }

    /// Whether bytes for this route go through a ring buffer
    pub fn is_delayed(&self) -> bool {
        self.delay_ms > 0
    }
}
