//! Inbound metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Inbound listener metrics
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Datagrams or stream reads handed to the sink
    pub reads: AtomicU64,

    /// Bytes handed to the sink
    pub bytes: AtomicU64,

    /// TCP connections served
    pub connections: AtomicU64,

    /// Transient receive errors
    pub read_errors: AtomicU64,

    /// Rejected TLS handshakes
    pub handshake_failures: AtomicU64,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one read of `bytes` bytes
    pub fn record_read(&self, bytes: usize) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_connection(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_read_error(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_handshake_failure(&self) {
        self.handshake_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reads: self.reads.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            connections: self.connections.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
            handshake_failures: self.handshake_failures.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub reads: u64,
    pub bytes: u64,
    pub connections: u64,
    pub read_errors: u64,
    pub handshake_failures: u64,
}
