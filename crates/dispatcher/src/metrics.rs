//! Route metrics for observability

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};

/// Route worker lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum WorkerState {
    #[default]
    Created = 0,
    Dialing = 1,
    Draining = 2,
    Closed = 3,
    Failed = 4,
}

impl WorkerState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Dialing,
            2 => Self::Draining,
            3 => Self::Closed,
            4 => Self::Failed,
            _ => Self::Created,
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Dialing => "dialing",
            Self::Draining => "draining",
            Self::Closed => "closed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Metrics for a single route
#[derive(Debug, Default)]
pub struct RouteMetrics {
    /// Current worker state
    state: AtomicU8,
    /// Current undrained chunks
    queue_len: AtomicUsize,
    /// Chunks accepted by the route sink
    accepted_count: AtomicU64,
    /// Chunks rejected by the route sink (lost for this route)
    dropped_count: AtomicU64,
    /// Chunks transmitted
    sent_count: AtomicU64,
    /// Bytes transmitted
    sent_bytes: AtomicU64,
    /// Transient send failures
    failure_count: AtomicU64,
}

impl RouteMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn accepted_count(&self) -> u64 {
        self.accepted_count.load(Ordering::Relaxed)
    }

    pub fn inc_accepted_count(&self) {
        self.accepted_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    /// Increment dropped count, returning the previous value
    pub fn inc_dropped_count(&self) -> u64 {
        self.dropped_count.fetch_add(1, Ordering::Relaxed)
    }

    pub fn sent_count(&self) -> u64 {
        self.sent_count.load(Ordering::Relaxed)
    }

    pub fn sent_bytes(&self) -> u64 {
        self.sent_bytes.load(Ordering::Relaxed)
    }

    /// Count one transmitted chunk of `bytes` bytes
    pub fn inc_sent(&self, bytes: usize) {
        self.sent_count.fetch_add(1, Ordering::Relaxed);
        self.sent_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Increment failure count, returning the previous value
    pub fn inc_failure_count(&self) -> u64 {
        self.failure_count.fetch_add(1, Ordering::Relaxed)
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            state: self.state(),
            queue_len: self.queue_len(),
            accepted_count: self.accepted_count(),
            dropped_count: self.dropped_count(),
            sent_count: self.sent_count(),
            sent_bytes: self.sent_bytes(),
            failure_count: self.failure_count(),
        }
    }
}

/// Snapshot of route metrics (for reporting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub state: WorkerState,
    pub queue_len: usize,
    pub accepted_count: u64,
    pub dropped_count: u64,
    pub sent_count: u64,
    pub sent_bytes: u64,
    pub failure_count: u64,
}
